//! Demo blog component.
//!
//! # Operations
//! - `blog`: list every blog
//! - `summary`, `view`: one blog by `blogname` (a miss renders without `blog`)
//! - `create`: save a blog from the `blog[...]` form, then redirect
//! - `posts`: a blog's posts, newest first
//! - `create_post`: pick a blog, or validate and save a post from the `blogpost[...]` form

use std::time::{SystemTime, UNIX_EPOCH};

use url::form_urlencoded;

use crate::component::descriptor::{Component, ControllerContext};
use crate::component::response::{component_response, Response};
use crate::config::value::{Map, Value};
use crate::error::ControllerError;
use crate::services::orm::{Criteria, Entity, EntityDef, Lookup, SortOrder};
use crate::services::Services;

pub const MODEL: &str = "demo_blog";
pub const BLOG: &str = "Blog";
pub const BLOG_POST: &str = "BlogPost";

const OPERATIONS: &[&str] = &["blog", "summary", "view", "create", "posts", "create_post"];
const BLOG_FIELDS: &[&str] = &["blogname", "title", "subtitle", "owner"];

#[derive(Debug, Default)]
pub struct BlogComponent;

impl BlogComponent {
    pub fn new() -> Self {
        Self
    }

    /// Entity types of the `demo_blog` model.
    pub fn model() -> Vec<EntityDef> {
        vec![EntityDef::new(BLOG, "blogname"), EntityDef::new(BLOG_POST, "blogpostid")]
    }

    fn blog(&self, ctx: &ControllerContext<'_>) -> Result<Response, ControllerError> {
        let blogs = ctx.services.orm.select(BLOG, &Criteria::all())?;
        let mut vars = Map::new();
        vars.insert("blogs".into(), entities(&blogs));
        component_response(ctx, "blog/blog.tpl", vars)
    }

    fn summary(&self, ctx: &ControllerContext<'_>) -> Result<Response, ControllerError> {
        let vars = self.lookup_vars(ctx)?;
        component_response(ctx, "blog/summary.tpl", vars)
    }

    fn view(&self, ctx: &ControllerContext<'_>) -> Result<Response, ControllerError> {
        let vars = self.lookup_vars(ctx)?;
        component_response(ctx, "blog/view.tpl", vars)
    }

    fn create(&self, ctx: &ControllerContext<'_>) -> Result<Response, ControllerError> {
        let mut vars = Map::new();
        let Some(form) = ctx.arg("blog").and_then(Value::as_map) else {
            return component_response(ctx, "blog/create.tpl", vars);
        };

        let mut blog = Entity::new(BLOG);
        for field in BLOG_FIELDS {
            let value = form.get(*field).and_then(Value::as_str).unwrap_or_default();
            blog.set(*field, value);
        }
        let blogname = blog.get_str("blogname").unwrap_or_default().to_string();

        let saved = match ctx.services.orm.save(&blog) {
            Ok(saved) => saved,
            Err(e) => {
                tracing::error!(blogname = %blogname, error = %e, "Failed to save blog");
                false
            }
        };
        vars.insert("blog".into(), blog.to_value());
        vars.insert("success".into(), Value::Bool(saved));

        let response = component_response(ctx, "blog/create.tpl", vars)?;
        Ok(if saved {
            response.with_redirect(format!("/blog#blog_create_success:{blogname}"))
        } else {
            response
        })
    }

    fn posts(&self, ctx: &ControllerContext<'_>) -> Result<Response, ControllerError> {
        let mut vars = Map::new();
        vars.insert("args".into(), Value::Map(ctx.args.clone()));

        if let Some(blog) = self.find_blog(ctx)? {
            let name = blog.get_str("blogname").unwrap_or_default().to_string();
            let criteria = Criteria::all()
                .eq("blogname", name.as_str())
                .order_by("timestamp", SortOrder::Desc);
            let posts = ctx.services.orm.select(BLOG_POST, &criteria)?;
            vars.insert("postcount".into(), Value::Int(posts.len() as i64));
            vars.insert("posts".into(), entities(&posts));
            vars.insert("blog".into(), blog.to_value());
        }
        component_response(ctx, "blog/posts.tpl", vars)
    }

    fn create_post(&self, ctx: &ControllerContext<'_>) -> Result<Response, ControllerError> {
        let mut vars = Map::new();
        vars.insert("args".into(), Value::Map(ctx.args.clone()));
        if let Some(header) = ctx.arg("header") {
            vars.insert("header".into(), header.clone());
        }

        let Some(blog) = self.find_blog(ctx)? else {
            if let Some(name) = requested_blogname(ctx) {
                vars.insert("blogname".into(), Value::from(name));
            }
            let blogs = ctx.services.orm.select(BLOG, &Criteria::all())?;
            vars.insert("blogs".into(), entities(&blogs));
            return component_response(ctx, "blog/select.tpl", vars);
        };

        let blogname = blog.get_str("blogname").unwrap_or_default().to_string();
        vars.insert("blogname".into(), Value::from(blogname.as_str()));
        vars.insert("blog".into(), blog.to_value());
        vars.insert("formname".into(), Value::from("blogpost"));
        vars.insert("elements".into(), post_form_elements(&blogname));
        vars.insert("saved".into(), Value::Bool(false));
        vars.insert("valid".into(), Value::Bool(false));

        let Some(form) = ctx.arg("blogpost").and_then(Value::as_map) else {
            return component_response(ctx, "blog/create_post.tpl", vars);
        };

        let mut post = Entity::new(BLOG_POST);
        for (field, value) in form {
            post.set(field.clone(), value.clone());
        }
        post.set("blogname", blogname.as_str());
        post.set("timestamp", unix_now());
        let postid = uuid::Uuid::new_v4().simple().to_string();
        post.set("blogpostid", postid.as_str());

        let valid = is_valid_post(&post);
        let saved = valid && ctx.services.orm.save(&post)?;
        vars.insert("valid".into(), Value::Bool(valid));
        vars.insert("saved".into(), Value::Bool(saved));
        vars.insert("blogpost".into(), post.to_value());

        let response = component_response(ctx, "blog/create_post.tpl", vars)?;
        if !saved {
            return Ok(response);
        }
        tracing::info!(blogname = %blogname, blogpostid = %postid, "Blog post created");
        let encoded: String = form_urlencoded::byte_serialize(blogname.as_bytes()).collect();
        Ok(response.with_redirect(format!("?blogname={encoded}#blog_posts_create_success:{postid}")))
    }

    /// Vars for the single-blog views: `blogname` plus `blog` when found.
    fn lookup_vars(&self, ctx: &ControllerContext<'_>) -> Result<Map, ControllerError> {
        let mut vars = Map::new();
        if let Some(name) = requested_blogname(ctx) {
            vars.insert("blogname".into(), Value::from(name));
        }
        if let Some(blog) = self.find_blog(ctx)? {
            vars.insert("blog".into(), blog.to_value());
        }
        Ok(vars)
    }

    /// The blog named by the `blogname` arg, or the `blog` mapping arg as given.
    fn find_blog(&self, ctx: &ControllerContext<'_>) -> Result<Option<Entity>, ControllerError> {
        if let Some(name) = ctx.arg_str("blogname") {
            return Ok(match ctx.services.orm.load(BLOG, name)? {
                Lookup::Found(blog) => Some(blog),
                Lookup::NotFound => {
                    tracing::debug!(blogname = %name, "Blog not found");
                    None
                }
            });
        }
        let given = ctx.arg("blog").and_then(Value::as_map).filter(|m| m.contains_key("blogname"));
        Ok(given.map(|fields| {
            fields
                .iter()
                .fold(Entity::new(BLOG), |blog, (k, v)| blog.with_field(k.clone(), v.clone()))
        }))
    }
}

impl Component for BlogComponent {
    fn init(&self, services: &Services) {
        if let Err(e) = services.orm.load_model(MODEL) {
            tracing::error!(model = MODEL, error = %e, "Failed to load model");
        }
    }

    fn operations(&self) -> &[&'static str] {
        OPERATIONS
    }

    fn call(&self, operation: &str, ctx: &ControllerContext<'_>) -> Result<Response, ControllerError> {
        match operation {
            "blog" => self.blog(ctx),
            "summary" => self.summary(ctx),
            "view" => self.view(ctx),
            "create" => self.create(ctx),
            "posts" => self.posts(ctx),
            "create_post" => self.create_post(ctx),
            other => Err(ControllerError::InvalidArgument {
                name: "operation".into(),
                reason: format!("blog has no operation '{other}'"),
            }),
        }
    }
}

fn requested_blogname<'a>(ctx: &'a ControllerContext<'_>) -> Option<&'a str> {
    ctx.arg_str("blogname").or_else(|| {
        ctx.arg("blog")
            .and_then(|b| b.get_path("blogname"))
            .and_then(Value::as_str)
    })
}

fn entities(list: &[Entity]) -> Value {
    Value::Seq(list.iter().map(Entity::to_value).collect())
}

fn is_valid_post(post: &Entity) -> bool {
    ["subject", "content"]
        .iter()
        .all(|field| post.get_str(field).is_some_and(|s| !s.trim().is_empty()))
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn post_form_elements(blogname: &str) -> Value {
    fn element(pairs: &[(&str, &str)]) -> Value {
        Value::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Value::from(*v)))
                .collect(),
        )
    }

    let mut elements = Map::new();
    elements.insert(
        "_blogname".into(),
        element(&[("type", "hidden"), ("fullname", "blogname"), ("value", blogname)]),
    );
    elements.insert(
        "subject".into(),
        element(&[("type", "input"), ("name", "subject"), ("label", "Subject:"), ("value", "(no subject)")]),
    );
    elements.insert(
        "content".into(),
        element(&[("type", "textarea"), ("name", "content"), ("label", "Content:")]),
    );
    elements.insert("_submit".into(), element(&[("type", "submit"), ("value", "Add Post")]));
    Value::Map(elements)
}
