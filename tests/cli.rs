//! Command-line front tests against the built `elation-cli` binary.

use std::fs;
use std::process::Command;

mod common;

fn cli(site: &common::Site) -> Command {
    let config_path = site.dir.path().join("app.toml");
    fs::write(&config_path, toml::to_string(&site.config).unwrap()).unwrap();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_elation-cli"));
    cmd.arg("--config").arg(config_path);
    cmd
}

#[test]
fn test_dispatch_prints_rendered_output() {
    let site = common::Site::new();
    let out = cli(&site).args(["/blog/view", "blogname=acme"]).output().unwrap();

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "view:acme:");
}

#[test]
fn test_unknown_path_exits_non_zero() {
    let site = common::Site::new();
    let out = cli(&site).arg("/nope/x").output().unwrap();

    assert!(!out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "notfound:/nope/x");
    assert!(String::from_utf8_lossy(&out.stderr).contains("status 404"));
}

#[test]
fn test_controller_failure_exits_non_zero() {
    let site = common::Site::new();
    fs::remove_file(site.dir.path().join("templates/blog/view.tpl")).unwrap();
    let out = cli(&site).arg("/blog/view").output().unwrap();

    assert!(!out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "exception:RenderError");
}
