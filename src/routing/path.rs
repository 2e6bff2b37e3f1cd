//! Request path parsing.
//!
//! # Responsibilities
//! - Split a request path into component, operation and trailing segments
//! - Recognize an output-mode extension on the last segment
//!
//! The parsing strategy is injected into the dispatcher through [`PathParser`];
//! [`SegmentPathParser`] implements the `<component>/<operation>` convention.

use crate::component::response::OutputMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub component: String,
    pub operation: String,
    pub output: OutputMode,
    /// Segments after the operation.
    pub extra: Vec<String>,
}

pub trait PathParser: Send + Sync {
    fn parse(&self, path: &str) -> ParsedPath;
}

/// `/<component>/<operation>[.<ext>][/<extra>...]`, with fallbacks for missing segments.
#[derive(Debug, Clone)]
pub struct SegmentPathParser {
    default_component: String,
    default_operation: String,
}

impl SegmentPathParser {
    pub fn new(default_component: impl Into<String>, default_operation: impl Into<String>) -> Self {
        Self {
            default_component: default_component.into(),
            default_operation: default_operation.into(),
        }
    }
}

impl Default for SegmentPathParser {
    fn default() -> Self {
        Self::new("index", "index")
    }
}

impl PathParser for SegmentPathParser {
    fn parse(&self, path: &str) -> ParsedPath {
        let mut segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let mut output = OutputMode::default();
        if let Some(last) = segments.last_mut() {
            if let Some((stem, ext)) = last.rsplit_once('.') {
                if let Some(mode) = OutputMode::from_extension(ext) {
                    output = mode;
                    *last = stem.to_string();
                }
            }
        }
        segments.retain(|s| !s.is_empty());

        let mut iter = segments.into_iter();
        let component = iter.next().unwrap_or_else(|| self.default_component.clone());
        let operation = iter.next().unwrap_or_else(|| self.default_operation.clone());

        ParsedPath {
            component,
            operation,
            output,
            extra: iter.collect(),
        }
    }
}
