//! Template evaluation seam.
//!
//! The engine only needs two operations from a templating collaborator:
//! render a string and evaluate a boolean expression. [`SimpleTemplates`]
//! covers `{{ .ProjectName }}` and `{{ .Env.NAME }}` references, which is
//! enough for skip conditions and URL settings.

use crate::context::Context;
use crate::errors::TemplateError;
use regex::Regex;
use std::fmt::Debug;
use std::sync::LazyLock;

/// Renders templated configuration values against the context.
pub trait TemplateEvaluator: Send + Sync + Debug {
    /// Renders a template into a string.
    fn apply(&self, expr: &str, ctx: &Context) -> Result<String, TemplateError>;

    /// Renders a template and interprets it as a boolean.
    ///
    /// Only a rendering of `true` (ignoring case and surrounding whitespace)
    /// is `true`. Anything else, including `yes` and `1`, is `false`.
    fn evaluate_bool(&self, expr: &str, ctx: &Context) -> Result<bool, TemplateError> {
        Ok(self.apply(expr, ctx)?.trim().eq_ignore_ascii_case("true"))
    }
}

/// Minimal evaluator for `.ProjectName` and `.Env.NAME` references.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTemplates;

impl SimpleTemplates {
    /// Creates a new evaluator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

static REFERENCE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}"));

impl TemplateEvaluator for SimpleTemplates {
    fn apply(&self, expr: &str, ctx: &Context) -> Result<String, TemplateError> {
        let pattern = REFERENCE
            .as_ref()
            .map_err(|e| TemplateError::new(expr, e.to_string()))?;
        let mut out = String::with_capacity(expr.len());
        let mut last = 0;

        for caps in pattern.captures_iter(expr) {
            let (Some(whole), Some(reference)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&expr[last..whole.start()]);
            out.push_str(&resolve_reference(expr, reference.as_str(), ctx)?);
            last = whole.end();
        }
        out.push_str(&expr[last..]);

        if out.contains("{{") || out.contains("}}") {
            return Err(TemplateError::new(expr, "unbalanced template delimiters"));
        }
        Ok(out)
    }
}

fn resolve_reference(expr: &str, reference: &str, ctx: &Context) -> Result<String, TemplateError> {
    if reference == ".ProjectName" {
        return Ok(ctx.config.project_name.clone());
    }
    if let Some(name) = reference.strip_prefix(".Env.") {
        return ctx
            .env()
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::new(expr, format!("environment variable {name} is not set")));
    }
    Err(TemplateError::new(
        expr,
        format!("unsupported reference '{reference}'"),
    ))
}
