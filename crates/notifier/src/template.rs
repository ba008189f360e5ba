//! Message templating.
//!
//! Message text is a Handlebars template evaluated against the environment:
//! every variable except the webhook secrets is exposed under its camel-cased
//! name, so `DRONE_BUILD_STATUS` is referenced as `{{DroneBuildStatus}}`.

use std::collections::BTreeMap;

use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderErrorReason,
    handlebars_helper,
};
use serde::Serialize;
use serde_json::Value;

use slack_common::env::EnvSnapshot;

use crate::error::TemplateError;

/// Variables that may carry a webhook URL and never reach a template.
pub const SECRET_ENV_VARIABLES: [&str; 3] = ["PLUGIN_WEBHOOK", "SLACK_WEBHOOK", "WEBHOOK"];

/// Rendered in place of a variable the context does not contain.
pub const MISSING_VALUE: &str = "<no value>";

/// Converts an environment variable name into a camel-cased key, for example
/// `BUILD_MESSAGE` becomes `BuildMessage` and `DRONE` becomes `Drone`.
pub fn env_variable_to_camel_case(env_var: &str) -> String {
    let mut camel_case = String::with_capacity(env_var.len());
    let mut to_upper = true;

    for ch in env_var.chars() {
        if ch == '_' {
            to_upper = true;
        } else if to_upper {
            camel_case.extend(ch.to_uppercase());
            to_upper = false;
        } else {
            camel_case.extend(ch.to_lowercase());
        }
    }

    camel_case
}

/// Values a template can reference, keyed by camel-cased variable name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TemplateContext(BTreeMap<String, String>);

impl TemplateContext {
    /// Build the context from an environment snapshot, leaving out secrets.
    pub fn from_env(env: &EnvSnapshot) -> Self {
        Self(
            env.iter()
                .filter(|(name, _)| !SECRET_ENV_VARIABLES.contains(name))
                .map(|(name, value)| (env_variable_to_camel_case(name), value.to_string()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Plain variables that are not in the context render as [`MISSING_VALUE`].
/// Anything invoked with arguments is an unknown helper and fails the render.
fn missing_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    if h.params().is_empty() && h.hash().is_empty() {
        out.write(MISSING_VALUE)?;
        Ok(())
    } else {
        Err(RenderErrorReason::Other(format!("Helper not found: {}", h.name())).into())
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(b) => !b,
        Value::Number(_) => false,
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

handlebars_helper!(list: |*args| args.into_iter().cloned().collect::<Vec<Value>>());
handlebars_helper!(join: |sep: str, items: array| items
    .iter()
    .map(display_value)
    .collect::<Vec<_>>()
    .join(sep));
handlebars_helper!(upper: |s: str| s.to_uppercase());
handlebars_helper!(lower: |s: str| s.to_lowercase());
handlebars_helper!(trim: |s: str| s.trim().to_string());
handlebars_helper!(title: |s: str| title_case(s));
handlebars_helper!(replace: |old: str, new: str, s: str| s.replace(old, new));
handlebars_helper!(default: |fallback: Json, value: Json| if is_empty_value(value) {
    fallback.clone()
} else {
    value.clone()
});

/// Renders message text against a [`TemplateContext`].
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

impl TemplateRenderer {
    /// Create a renderer. With `helpers` set the string/list helper library
    /// (`list`, `join`, `upper`, `lower`, `trim`, `title`, `replace`, `default`)
    /// is available to templates.
    pub fn new(helpers: bool) -> Self {
        let mut handlebars = Handlebars::new();

        // Chat markup such as <url|label> must reach the webhook untouched
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(false);
        handlebars.register_helper("helperMissing", Box::new(missing_helper));

        if helpers {
            handlebars.register_helper("list", Box::new(list));
            handlebars.register_helper("join", Box::new(join));
            handlebars.register_helper("upper", Box::new(upper));
            handlebars.register_helper("lower", Box::new(lower));
            handlebars.register_helper("trim", Box::new(trim));
            handlebars.register_helper("title", Box::new(title));
            handlebars.register_helper("replace", Box::new(replace));
            handlebars.register_helper("default", Box::new(default));
        }

        Self { handlebars }
    }

    /// Render `template` against `context`.
    pub fn render(&self, template: &str, context: &TemplateContext) -> Result<String, TemplateError> {
        handlebars::Template::compile(template)
            .map_err(|e| TemplateError::Parse(e.to_string()))?;

        self.handlebars
            .render_template(template, context)
            .map_err(|e| TemplateError::Execution(e.to_string()))
    }

    /// Render `template` against a context built from `env`.
    pub fn render_with_env(&self, template: &str, env: &EnvSnapshot) -> Result<String, TemplateError> {
        self.render(template, &TemplateContext::from_env(env))
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}
