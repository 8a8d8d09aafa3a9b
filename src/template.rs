//! Templated YAML
//!
//! Fixture and database config files are rendered with `tera` before they are
//! parsed, so values can be computed:
//!
//! ```yaml
//! luke:
//!   id: {{ 40 + 2 }}
//!   last_name: {{ "Sky" ~ "walker" }}
//! ```
//!
//! Files without template markup render unchanged.

use std::error::Error as StdError;

/// Render `source` with an empty context, without autoescaping.
pub fn render(source: &str) -> Result<String, tera::Error> {
    let mut tera = tera::Tera::default();
    tera.autoescape_on(vec![]);
    tera.render_str(source, &tera::Context::new())
}

/// A template error with its causes, outermost first.
pub fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
