// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! User supplied format strings for event fields.
//!
//! Templates use the `{{ .Field }}` notation. An action is a pipeline of
//! commands separated by `|`, where each command is a field chain, a literal,
//! or one of the functions `index`, `len`, `print`, `lower`, `upper` and
//! `trimPrefix`. When piped, the previous value becomes the last argument:
//!
//! ```
//! use docker_riemann::template::compile;
//! use serde_json::json;
//!
//! let template = compile("service", r#"docker {{ .Name | trimPrefix "app-" }}"#).unwrap();
//! assert_eq!(template.render(&json!({"Name": "app-web1"})), "docker web1");
//! ```
//!
//! `{{-` and `-}}` trim the whitespace next to the action and `{{/* ... */}}`
//! is a comment. Control structures such as `if` and `range` are rejected at
//! compile time.

mod eval;
mod parse;

use serde_json::Value;
use tracing::error;

use crate::errors::{CompileError, RenderError};
use parse::Node;

/// A compiled template, reusable across events.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

/// Compiles `text` into a [`Template`]. `name` identifies the template in
/// error messages, e.g. `service` or `attribute 'env'`.
pub fn compile(name: &str, text: &str) -> Result<Template, CompileError> {
    let nodes = parse::parse(text).map_err(|reason| CompileError {
        name: name.to_string(),
        text: text.to_string(),
        reason,
    })?;
    Ok(Template {
        name: name.to_string(),
        nodes,
    })
}

impl Template {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates the template, surfacing any field resolution failure.
    pub fn execute(&self, context: &Value) -> Result<String, RenderError> {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(pipeline) => {
                    eval::write_value(&mut out, &eval::pipeline(pipeline, context)?);
                }
            }
        }
        Ok(out)
    }

    /// Evaluates the template, logging failures and rendering them as an
    /// empty string so that one bad template never stalls the pipeline.
    #[must_use]
    pub fn render(&self, context: &Value) -> String {
        match self.execute(context) {
            Ok(rendered) => rendered,
            Err(e) => {
                error!("Failed to render template {}: {}", self.name, e);
                String::new()
            }
        }
    }
}
