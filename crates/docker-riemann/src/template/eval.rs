// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde_json::Value;

use super::parse::{Command, Function, Operand, Pipeline};
use crate::errors::RenderError;

pub(super) fn pipeline(pipeline: &Pipeline, context: &Value) -> Result<Value, RenderError> {
    let mut piped: Option<Value> = None;
    for command in &pipeline.commands {
        let value = match command {
            Command::Operand(operand) => resolve(operand, context)?,
            Command::Call { function, args } => {
                let mut values = args
                    .iter()
                    .map(|arg| resolve(arg, context))
                    .collect::<Result<Vec<_>, _>>()?;
                values.extend(piped.take());
                call(*function, values)?
            }
        };
        piped = Some(value);
    }
    Ok(piped.unwrap_or(Value::Null))
}

fn resolve(operand: &Operand, context: &Value) -> Result<Value, RenderError> {
    match operand {
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Field(path) => {
            let mut current = context;
            for segment in path {
                current = match current {
                    Value::Object(fields) => fields.get(segment).ok_or_else(|| {
                        RenderError(format!("can't evaluate field {segment}"))
                    })?,
                    // absent metadata renders empty rather than failing
                    Value::Null => return Ok(Value::Null),
                    other => {
                        return Err(RenderError(format!(
                            "can't evaluate field {segment} in type {}",
                            kind(other)
                        )))
                    }
                };
            }
            Ok(current.clone())
        }
    }
}

fn call(function: Function, values: Vec<Value>) -> Result<Value, RenderError> {
    if function == Function::Index {
        return index(values);
    }
    match (function, values.as_slice()) {
        (Function::Len, [item]) => match item {
            Value::String(s) => Ok(Value::from(s.len())),
            Value::Array(items) => Ok(Value::from(items.len())),
            Value::Object(fields) => Ok(Value::from(fields.len())),
            other => Err(RenderError(format!(
                "len of type {} is not supported",
                kind(other)
            ))),
        },
        (Function::Print, values) => {
            let mut out = String::new();
            let mut previous_was_string = true;
            for value in values {
                if !previous_was_string && !value.is_string() {
                    out.push(' ');
                }
                write_value(&mut out, value);
                previous_was_string = value.is_string();
            }
            Ok(Value::String(out))
        }
        (Function::Lower, [item]) => Ok(Value::String(to_text(item).to_lowercase())),
        (Function::Upper, [item]) => Ok(Value::String(to_text(item).to_uppercase())),
        (Function::TrimPrefix, [prefix, item]) => {
            let prefix = to_text(prefix);
            let text = to_text(item);
            Ok(Value::String(
                text.strip_prefix(prefix.as_str())
                    .unwrap_or(&text)
                    .to_string(),
            ))
        }
        (function, values) => Err(RenderError(format!(
            "wrong number of args for {}: got {}",
            function.name(),
            values.len()
        ))),
    }
}

fn index(values: Vec<Value>) -> Result<Value, RenderError> {
    let mut values = values.into_iter();
    let mut current = values
        .next()
        .ok_or_else(|| RenderError("index of nothing".to_string()))?;

    for key in values {
        current = match (current, &key) {
            (Value::Object(mut fields), Value::String(name)) => {
                fields.remove(name).unwrap_or(Value::Null)
            }
            (Value::Array(mut items), Value::Number(position)) => {
                let position = position
                    .as_u64()
                    .and_then(|p| usize::try_from(p).ok())
                    .filter(|&p| p < items.len())
                    .ok_or_else(|| RenderError(format!("index out of range: {position}")))?;
                items.swap_remove(position)
            }
            (Value::Null, _) => Value::Null,
            (other, key) => {
                return Err(RenderError(format!(
                    "can't index item of type {} with {key}",
                    kind(&other)
                )))
            }
        };
    }
    Ok(current)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn to_text(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

pub(super) fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Array(_) | Value::Object(_) => out.push_str(&value.to_string()),
    }
}
