// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde_json::{Number, Value};

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";

// Control structures are recognised only to reject them with a clear message.
const KEYWORDS: &[&str] = &[
    "block", "break", "continue", "define", "else", "end", "if", "nil", "range", "template",
    "with",
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Action(Pipeline),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub(crate) commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Operand(Operand),
    Call {
        function: Function,
        args: Vec<Operand>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    /// A chain of field names; empty means the whole context (`.`).
    Field(Vec<String>),
    Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Index,
    Len,
    Print,
    Lower,
    Upper,
    TrimPrefix,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "index" => Some(Self::Index),
            "len" => Some(Self::Len),
            "print" => Some(Self::Print),
            "lower" => Some(Self::Lower),
            "upper" => Some(Self::Upper),
            "trimPrefix" => Some(Self::TrimPrefix),
            _ => None,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Len => "len",
            Self::Print => "print",
            Self::Lower => "lower",
            Self::Upper => "upper",
            Self::TrimPrefix => "trimPrefix",
        }
    }

    fn check_arity(self, supplied: usize) -> Result<(), String> {
        let (min, max) = match self {
            Self::Index => (1, None),
            Self::Print => (0, None),
            Self::Len | Self::Lower | Self::Upper => (1, Some(1)),
            Self::TrimPrefix => (2, Some(2)),
        };
        if supplied < min || max.is_some_and(|max| supplied > max) {
            return Err(format!(
                "wrong number of args for {}: got {supplied}",
                self.name()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(Vec<String>),
    Literal(Value),
    Ident(String),
    Pipe,
}

/// Splits template text into literal text and actions.
pub(crate) fn parse(text: &str) -> Result<Vec<Node>, String> {
    let mut nodes = Vec::new();
    let mut rest = text;
    let mut trim_next = false;

    while let Some(start) = rest.find(LEFT_DELIM) {
        let mut literal = &rest[..start];
        if trim_next {
            literal = literal.trim_start();
        }

        let mut action = &rest[start + LEFT_DELIM.len()..];
        if let Some(stripped) = action.strip_prefix('-') {
            if stripped.starts_with(char::is_whitespace) {
                literal = literal.trim_end();
                action = stripped;
            }
        }
        push_text(&mut nodes, literal);

        let end = find_action_end(action)?;
        let mut body = &action[..end];
        rest = &action[end + RIGHT_DELIM.len()..];

        trim_next = false;
        if let Some(stripped) = body.strip_suffix('-') {
            if stripped.ends_with(char::is_whitespace) {
                body = stripped;
                trim_next = true;
            }
        }

        let body = body.trim();
        if body.starts_with("/*") {
            if body.len() < 4 || !body.ends_with("*/") {
                return Err("unclosed comment".to_string());
            }
            continue;
        }
        nodes.push(Node::Action(parse_pipeline(body)?));
    }

    let literal = if trim_next { rest.trim_start() } else { rest };
    push_text(&mut nodes, literal);
    Ok(nodes)
}

fn push_text(nodes: &mut Vec<Node>, literal: &str) {
    if literal.is_empty() {
        return;
    }
    if let Some(Node::Text(previous)) = nodes.last_mut() {
        previous.push_str(literal);
    } else {
        nodes.push(Node::Text(literal.to_string()));
    }
}

/// Byte offset of the closing delimiter, skipping over quoted strings.
fn find_action_end(action: &str) -> Result<usize, String> {
    let bytes = action.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'`') => i = skip_quoted(bytes, i, quote)?,
            b'}' if bytes.get(i + 1) == Some(&b'}') => return Ok(i),
            _ => i += 1,
        }
    }
    Err("unclosed action".to_string())
}

fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> Result<usize, String> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 2,
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err("unterminated quoted string".to_string())
}

fn parse_pipeline(body: &str) -> Result<Pipeline, String> {
    if body.is_empty() {
        return Err("missing value for command".to_string());
    }
    let tokens = tokenize(body)?;
    let commands = tokens
        .split(|token| matches!(token, Token::Pipe))
        .enumerate()
        .map(|(stage, tokens)| parse_command(tokens, stage > 0))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Pipeline { commands })
}

fn parse_command(tokens: &[Token], piped: bool) -> Result<Command, String> {
    let Some((first, rest)) = tokens.split_first() else {
        return Err("missing command in pipeline".to_string());
    };

    match first {
        Token::Ident(name) => {
            if KEYWORDS.contains(&name.as_str()) {
                return Err(format!("'{name}' actions are not supported"));
            }
            let function =
                Function::lookup(name).ok_or_else(|| format!("function \"{name}\" not defined"))?;
            let args = rest.iter().map(operand).collect::<Result<Vec<_>, _>>()?;
            function.check_arity(args.len() + usize::from(piped))?;
            Ok(Command::Call { function, args })
        }
        _ if piped => Err("non executable command in pipeline stage".to_string()),
        _ if !rest.is_empty() => Err("can't give argument to non-function".to_string()),
        _ => Ok(Command::Operand(operand(first)?)),
    }
}

fn operand(token: &Token) -> Result<Operand, String> {
    match token {
        Token::Field(path) => Ok(Operand::Field(path.clone())),
        Token::Literal(value) => Ok(Operand::Literal(value.clone())),
        Token::Ident(name) => Err(format!("function \"{name}\" can't be used as an argument")),
        Token::Pipe => Err("unexpected '|'".to_string()),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn tokenize(body: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = body.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        match c {
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            '"' => {
                let (literal, next) = lex_interpreted_string(&chars, i)?;
                tokens.push(Token::Literal(Value::String(literal)));
                i = next;
            }
            '`' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&c| c == '`')
                    .ok_or_else(|| "unterminated raw string".to_string())?;
                let literal: String = chars[i + 1..i + 1 + end].iter().collect();
                tokens.push(Token::Literal(Value::String(literal)));
                i += end + 2;
            }
            '.' => {
                let mut path = Vec::new();
                while i < chars.len() && chars[i] == '.' {
                    i += 1;
                    let segment_start = i;
                    while i < chars.len() && is_ident_char(chars[i]) {
                        i += 1;
                    }
                    if segment_start == i {
                        let lone_dot = path.is_empty() && chars.get(i) != Some(&'.');
                        if lone_dot {
                            break;
                        }
                        return Err("malformed field reference".to_string());
                    }
                    path.push(chars[segment_start..i].iter().collect());
                }
                tokens.push(Token::Field(path));
            }
            c if c == '-' || c == '+' || c.is_ascii_digit() => {
                while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '|' {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Literal(parse_number(&text)?));
            }
            c if c.is_alphabetic() || c == '_' => {
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected {other:?} in action")),
        }

        if i < chars.len() && !chars[i].is_whitespace() && chars[i] != '|' && c != '|' {
            return Err(format!("unexpected {:?} in action", chars[i]));
        }
    }
    Ok(tokens)
}

fn lex_interpreted_string(chars: &[char], start: usize) -> Result<(String, usize), String> {
    let mut literal = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '"' => return Ok((literal, i + 1)),
            '\\' => {
                let escaped = match chars.get(i + 1) {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('r') => '\r',
                    Some('\\') => '\\',
                    Some('"') => '"',
                    Some(other) => return Err(format!("invalid escape '\\{other}'")),
                    None => break,
                };
                literal.push(escaped);
                i += 2;
            }
            other => {
                literal.push(other);
                i += 1;
            }
        }
    }
    Err("unterminated quoted string".to_string())
}

fn parse_number(text: &str) -> Result<Value, String> {
    if let Ok(integer) = text.parse::<i64>() {
        return Ok(Value::from(integer));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| format!("bad number syntax: {text:?}"))
}
