// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::sync::Arc;

use enquote::unquote;
use pest::Parser;

use crate::diagnostic::DockerfileError;
use crate::error::unexpected_token;
use crate::parser::{LiteralParser, Pair, Rule};
use crate::position::Position;

/// Given the raw text of a JSON array literal, returns an unescaped array of
/// strings.
///
/// A malformed literal is a syntax error carrying the offending text.
pub(crate) fn parse_string_array(
  text: &str,
  position: &Position
) -> Result<Vec<String>, DockerfileError> {
  let pairs = LiteralParser::parse(Rule::json_array, text).map_err(|e| {
    DockerfileError::syntax(position.clone(), "invalid JSON array", text)
      .with_cause(Arc::new(e))
  })?;

  let mut ret = Vec::new();
  for pair in pairs {
    match pair.as_rule() {
      Rule::string_array => {
        for field in pair.into_inner() {
          match field.as_rule() {
            Rule::string => {
              let s = unquote(field.as_str()).map_err(|e| {
                DockerfileError::syntax(
                  position.clone(), "invalid escape in JSON string", field.as_str()
                ).with_cause(Arc::new(e))
              })?;

              ret.push(s);
            },
            _ => return Err(unexpected_token(field, position.clone()))
          }
        }
      },
      Rule::EOI => (),
      _ => return Err(unexpected_token(pair, position.clone()))
    }
  }

  Ok(ret)
}

/// A single `key[=value]` declaration.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct KeyValue {
  pub key: String,

  /// The unquoted value, `None` if there was no `=`
  pub value: Option<String>
}

impl KeyValue {
  pub fn new<S1, S2>(key: S1, value: Option<S2>) -> KeyValue
  where
    S1: Into<String>,
    S2: Into<String>
  {
    KeyValue {
      key: key.into(),
      value: value.map(|v| v.into())
    }
  }
}

/// Removes backslash escapes, keeping the escaped character.
fn unescape(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut chars = s.chars();

  while let Some(c) = chars.next() {
    if c == '\\' {
      match chars.next() {
        Some(next) => out.push(next),
        None => out.push(c)
      }
    } else {
      out.push(c);
    }
  }

  out
}

/// Joins the quoted and bare segments of a key or value.
fn decode_segments(record: Pair) -> String {
  let mut out = String::new();

  for part in record.into_inner() {
    let s = part.as_str();
    match part.as_rule() {
      Rule::kv_double => out.push_str(&unescape(&s[1..s.len() - 1])),
      Rule::kv_single => out.push_str(&s[1..s.len() - 1]),
      _ => out.push_str(&unescape(s))
    }
  }

  out
}

fn parse_kv_pair(record: Pair, position: &Position) -> Result<KeyValue, DockerfileError> {
  let mut key = None;
  let mut value = None;

  for field in record.into_inner() {
    match field.as_rule() {
      Rule::kv_key => key = Some(decode_segments(field)),
      Rule::kv_equals => value = Some(String::new()),
      Rule::kv_value => value = Some(decode_segments(field)),
      _ => return Err(unexpected_token(field, position.clone()))
    }
  }

  let key = key.ok_or_else(|| {
    DockerfileError::syntax(position.clone(), "key/value pair requires a key", "")
  })?;

  Ok(KeyValue::new(key, value))
}

/// Parses whitespace separated `key=value` pairs. Values may be quoted and
/// may contain escaped characters; quoted segments can be concatenated with
/// bare ones (`a="b c"d`).
pub(crate) fn parse_kv_pairs(
  text: &str,
  position: &Position
) -> Result<Vec<KeyValue>, DockerfileError> {
  let pairs = LiteralParser::parse(Rule::kv_pairs, text).map_err(|e| {
    DockerfileError::syntax(position.clone(), "invalid key/value pair", text)
      .with_cause(Arc::new(e))
  })?;

  let mut ret = Vec::new();
  for pair in pairs {
    match pair.as_rule() {
      Rule::kv_pair => ret.push(parse_kv_pair(pair, position)?),
      Rule::EOI => (),
      _ => return Err(unexpected_token(pair, position.clone()))
    }
  }

  Ok(ret)
}

/// Splits a `--name[=value]` flag word. Returns None if `word` is not a flag.
pub(crate) fn split_flag(word: &str) -> Option<(&str, Option<&str>)> {
  let flag = word.strip_prefix("--")?;
  if flag.is_empty() {
    return None;
  }

  match flag.find('=') {
    Some(i) => Some((&flag[..i], Some(&flag[i + 1..]))),
    None => Some((flag, None))
  }
}

/// Removes one pair of matching surrounding quotes, if present.
pub(crate) fn strip_quotes(s: &str) -> String {
  let quoted = s.len() >= 2
    && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')));

  if quoted {
    s[1..s.len() - 1].to_string()
  } else {
    s.to_string()
  }
}
