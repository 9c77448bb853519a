// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use lazy_static::lazy_static;
use regex::Regex;

use crate::diagnostic::{DockerfileError, ErrorCode};
use crate::dockerfile_parser::Instruction;
use crate::lexer::Word;

use super::label::word_pairs;

lazy_static! {
  static ref ARG_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Parses an [`ARG` instruction][arg].
///
/// `args` holds the declared names. A single declaration with a default
/// stores the unquoted default in `flags["default"]`.
///
/// [arg]: https://docs.docker.com/engine/reference/builder/#arg
pub(crate) fn parse_arg(words: &[Word], ins: &mut Instruction) -> Result<(), DockerfileError> {
  if words.is_empty() {
    return Err(DockerfileError::instruction(
      ins.range.start.clone(),
      "ARG requires a name"
    ));
  }

  let pairs = word_pairs(words)?;

  for (pair, word) in &pairs {
    if !ARG_NAME.is_match(&pair.key) {
      return Err(DockerfileError::new(
        ErrorCode::VariableError,
        word.range.start.clone(),
        format!("invalid ARG name: {}", pair.key)
      ));
    }

    ins.args.push(pair.key.clone());
  }

  if let [(pair, _)] = pairs.as_slice() {
    if let Some(default) = &pair.value {
      ins.flags.insert("default".into(), default.clone());
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::diagnostic::ErrorCode;
  use crate::instructions::test_support::*;

  #[test]
  fn arg_default() {
    let ins = parse_one("ARG VERSION=1.0").unwrap();
    assert_eq!(ins.args, vec!["VERSION"]);
    assert_eq!(ins.flag("default"), Some("1.0"));

    let ins = parse_one(r#"ARG GREETING="hello world""#).unwrap();
    assert_eq!(ins.flag("default"), Some("hello world"));

    let ins = parse_one("ARG EMPTY=").unwrap();
    assert_eq!(ins.flag("default"), Some(""));
  }

  #[test]
  fn arg_without_default() {
    let ins = parse_one("ARG user").unwrap();
    assert_eq!(ins.args, vec!["user"]);
    assert_eq!(ins.flag("default"), None);
  }

  #[test]
  fn arg_multiple() {
    let ins = parse_one("ARG A=1 B").unwrap();
    assert_eq!(ins.args, vec!["A", "B"]);
    assert!(ins.flags.is_empty());
  }

  #[test]
  fn arg_errors() {
    let err = parse_one("ARG").unwrap_err();
    assert_eq!(err.message, "ARG requires a name");

    let err = parse_one("ARG 1abc=x").unwrap_err();
    assert_eq!(err.code, ErrorCode::VariableError);
    assert_eq!(err.message, "invalid ARG name: 1abc");
  }
}
