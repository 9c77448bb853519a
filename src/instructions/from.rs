// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use lazy_static::lazy_static;
use regex::Regex;

use crate::diagnostic::{DockerfileError, ErrorCode};
use crate::dockerfile_parser::Instruction;
use crate::lexer::Word;
use crate::token::TokenType;
use crate::util::split_flag;

lazy_static! {
  static ref STAGE_NAME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_.-]*$").unwrap();
}

/// Parses a [`FROM` instruction][from].
///
/// The base image is the only positional argument; `AS name` goes to
/// `flags["stage"]` and `--platform=` to `flags["platform"]`.
///
/// [from]: https://docs.docker.com/engine/reference/builder/#from
pub(crate) fn parse_from(words: &[Word], ins: &mut Instruction) -> Result<(), DockerfileError> {
  if words.is_empty() {
    return Err(DockerfileError::instruction(
      ins.range.start.clone(),
      "FROM requires at least one argument"
    ));
  }

  let mut positional = Vec::new();
  let mut i = 0;

  while i < words.len() {
    let word = &words[i];

    if word.is(TokenType::As) {
      let name = words.get(i + 1).ok_or_else(|| DockerfileError::instruction(
        word.range.start.clone(),
        "FROM ... AS requires a stage name"
      ))?;

      if !STAGE_NAME.is_match(&name.text) {
        return Err(DockerfileError::new(
          ErrorCode::StageError,
          name.range.start.clone(),
          format!("invalid stage name: {}", name.text)
        ));
      }

      ins.flags.insert("stage".into(), name.text.clone());
      i += 2;
      continue;
    }

    match split_flag(&word.text) {
      Some(("platform", Some(platform))) if !platform.is_empty() => {
        ins.flags.insert("platform".into(), platform.to_string());
      },
      Some((name, _)) => {
        return Err(DockerfileError::instruction(
          word.range.start.clone(),
          format!("unsupported FROM flag: --{}", name)
        ));
      },
      None => positional.push(word)
    }

    i += 1;
  }

  match positional.as_slice() {
    [] => Err(DockerfileError::instruction(
      ins.range.start.clone(),
      "FROM requires a base image"
    )),
    [image] => {
      ins.args = vec![image.text.clone()];
      Ok(())
    },
    [_, extra, ..] => Err(DockerfileError::instruction(
      extra.range.start.clone(),
      format!("unexpected FROM argument: {}", extra.text)
    ))
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::diagnostic::ErrorCode;
  use crate::instructions::test_support::*;

  #[test]
  fn from_image() {
    let ins = parse_one("FROM alpine:3.10").unwrap();
    assert_eq!(ins.args, vec!["alpine:3.10"]);
    assert!(ins.flags.is_empty());
  }

  #[test]
  fn from_stage_and_platform() {
    let ins = parse_one("FROM --platform=linux/arm64 golang:1.16 as build").unwrap();
    assert_eq!(ins.args, vec!["golang:1.16"]);
    assert_eq!(ins.flag("stage"), Some("build"));
    assert_eq!(ins.flag("platform"), Some("linux/arm64"));
  }

  #[test]
  fn from_errors() {
    let err = parse_one("FROM").unwrap_err();
    assert_eq!(err.message, "FROM requires at least one argument");

    let err = parse_one("FROM alpine:3.10 as").unwrap_err();
    assert_eq!(err.code, ErrorCode::InstructionError);
    assert_eq!(err.position.column, 18);

    let err = parse_one("FROM alpine:3.10 from example").unwrap_err();
    assert_eq!(err.message, "unexpected FROM argument: from");

    let err = parse_one("FROM alpine AS 1stage").unwrap_err();
    assert_eq!(err.code, ErrorCode::StageError);

    let err = parse_one("FROM --pull alpine").unwrap_err();
    assert_eq!(err.message, "unsupported FROM flag: --pull");
  }
}
