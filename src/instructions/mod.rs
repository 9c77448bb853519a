// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

//! Per-instruction validation rules.
//!
//! Each routine receives the lexed line and fills in the `args`, `flags` and
//! `dependencies` of an [`Instruction`] prepared by [`parse_instruction`].

use log::trace;

use crate::diagnostic::{DockerfileError, ErrorCollector};
use crate::dockerfile_parser::Instruction;
use crate::lexer::{InstructionTokens, Word};
use crate::position::Position;
use crate::token::{InstructionKind, TokenType};
use crate::util::{parse_string_array, split_flag};

mod from;
mod run;
mod cmd;
mod label;
mod env;
mod expose;
mod copy;
mod arg;
mod onbuild;
mod healthcheck;
mod misc;

/// A `--name[=value]` flag preceding an instruction's arguments.
#[derive(Debug, PartialEq, Eq, Clone)]
pub(crate) struct Flag {
  pub name: String,
  pub value: Option<String>,
  pub position: Position
}

impl Flag {
  /// Returns the flag's value, or an error if it was given without one.
  pub(crate) fn required_value(&self) -> Result<&str, DockerfileError> {
    self.value.as_deref().ok_or_else(|| DockerfileError::instruction(
      self.position.clone(),
      format!("flag --{} requires a value", self.name)
    ))
  }
}

/// Splits the leading `--flag` words off a line.
pub(crate) fn leading_flags(words: &[Word]) -> (Vec<Flag>, &[Word]) {
  let mut flags = Vec::new();

  for (i, word) in words.iter().enumerate() {
    match split_flag(&word.text) {
      Some((name, value)) => flags.push(Flag {
        name: name.to_string(),
        value: value.map(String::from),
        position: word.range.start.clone()
      }),
      None => return (flags, &words[i..])
    }
  }

  (flags, &words[words.len()..])
}

pub(crate) fn join_words(words: &[Word]) -> String {
  words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ")
}

/// Whether the words open with a JSON array token.
pub(crate) fn starts_json(words: &[Word]) -> bool {
  words.first()
    .and_then(|w| w.kinds.first())
    .map(|k| *k == TokenType::JsonArray)
    .unwrap_or(false)
}

/// Decodes exec-form arguments. Trailing text after the array is part of
/// the literal and makes it invalid.
pub(crate) fn decode_json(words: &[Word]) -> Result<Vec<String>, DockerfileError> {
  let position = words.first()
    .map(|w| w.range.start.clone())
    .unwrap_or_default();

  parse_string_array(&join_words(words), &position)
}

/// Parses exec form when the arguments start with a JSON array, otherwise
/// returns the shell-form string, which must not be empty.
pub(crate) fn exec_or_shell(
  words: &[Word],
  ins: &mut Instruction
) -> Result<(), DockerfileError> {
  if starts_json(words) {
    ins.args = decode_json(words)?;
    ins.json_form = true;
    return Ok(());
  }

  let shell = join_words(words);
  if shell.is_empty() {
    return Err(DockerfileError::instruction(
      ins.range.start.clone(),
      format!("{} requires at least one argument", ins.command)
    ));
  }

  ins.args = vec![shell];
  ins.json_form = false;
  Ok(())
}

pub(crate) fn require_args(
  words: &[Word],
  ins: &Instruction
) -> Result<(), DockerfileError> {
  if words.is_empty() {
    Err(DockerfileError::instruction(
      ins.range.start.clone(),
      format!("{} requires at least one argument", ins.command)
    ))
  } else {
    Ok(())
  }
}

/// Validates a lexed line and converts it into an [`Instruction`].
pub(crate) fn parse_instruction(
  line: &InstructionTokens,
  source: &str,
  stage: Option<usize>,
  collector: &mut ErrorCollector
) -> Result<Instruction, DockerfileError> {
  use InstructionKind as K;

  let mut ins = Instruction::from_tokens(line, source, stage);
  let words = line.words();

  trace!("parsing {} at line {}", ins.command, ins.range.start.line);

  let result = match line.kind() {
    K::From => from::parse_from(&words, &mut ins),
    K::Run => run::parse_run(&words, &mut ins),
    K::Cmd => cmd::parse_cmd(&words, &mut ins),
    K::Entrypoint => cmd::parse_entrypoint(&words, &mut ins),
    K::Shell => cmd::parse_shell(&words, &mut ins),
    K::Label => label::parse_label(&words, &mut ins),
    K::Env => env::parse_env(&words, &mut ins),
    K::Expose => expose::parse_expose(&words, &mut ins, collector),
    K::Add | K::Copy => copy::parse_copy(&words, &mut ins),
    K::Volume => misc::parse_volume(&words, &mut ins),
    K::User | K::Workdir => misc::parse_single_string(&words, &mut ins),
    K::Stopsignal => misc::parse_stopsignal(&words, &mut ins),
    K::Arg => arg::parse_arg(&words, &mut ins),
    K::Onbuild => onbuild::parse_onbuild(&words, &mut ins),
    K::Healthcheck => healthcheck::parse_healthcheck(&words, &mut ins),
    K::Unknown => Err(DockerfileError::instruction(
      ins.range.start.clone(),
      format!("unknown instruction: {}", ins.command)
    ))
  };

  match result {
    Ok(()) => Ok(ins),
    Err(e) if e.snippet.is_none() => {
      let snippet = ins.raw.lines().next().unwrap_or("").to_string();
      Err(e.with_snippet(snippet))
    },
    Err(e) => Err(e)
  }
}


#[cfg(test)]
mod tests {
  use super::test_support::*;
  use crate::diagnostic::ErrorCode;

  #[test]
  fn unknown_instruction() {
    let err = parse_one("MAINTAINER someone@example.com").unwrap_err();
    assert_eq!(err.code, ErrorCode::InstructionError);
    assert_eq!(err.message, "unknown instruction: MAINTAINER");
    assert_eq!(err.snippet.as_deref(), Some("MAINTAINER someone@example.com"));
  }

  #[test]
  fn flags_split() {
    let line = crate::test_util::lex_one("COPY --link --chown=1:1 a b");
    let words = line.words();
    let (flags, rest) = super::leading_flags(&words);

    assert_eq!(flags.len(), 2);
    assert_eq!(flags[0].value, None);
    assert_eq!(flags[1].value.as_deref(), Some("1:1"));
    assert_eq!(rest.len(), 2);
  }
}
