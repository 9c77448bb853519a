// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

//! Instructions that take a path list or a single value.

use crate::diagnostic::DockerfileError;
use crate::dockerfile_parser::Instruction;
use crate::lexer::Word;
use crate::token::InstructionKind;
use crate::util::strip_quotes;

use super::{decode_json, join_words, require_args, starts_json};

/// Parses a [`VOLUME` instruction][volume], given either as a JSON array or
/// as space separated paths.
///
/// [volume]: https://docs.docker.com/engine/reference/builder/#volume
pub(crate) fn parse_volume(words: &[Word], ins: &mut Instruction) -> Result<(), DockerfileError> {
  require_args(words, ins)?;

  if starts_json(words) {
    ins.args = decode_json(words)?;
    ins.json_form = true;
  } else {
    ins.args = words.iter().map(|w| strip_quotes(&w.text)).collect();
  }

  Ok(())
}

/// Parses `USER` and `WORKDIR`, which take their whole argument text as one
/// value.
pub(crate) fn parse_single_string(words: &[Word], ins: &mut Instruction) -> Result<(), DockerfileError> {
  let value = join_words(words);

  if value.is_empty() {
    let message = match ins.kind {
      InstructionKind::User => "USER requires a username or UID",
      _ => "WORKDIR requires a path"
    };

    return Err(DockerfileError::instruction(ins.range.start.clone(), message));
  }

  ins.args = vec![value];
  Ok(())
}

/// Parses a [`STOPSIGNAL` instruction][stopsignal]: a signal number or a
/// `SIG`-prefixed name.
///
/// [stopsignal]: https://docs.docker.com/engine/reference/builder/#stopsignal
pub(crate) fn parse_stopsignal(words: &[Word], ins: &mut Instruction) -> Result<(), DockerfileError> {
  let signal = match words {
    [signal] => signal,
    [] => {
      return Err(DockerfileError::instruction(
        ins.range.start.clone(),
        "STOPSIGNAL requires a signal"
      ));
    },
    [_, extra, ..] => {
      return Err(DockerfileError::instruction(
        extra.range.start.clone(),
        format!("unexpected STOPSIGNAL argument: {}", extra.text)
      ));
    }
  };

  let valid = signal.has_variable()
    || signal.text.parse::<u32>().is_ok()
    || signal.text.starts_with("SIG");

  if !valid {
    return Err(DockerfileError::instruction(
      signal.range.start.clone(),
      format!("invalid signal: {}", signal.text)
    ));
  }

  ins.args = vec![signal.text.clone()];
  Ok(())
}
