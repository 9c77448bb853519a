// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::diagnostic::DockerfileError;
use crate::dockerfile_parser::Instruction;
use crate::lexer::Word;

use super::{decode_json, exec_or_shell, starts_json};

/// Parses a [`CMD` instruction][cmd], in either exec or shell form.
///
/// [cmd]: https://docs.docker.com/engine/reference/builder/#cmd
pub(crate) fn parse_cmd(words: &[Word], ins: &mut Instruction) -> Result<(), DockerfileError> {
  exec_or_shell(words, ins)
}

/// Parses an [`ENTRYPOINT` instruction][entrypoint]; the rules are those of
/// `CMD`.
///
/// [entrypoint]: https://docs.docker.com/engine/reference/builder/#entrypoint
pub(crate) fn parse_entrypoint(words: &[Word], ins: &mut Instruction) -> Result<(), DockerfileError> {
  parse_cmd(words, ins)
}

/// Parses a [`SHELL` instruction][shell], which only has an exec form.
///
/// [shell]: https://docs.docker.com/engine/reference/builder/#shell
pub(crate) fn parse_shell(words: &[Word], ins: &mut Instruction) -> Result<(), DockerfileError> {
  if !starts_json(words) {
    return Err(DockerfileError::instruction(
      ins.range.start.clone(),
      "SHELL requires the arguments to be in JSON form"
    ));
  }

  let args = decode_json(words)?;
  if args.is_empty() {
    return Err(DockerfileError::instruction(
      ins.range.start.clone(),
      "SHELL requires at least one argument"
    ));
  }

  ins.args = args;
  ins.json_form = true;
  Ok(())
}
