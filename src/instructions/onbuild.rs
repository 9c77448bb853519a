// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::diagnostic::DockerfileError;
use crate::dockerfile_parser::Instruction;
use crate::lexer::Word;
use crate::token::InstructionKind;

use super::join_words;

/// Parses an [`ONBUILD` instruction][onbuild].
///
/// The trigger is kept as one string in `args`; its keyword is stored in
/// `flags["trigger"]`. Triggers are not parsed further.
///
/// [onbuild]: https://docs.docker.com/engine/reference/builder/#onbuild
pub(crate) fn parse_onbuild(words: &[Word], ins: &mut Instruction) -> Result<(), DockerfileError> {
  let trigger = match words.first() {
    Some(trigger) => trigger,
    None => {
      return Err(DockerfileError::instruction(
        ins.range.start.clone(),
        "ONBUILD requires a trigger instruction"
      ));
    }
  };

  match InstructionKind::from_keyword(&trigger.text) {
    Some(InstructionKind::Onbuild) => {
      return Err(DockerfileError::instruction(
        trigger.range.start.clone(),
        "ONBUILD cannot be nested (ONBUILD ONBUILD ...)"
      ));
    },
    Some(InstructionKind::From) => {
      return Err(DockerfileError::instruction(
        trigger.range.start.clone(),
        "ONBUILD cannot trigger FROM"
      ));
    },
    Some(_) => (),
    None if trigger.text == "MAINTAINER" => {
      return Err(DockerfileError::instruction(
        trigger.range.start.clone(),
        "ONBUILD cannot trigger MAINTAINER"
      ));
    },
    None => {
      return Err(DockerfileError::instruction(
        trigger.range.start.clone(),
        format!("unknown ONBUILD trigger instruction: {}", trigger.text)
      ));
    }
  }

  ins.flags.insert("trigger".into(), trigger.text.clone());
  ins.args = vec![join_words(words)];
  Ok(())
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::instructions::test_support::*;

  #[test]
  fn onbuild_trigger() {
    let ins = parse_one("ONBUILD RUN echo hi").unwrap();
    assert_eq!(ins.args, vec!["RUN echo hi"]);
    assert_eq!(ins.flag("trigger"), Some("RUN"));

    let ins = parse_one("ONBUILD COPY --from=build /a /b").unwrap();
    assert_eq!(ins.args, vec!["COPY --from=build /a /b"]);
    assert!(ins.dependencies.is_empty());
  }

  #[test]
  fn onbuild_errors() {
    let err = parse_one("ONBUILD ONBUILD RUN x").unwrap_err();
    assert_eq!(err.message, "ONBUILD cannot be nested (ONBUILD ONBUILD ...)");

    let err = parse_one("ONBUILD FROM scratch").unwrap_err();
    assert_eq!(err.message, "ONBUILD cannot trigger FROM");

    let err = parse_one("ONBUILD MAINTAINER me").unwrap_err();
    assert_eq!(err.message, "ONBUILD cannot trigger MAINTAINER");

    let err = parse_one("ONBUILD run x").unwrap_err();
    assert_eq!(err.message, "unknown ONBUILD trigger instruction: run");

    let err = parse_one("ONBUILD").unwrap_err();
    assert_eq!(err.message, "ONBUILD requires a trigger instruction");
  }
}
