// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::diagnostic::DockerfileError;
use crate::dockerfile_parser::Instruction;
use crate::lexer::Word;
use crate::util::strip_quotes;

use super::join_words;
use super::label::word_pairs;

/// Parses an [`ENV` instruction][env].
///
/// Both `ENV key=value ...` and the legacy `ENV key value` form are accepted;
/// either way each argument is a `key=value` string.
///
/// [env]: https://docs.docker.com/engine/reference/builder/#env
pub(crate) fn parse_env(words: &[Word], ins: &mut Instruction) -> Result<(), DockerfileError> {
  let first = match words.first() {
    Some(first) => first,
    None => {
      return Err(DockerfileError::instruction(
        ins.range.start.clone(),
        "ENV requires at least one variable"
      ));
    }
  };

  if !first.text.contains('=') {
    if words.len() < 2 {
      return Err(DockerfileError::instruction(
        first.range.start.clone(),
        format!("ENV requires a value for variable: {}", first.text)
      ));
    }

    let value = strip_quotes(&join_words(&words[1..]));
    ins.args = vec![format!("{}={}", first.text, value)];
    return Ok(());
  }

  for (pair, word) in word_pairs(words)? {
    match pair.value {
      Some(value) => ins.args.push(format!("{}={}", pair.key, value)),
      None => {
        return Err(DockerfileError::instruction(
          word.range.start.clone(),
          format!("ENV requires a value for variable: {}", pair.key)
        ));
      }
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
  fn env_pairs() {
    let ins = parse_one(r#"ENV PATH=/usr/local/bin:$PATH NAME="John Doe" EMPTY="""#).unwrap();
    assert_eq!(ins.args, vec!["PATH=/usr/local/bin:$PATH", "NAME=John Doe", "EMPTY="]);
  }

  #[test]
  fn env_legacy() {
    let ins = parse_one("ENV GREETING hello world").unwrap();
    assert_eq!(ins.args, vec!["GREETING=hello world"]);
  }

  #[test]
  fn env_errors() {
    let err = parse_one("ENV").unwrap_err();
    assert_eq!(err.message, "ENV requires at least one variable");

    let err = parse_one("ENV LONELY").unwrap_err();
    assert_eq!(err.code, ErrorCode::InstructionError);

    let err = parse_one("ENV A=1 B").unwrap_err();
    assert_eq!(err.message, "ENV requires a value for variable: B");
  }
}
