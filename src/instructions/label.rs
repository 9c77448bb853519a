// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::diagnostic::DockerfileError;
use crate::dockerfile_parser::Instruction;
use crate::lexer::Word;
use crate::util::{parse_kv_pairs, KeyValue};

/// Decodes the `key=value` pairs of each word. Keys without a value are
/// returned as-is for the caller to reject.
pub(crate) fn word_pairs(words: &[Word]) -> Result<Vec<(KeyValue, &Word)>, DockerfileError> {
  let mut pairs = Vec::new();

  for word in words {
    for pair in parse_kv_pairs(&word.text, &word.range.start)? {
      pairs.push((pair, word));
    }
  }

  Ok(pairs)
}

/// Parses a [`LABEL` instruction][label] into `key=value` arguments with
/// unquoted values.
///
/// [label]: https://docs.docker.com/engine/reference/builder/#label
pub(crate) fn parse_label(words: &[Word], ins: &mut Instruction) -> Result<(), DockerfileError> {
  if words.is_empty() {
    return Err(DockerfileError::instruction(
      ins.range.start.clone(),
      "LABEL requires at least one key=value pair"
    ));
  }

  for (pair, word) in word_pairs(words)? {
    match pair.value {
      Some(value) => ins.args.push(format!("{}={}", pair.key, value)),
      None => {
        return Err(DockerfileError::instruction(
          word.range.start.clone(),
          format!("LABEL requires a value for key: {}", pair.key)
        ));
      }
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  use crate::diagnostic::ErrorCode;
  use crate::instructions::test_support::*;

  #[test]
  fn label_pairs() {
    let ins = parse_one(r#"LABEL version="1.0" maintainer=me description="a b=c""#).unwrap();
    assert_eq!(ins.args, vec!["version=1.0", "maintainer=me", "description=a b=c"]);
  }

  #[test]
  fn label_multiline() {
    let ins = parse_one(indoc!(r#"
      LABEL foo=bar \
            "com.example.key"='quoted value' \
            empty=
    "#)).unwrap();

    assert_eq!(ins.args, vec!["foo=bar", "com.example.key=quoted value", "empty="]);
  }

  #[test]
  fn label_errors() {
    let err = parse_one("LABEL").unwrap_err();
    assert_eq!(err.code, ErrorCode::InstructionError);

    let err = parse_one("LABEL foo=bar baz").unwrap_err();
    assert_eq!(err.message, "LABEL requires a value for key: baz");
    assert_eq!(err.position.column, 15);
  }
}
