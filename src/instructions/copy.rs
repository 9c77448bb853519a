// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::diagnostic::DockerfileError;
use crate::dockerfile_parser::Instruction;
use crate::lexer::Word;
use crate::token::InstructionKind;
use crate::util::strip_quotes;

use super::{decode_json, leading_flags, starts_json};

/// Flags that take a value, shared by `ADD` and `COPY`.
const VALUE_FLAGS: &[&str] = &["chown", "chmod", "checksum", "exclude", "parents", "keep-git-dir"];

/// Parses an [`ADD`][add] or [`COPY`][copy] instruction.
///
/// The last argument is the destination, every other one a source. `COPY
/// --from` is recorded as a dependency on another stage or image; `ADD` may
/// not use it.
///
/// [add]: https://docs.docker.com/engine/reference/builder/#add
/// [copy]: https://docs.docker.com/engine/reference/builder/#copy
pub(crate) fn parse_copy(words: &[Word], ins: &mut Instruction) -> Result<(), DockerfileError> {
  let (flags, rest) = leading_flags(words);

  for flag in &flags {
    if flag.name == "from" && ins.kind == InstructionKind::Add {
      return Err(DockerfileError::instruction(
        flag.position.clone(),
        "ADD does not support the --from flag"
      ));
    }
  }

  for flag in flags {
    match flag.name.as_str() {
      "from" => {
        let value = flag.required_value()?;
        ins.dependencies.push(value.to_string());
        ins.flags.insert("from".into(), value.to_string());
      },
      "link" => {
        let value = flag.value.as_deref().unwrap_or("true");
        ins.flags.insert("link".into(), value.to_string());
      },
      name if VALUE_FLAGS.contains(&name) => {
        let value = flag.required_value()?;
        ins.flags.insert(flag.name.clone(), value.to_string());
      },
      other => {
        return Err(DockerfileError::instruction(
          flag.position.clone(),
          format!("unknown {} flag: --{}", ins.command, other)
        ));
      }
    }
  }

  ins.args = if starts_json(rest) {
    ins.json_form = true;
    decode_json(rest)?
  } else {
    rest.iter().map(|w| strip_quotes(&w.text)).collect()
  };

  if ins.args.len() < 2 {
    return Err(DockerfileError::instruction(
      ins.range.start.clone(),
      format!("{} requires at least one source and a destination", ins.command)
    ));
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::diagnostic::ErrorCode;
  use crate::instructions::test_support::*;

  #[test]
  fn copy_from_stage() {
    let ins = parse_one("COPY --from=builder --chown=app:app /src/out /app/").unwrap();

    assert_eq!(ins.args, vec!["/src/out", "/app/"]);
    assert_eq!(ins.flag("from"), Some("builder"));
    assert_eq!(ins.flag("chown"), Some("app:app"));
    assert_eq!(ins.dependencies, vec!["builder"]);
  }

  #[test]
  fn add_rejects_from() {
    let err = parse_one("ADD --from=builder /a /b").unwrap_err();
    assert_eq!(err.code, ErrorCode::InstructionError);
    assert_eq!(err.message, "ADD does not support the --from flag");
  }

  #[test]
  fn copy_json_after_flags() {
    let ins = parse_one(r#"COPY --from=build --chown=1:1 ["x y", "/dst"]"#).unwrap();
    assert_eq!(ins.args, vec!["x y", "/dst"]);
    assert!(ins.json_form);
    assert_eq!(ins.flag("from"), Some("build"));
    assert_eq!(ins.flag("chown"), Some("1:1"));
  }

  #[test]
  fn copy_forms() {
    let ins = parse_one(r#"COPY ["my file.txt", "/dst/"]"#).unwrap();
    assert_eq!(ins.args, vec!["my file.txt", "/dst/"]);
    assert!(ins.json_form);

    let ins = parse_one("ADD --link --checksum=sha256:abc https://example.com/a.tar /a").unwrap();
    assert_eq!(ins.flag("link"), Some("true"));
    assert_eq!(ins.flag("checksum"), Some("sha256:abc"));
    assert_eq!(ins.args, vec!["https://example.com/a.tar", "/a"]);
  }

  #[test]
  fn copy_heredoc() {
    let ins = parse_one("COPY <<EOF /etc/motd\nhello\nEOF\n").unwrap();
    assert_eq!(ins.args, vec!["<<EOF", "/etc/motd"]);
    assert_eq!(ins.heredoc().map(|h| h.content.as_str()), Some("hello\n"));
  }

  #[test]
  fn copy_errors() {
    let err = parse_one("COPY onlyone").unwrap_err();
    assert_eq!(err.message, "COPY requires at least one source and a destination");

    let err = parse_one("COPY --bogus a b").unwrap_err();
    assert_eq!(err.message, "unknown COPY flag: --bogus");

    let err = parse_one("COPY --chown a b").unwrap_err();
    assert_eq!(err.message, "flag --chown requires a value");
  }
}
