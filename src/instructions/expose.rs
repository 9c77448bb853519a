// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::diagnostic::{DockerfileError, ErrorCollector, WarnLevel, Warning};
use crate::dockerfile_parser::Instruction;
use crate::lexer::Word;

const MAX_PORT: u32 = 65535;

fn parse_port(word: &Word, port: &str) -> Result<u32, DockerfileError> {
  port.parse::<u32>().map_err(|_| DockerfileError::instruction(
    word.range.start.clone(),
    format!("invalid port number: {}", port)
  ))
}

/// Parses an [`EXPOSE` instruction][expose]. Each argument is a port or a
/// `start-end` range, optionally followed by `/tcp` or `/udp`.
///
/// Ports outside 1-65535 are accepted with a warning.
///
/// [expose]: https://docs.docker.com/engine/reference/builder/#expose
pub(crate) fn parse_expose(
  words: &[Word],
  ins: &mut Instruction,
  collector: &mut ErrorCollector
) -> Result<(), DockerfileError> {
  if words.is_empty() {
    return Err(DockerfileError::instruction(
      ins.range.start.clone(),
      "EXPOSE requires at least one port"
    ));
  }

  for word in words {
    ins.args.push(word.text.clone());

    // resolved at build time
    if word.has_variable() {
      continue;
    }

    let (ports, protocol) = match word.text.find('/') {
      Some(i) => (&word.text[..i], Some(&word.text[i + 1..])),
      None => (word.text.as_str(), None)
    };

    if let Some(protocol) = protocol {
      if !protocol.eq_ignore_ascii_case("tcp") && !protocol.eq_ignore_ascii_case("udp") {
        return Err(DockerfileError::instruction(
          word.range.start.clone(),
          format!("invalid protocol: {}, must be tcp or udp", protocol)
        ));
      }
    }

    let (start, end) = match ports.find('-') {
      Some(i) => (parse_port(word, &ports[..i])?, parse_port(word, &ports[i + 1..])?),
      None => {
        let port = parse_port(word, ports)?;
        (port, port)
      }
    };

    if start == 0 || end > MAX_PORT || start > end {
      collector.warn(Warning::new(
        WarnLevel::High,
        word.range.start.clone(),
        format!("port {} is outside the valid range 1-{}", ports, MAX_PORT),
        ins.raw.lines().next().unwrap_or("")
      ));
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::diagnostic::{ErrorCode, WarnLevel};
  use crate::instructions::test_support::*;

  #[test]
  fn expose_ports() {
    let (ins, warnings) = parse_one_with_warnings("EXPOSE 8080/tcp 9090/udp 70000");
    let ins = ins.unwrap();

    assert_eq!(ins.args, vec!["8080/tcp", "9090/udp", "70000"]);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level, WarnLevel::High);
    assert_eq!(warnings[0].position.column, 26);
  }

  #[test]
  fn expose_ranges_and_variables() {
    let (ins, warnings) = parse_one_with_warnings("EXPOSE 7000-7010/udp ${PORT} $OTHER/tcp");
    assert_eq!(ins.unwrap().args, vec!["7000-7010/udp", "${PORT}", "$OTHER/tcp"]);
    assert!(warnings.is_empty());
  }

  #[test]
  fn expose_errors() {
    let err = parse_one("EXPOSE").unwrap_err();
    assert_eq!(err.code, ErrorCode::InstructionError);

    let err = parse_one("EXPOSE 80/sctp").unwrap_err();
    assert_eq!(err.message, "invalid protocol: sctp, must be tcp or udp");

    let err = parse_one("EXPOSE http").unwrap_err();
    assert_eq!(err.message, "invalid port number: http");

    let err = parse_one("EXPOSE 80 eighty/tcp").unwrap_err();
    assert_eq!(err.position.column, 11);
  }
}
