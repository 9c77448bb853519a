// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use lazy_static::lazy_static;
use regex::Regex;

use crate::diagnostic::DockerfileError;
use crate::dockerfile_parser::Instruction;
use crate::lexer::Word;
use crate::util::{parse_string_array, split_flag};

use super::join_words;

lazy_static! {
  static ref DURATION: Regex = Regex::new(r"^(\d+(\.\d+)?(ns|us|µs|ms|s|m|h))+$").unwrap();
}

const DURATION_FLAGS: &[&str] = &["interval", "timeout", "start-period", "start-interval"];

fn check_flag(name: &str, value: &str, word: &Word) -> Result<(), DockerfileError> {
  let valid = if value.contains('$') {
    true
  } else if name == "retries" {
    value.parse::<u32>().is_ok()
  } else if DURATION_FLAGS.contains(&name) {
    DURATION.is_match(value)
  } else {
    return Err(DockerfileError::instruction(
      word.range.start.clone(),
      format!("unknown HEALTHCHECK flag: --{}", name)
    ));
  };

  if valid {
    Ok(())
  } else {
    Err(DockerfileError::instruction(
      word.range.start.clone(),
      format!("invalid value for HEALTHCHECK --{}: {}", name, value)
    ))
  }
}

/// Parses a [`HEALTHCHECK` instruction][healthcheck].
///
/// `HEALTHCHECK NONE` yields `["NONE"]`. Otherwise options are read as
/// `--name=value` or `--name value` until `CMD`, and the result is
/// `["CMD", command]` with options in `flags`. An exec form command is
/// decoded, giving `["CMD", arg1, arg2, ...]`.
///
/// [healthcheck]: https://docs.docker.com/engine/reference/builder/#healthcheck
pub(crate) fn parse_healthcheck(words: &[Word], ins: &mut Instruction) -> Result<(), DockerfileError> {
  if let Some(first) = words.first() {
    if first.text.eq_ignore_ascii_case("none") {
      if let Some(extra) = words.get(1) {
        return Err(DockerfileError::instruction(
          extra.range.start.clone(),
          "HEALTHCHECK NONE takes no arguments"
        ));
      }

      ins.args = vec!["NONE".into()];
      return Ok(());
    }
  }

  let mut i = 0;
  while i < words.len() {
    let word = &words[i];

    if word.text.eq_ignore_ascii_case("cmd") {
      let command = join_words(&words[i + 1..]);
      if command.is_empty() {
        return Err(DockerfileError::instruction(
          word.range.start.clone(),
          "HEALTHCHECK CMD requires a command"
        ));
      }

      ins.args = vec!["CMD".into()];
      if command.starts_with('[') {
        ins.args.extend(parse_string_array(&command, &words[i + 1].range.start)?);
        ins.json_form = true;
      } else {
        ins.args.push(command);
        ins.json_form = false;
      }

      return Ok(());
    }

    let (name, value) = match split_flag(&word.text) {
      Some((name, Some(value))) => (name, value),
      Some((name, None)) => match words.get(i + 1) {
        Some(next) if !next.text.eq_ignore_ascii_case("cmd") => {
          i += 1;
          (name, next.text.as_str())
        },
        _ => {
          return Err(DockerfileError::instruction(
            word.range.start.clone(),
            format!("flag --{} requires a value", name)
          ));
        }
      },
      None => {
        return Err(DockerfileError::instruction(
          word.range.start.clone(),
          format!("unexpected HEALTHCHECK argument: {}", word.text)
        ));
      }
    };

    check_flag(name, value, word)?;
    ins.flags.insert(name.to_string(), value.to_string());
    i += 1;
  }

  Err(DockerfileError::instruction(
    ins.range.start.clone(),
    "HEALTHCHECK requires CMD or NONE"
  ))
}
