// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

//! Stage boundary and variable declaration detection over lexed lines.

use log::trace;

use crate::lexer::InstructionTokens;
use crate::position::Position;
use crate::stage::VariableKind;
use crate::token::{InstructionKind, TokenType};
use crate::util::{parse_kv_pairs, split_flag};

/// The line span of one build stage.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct StageInfo {
  pub index: usize,
  pub name: Option<String>,
  pub base_image: String,
  pub start_line: usize,
  pub end_line: usize
}

impl StageInfo {
  pub fn contains_line(&self, line: usize) -> bool {
    line >= self.start_line && line <= self.end_line
  }
}

/// A single `ARG` or `ENV` declaration.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct VariableInfo {
  pub name: String,
  pub kind: VariableKind,

  /// The declared value (or `ARG` default), unquoted
  pub value: Option<String>,
  pub position: Position,

  /// The owning stage, `None` for declarations before the first `FROM`
  pub stage: Option<usize>
}

/// Finds the build stages of a lexed Dockerfile. Each `FROM` closes the
/// previous stage on the line before it; the last stage runs to the last
/// instruction.
pub fn detect_stages(lines: &[InstructionTokens]) -> Vec<StageInfo> {
  let mut stages: Vec<StageInfo> = Vec::new();

  for line in lines.iter().filter(|l| l.kind() == InstructionKind::From) {
    if let Some(previous) = stages.last_mut() {
      previous.end_line = line.line().saturating_sub(1);
    }

    let words = line.words();
    let base_image = words.iter()
      .find(|w| split_flag(&w.text).is_none())
      .map(|w| w.text.clone())
      .unwrap_or_default();

    let name = words.iter()
      .position(|w| w.is(TokenType::As))
      .and_then(|i| words.get(i + 1))
      .map(|w| w.text.clone());

    stages.push(StageInfo {
      index: stages.len(),
      name,
      base_image,
      start_line: line.line(),
      end_line: line.line()
    });
  }

  if let (Some(stage), Some(last)) = (stages.last_mut(), lines.last()) {
    stage.end_line = stage.end_line.max(last.line());
  }

  trace!("detected {} stages", stages.len());

  stages
}

/// Finds the stage containing a line, if any.
pub fn stage_for_line(stages: &[StageInfo], line: usize) -> Option<usize> {
  stages.iter().find(|s| s.contains_line(line)).map(|s| s.index)
}

/// Extracts every `ARG` and `ENV` declaration in source order, tagged with
/// its owning stage.
///
/// Malformed declarations are skipped here; the instruction parser reports
/// them.
pub fn detect_variables(lines: &[InstructionTokens], stages: &[StageInfo]) -> Vec<VariableInfo> {
  let mut variables = Vec::new();

  for line in lines {
    let kind = match line.kind() {
      InstructionKind::Arg => VariableKind::Arg,
      InstructionKind::Env => VariableKind::Env,
      _ => continue
    };

    let stage = stage_for_line(stages, line.line());
    let words = line.words();

    // legacy `ENV key value with spaces`
    if kind == VariableKind::Env && words.len() > 1 && !words[0].text.contains('=') {
      let value = words[1..].iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

      variables.push(VariableInfo {
        name: words[0].text.clone(),
        kind,
        value: Some(value),
        position: words[0].range.start.clone(),
        stage
      });

      continue;
    }

    for word in &words {
      let pairs = match parse_kv_pairs(&word.text, &word.range.start) {
        Ok(pairs) => pairs,
        Err(_) => continue
      };

      for pair in pairs {
        if kind == VariableKind::Env && pair.value.is_none() {
          continue;
        }

        variables.push(VariableInfo {
          name: pair.key,
          kind,
          value: pair.value,
          position: word.range.start.clone(),
          stage
        });
      }
    }
  }

  trace!("detected {} variable declarations", variables.len());

  variables
}

#[cfg(test)]
mod tests {
  use super::*;
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  use crate::lexer::Lexer;
  use crate::scanner::Scanner;

  fn lines(input: &str) -> Vec<InstructionTokens> {
    let (lines, errors) = Lexer::new(Scanner::new(input)).process_all_instructions();
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    lines
  }

  #[test]
  fn stages() {
    let lines = lines(indoc!(r#"
      ARG VERSION=3.12
      FROM --platform=linux/amd64 alpine:${VERSION} AS build
      RUN make

      FROM scratch
      COPY --from=build /out /out
      CMD ["/out"]
    "#));

    assert_eq!(detect_stages(&lines), vec![
      StageInfo {
        index: 0,
        name: Some("build".into()),
        base_image: "alpine:${VERSION}".into(),
        start_line: 2,
        end_line: 4
      },
      StageInfo {
        index: 1,
        name: None,
        base_image: "scratch".into(),
        start_line: 5,
        end_line: 7
      }
    ]);
  }

  #[test]
  fn no_stages() {
    let lines = lines("ARG a\nRUN b\n");
    assert!(detect_stages(&lines).is_empty());
    assert!(detect_stages(&[]).is_empty());
  }

  #[test]
  fn variables() {
    let lines = lines(indoc!(r#"
      ARG BASE=alpine
      FROM $BASE
      ARG BASE
      ENV PATH=/usr/bin LANG="C.UTF-8"
      ENV LEGACY some value
      FROM scratch
      ARG late=1 other
    "#));

    let stages = detect_stages(&lines);
    let vars: Vec<_> = detect_variables(&lines, &stages)
      .into_iter()
      .map(|v| (v.name, v.kind, v.value, v.stage))
      .collect();

    assert_eq!(vars, vec![
      ("BASE".to_string(), VariableKind::Arg, Some("alpine".to_string()), None),
      ("BASE".to_string(), VariableKind::Arg, None, Some(0)),
      ("PATH".to_string(), VariableKind::Env, Some("/usr/bin".to_string()), Some(0)),
      ("LANG".to_string(), VariableKind::Env, Some("C.UTF-8".to_string()), Some(0)),
      ("LEGACY".to_string(), VariableKind::Env, Some("some value".to_string()), Some(0)),
      ("late".to_string(), VariableKind::Arg, Some("1".to_string()), Some(1)),
      ("other".to_string(), VariableKind::Arg, None, Some(1)),
    ]);
  }

  #[test]
  fn variable_positions() {
    let lines = lines("FROM a\nENV A=1 B=2\n");
    let stages = detect_stages(&lines);
    let vars = detect_variables(&lines, &stages);

    assert_eq!(vars[0].position, Position::new(2, 5, 11));
    assert_eq!(vars[1].position, Position::new(2, 9, 15));
  }
}
