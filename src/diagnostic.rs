// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::position::Position;

/// The category of a Dockerfile diagnostic.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorCode {
  /// Malformed token-level grammar: bad quoting, variable names, continuations
  SyntaxError,

  /// Well-formed but violates a document-level policy
  ValidationError,

  /// An unresolved or invalid stage reference
  ReferenceError,

  /// A per-instruction rule violation
  InstructionError,
  StageError,
  VariableError,
  IoError,
  InternalError
}

impl ErrorCode {
  pub fn as_str(&self) -> &'static str {
    match self {
      ErrorCode::SyntaxError => "syntax error",
      ErrorCode::ValidationError => "validation error",
      ErrorCode::ReferenceError => "reference error",
      ErrorCode::InstructionError => "instruction error",
      ErrorCode::StageError => "stage error",
      ErrorCode::VariableError => "variable error",
      ErrorCode::IoError => "io error",
      ErrorCode::InternalError => "internal error"
    }
  }

  /// Remediation hints for this category of error.
  pub fn hints(&self) -> Vec<String> {
    match HINTS.get(self) {
      Some(hints) => hints.iter().map(|h| h.to_string()).collect(),
      None => vec![FALLBACK_HINT.to_string()]
    }
  }
}

impl fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

const FALLBACK_HINT: &str =
  "see the Dockerfile reference: https://docs.docker.com/engine/reference/builder/";

lazy_static! {
  static ref HINTS: HashMap<ErrorCode, &'static [&'static str]> = {
    let mut m: HashMap<ErrorCode, &'static [&'static str]> = HashMap::new();
    m.insert(ErrorCode::SyntaxError, &[
      "check that every quote and ${...} reference is closed",
      "a line continuation must be the last character on its line",
      "JSON form arguments must be a list of double-quoted strings",
    ]);
    m.insert(ErrorCode::InstructionError, &[
      "instruction names must be uppercase, e.g. FROM, RUN, COPY",
      "check the required arguments for this instruction",
    ]);
    m.insert(ErrorCode::ReferenceError, &[
      "stages may only reference stages defined before them",
      "check the spelling of the stage name given to --from or FROM",
    ]);
    m.insert(ErrorCode::StageError, &[
      "stage names must be unique and start with a letter",
    ]);
    m.insert(ErrorCode::VariableError, &[
      "variable names may only contain letters, digits and underscores",
    ]);
    m.insert(ErrorCode::ValidationError, &[
      "a Dockerfile must start with FROM, optionally preceded by ARG",
    ]);
    m
  };
}

/// A positioned, categorized Dockerfile diagnostic.
///
/// Diagnostics never abort a parse; they are collected on the resulting
/// document alongside whatever could be parsed.
#[derive(Debug, Clone)]
pub struct DockerfileError {
  pub code: ErrorCode,

  /// The name (or index) of the build stage the error occurred in, if any
  pub stage: Option<String>,
  pub position: Position,
  pub message: String,
  pub details: Option<String>,

  /// The offending source text
  pub snippet: Option<String>,
  pub hints: Vec<String>,
  pub cause: Option<Arc<dyn std::error::Error + Send + Sync>>
}

impl DockerfileError {
  /// Creates a new diagnostic, attaching the hints for its error code.
  pub fn new<S: Into<String>>(code: ErrorCode, position: Position, message: S) -> Self {
    DockerfileError {
      code,
      stage: None,
      position,
      message: message.into(),
      details: None,
      snippet: None,
      hints: code.hints(),
      cause: None
    }
  }

  pub fn syntax<S1, S2>(position: Position, message: S1, snippet: S2) -> Self
  where
    S1: Into<String>,
    S2: Into<String>
  {
    DockerfileError::new(ErrorCode::SyntaxError, position, message)
      .with_snippet(snippet)
  }

  pub fn instruction<S: Into<String>>(position: Position, message: S) -> Self {
    DockerfileError::new(ErrorCode::InstructionError, position, message)
  }

  pub fn with_stage<S: Into<String>>(mut self, stage: S) -> Self {
    self.stage = Some(stage.into());
    self
  }

  pub fn with_snippet<S: Into<String>>(mut self, snippet: S) -> Self {
    self.snippet = Some(snippet.into());
    self
  }

  pub fn with_details<S: Into<String>>(mut self, details: S) -> Self {
    self.details = Some(details.into());
    self
  }

  pub fn with_cause(mut self, cause: Arc<dyn std::error::Error + Send + Sync>) -> Self {
    self.cause = Some(cause);
    self
  }
}

impl fmt::Display for DockerfileError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(stage) = &self.stage {
      write!(f, "stage '{}': ", stage)?;
    }

    write!(
      f, "line {}:{} - {}",
      self.position.line, self.position.column, self.message
    )?;

    if let Some(snippet) = &self.snippet {
      write!(f, "\n\n{}", snippet)?;
      if self.position.column > 0 && !snippet.contains('\n') {
        write!(f, "\n{}^", " ".repeat(self.position.column - 1))?;
      }
    }

    if let Some(details) = &self.details {
      write!(f, "\n\ndetails: {}", details)?;
    }

    if !self.hints.is_empty() {
      write!(f, "\n\nsuggestions:")?;
      for hint in &self.hints {
        write!(f, "\n- {}", hint)?;
      }
    }

    Ok(())
  }
}

impl std::error::Error for DockerfileError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    self.cause.as_ref().map(|c| c.as_ref() as &(dyn std::error::Error + 'static))
  }
}

/// Warning severity.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
pub enum WarnLevel {
  Low,
  Medium,
  High
}

/// A non-fatal issue found while parsing.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Warning {
  pub level: WarnLevel,
  pub message: String,
  pub position: Position,

  /// The source text or instruction the warning refers to
  pub context: String
}

impl Warning {
  pub fn new<S1, S2>(level: WarnLevel, position: Position, message: S1, context: S2) -> Self
  where
    S1: Into<String>,
    S2: Into<String>
  {
    Warning {
      level,
      message: message.into(),
      position,
      context: context.into()
    }
  }
}

impl fmt::Display for Warning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f, "{:?} warning at line {}:{}: {}",
      self.level, self.position.line, self.position.column, self.message
    )
  }
}

/// Accumulates diagnostics in source order, tagging them with the build
/// stage they occurred in.
#[derive(Debug, Default)]
pub struct ErrorCollector {
  errors: Vec<DockerfileError>,
  warnings: Vec<Warning>,
  stage: Option<String>
}

impl ErrorCollector {
  pub fn new() -> Self {
    ErrorCollector::default()
  }

  /// Sets the stage name attached to subsequently added errors.
  pub fn enter_stage(&mut self, stage: Option<String>) {
    self.stage = stage;
  }

  pub fn add(&mut self, mut error: DockerfileError) {
    if error.stage.is_none() {
      error.stage = self.stage.clone();
    }

    self.errors.push(error);
  }

  pub fn warn(&mut self, warning: Warning) {
    self.warnings.push(warning);
  }

  pub fn extend<I: IntoIterator<Item = DockerfileError>>(&mut self, errors: I) {
    for error in errors {
      self.add(error);
    }
  }

  pub fn has_errors(&self) -> bool {
    !self.errors.is_empty()
  }

  pub fn errors(&self) -> &[DockerfileError] {
    &self.errors
  }

  pub fn into_parts(self) -> (Vec<DockerfileError>, Vec<Warning>) {
    (self.errors, self.warnings)
  }
}
