// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::sync::Arc;

use pest::iterators::Pair;
use snafu::Snafu;

use crate::diagnostic::{DockerfileError, ErrorCode};
use crate::parser::Rule;
use crate::position::Position;

/// A fatal error returned by the Dockerfile entry points.
///
/// Problems inside the Dockerfile itself are never fatal; they are collected
/// as [`DockerfileError`] diagnostics on the parsed document instead.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
  #[snafu(display(
    "could not read Dockerfile: {}", source
  ))]
  ReadError {
    source: std::io::Error
  },

  #[snafu(display(
    "refusing to follow symlink {}", path
  ))]
  SymlinkError {
    path: String
  },

  #[snafu(display(
    "Dockerfile contains {} error(s), first: {}", errors.len(),
    errors.first().map(|e| e.message.as_str()).unwrap_or("unknown error")
  ))]
  InvalidDockerfile {
    errors: Vec<DockerfileError>
  }
}

impl Error {
  /// Converts this error into a positioned diagnostic.
  pub fn diagnostic(self) -> DockerfileError {
    let code = match &self {
      Error::InvalidDockerfile { errors } => {
        if let Some(first) = errors.first() {
          return first.clone();
        }

        ErrorCode::InternalError
      },
      Error::ReadError { .. } | Error::SymlinkError { .. } => ErrorCode::IoError
    };

    let message = self.to_string();
    DockerfileError::new(code, Position::default(), message)
      .with_cause(Arc::new(self))
  }
}

/// A Dockerfile entry point Result.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A token-level grammar error raised by the scanner.
///
/// The scanner does not recover from these; the lexer abandons the current
/// logical line and resumes at the next newline.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ScanError {
  #[snafu(display(
    "invalid character {:?} in variable name", ch
  ))]
  InvalidVariable {
    ch: char,
    position: Position,
    snippet: String
  },

  #[snafu(display(
    "unterminated variable reference {}", snippet
  ))]
  UnterminatedVariable {
    position: Position,
    snippet: String
  },

  #[snafu(display(
    "unterminated quoted string, missing closing {}", quote
  ))]
  UnterminatedQuote {
    quote: char,
    position: Position,
    snippet: String
  },

  #[snafu(display(
    "line continuation character must be followed by newline"
  ))]
  DanglingContinuation {
    position: Position
  },

  #[snafu(display(
    "unterminated heredoc, missing terminator {}", identifier
  ))]
  UnterminatedHeredoc {
    identifier: String,
    position: Position
  }
}

impl ScanError {
  pub fn position(&self) -> &Position {
    match self {
      ScanError::InvalidVariable { position, .. } => position,
      ScanError::UnterminatedVariable { position, .. } => position,
      ScanError::UnterminatedQuote { position, .. } => position,
      ScanError::DanglingContinuation { position } => position,
      ScanError::UnterminatedHeredoc { position, .. } => position
    }
  }

  fn snippet(&self) -> Option<String> {
    match self {
      ScanError::InvalidVariable { snippet, .. } => Some(snippet.clone()),
      ScanError::UnterminatedVariable { snippet, .. } => Some(snippet.clone()),
      ScanError::UnterminatedQuote { snippet, .. } => Some(snippet.clone()),
      ScanError::DanglingContinuation { .. } => None,
      ScanError::UnterminatedHeredoc { identifier, .. } => Some(format!("<<{}", identifier))
    }
  }
}

impl From<ScanError> for DockerfileError {
  fn from(err: ScanError) -> Self {
    let mut diagnostic = DockerfileError::new(
      ErrorCode::SyntaxError,
      err.position().clone(),
      err.to_string()
    );

    diagnostic.snippet = err.snippet();
    diagnostic
  }
}

/// Helper to create an unexpected token error.
pub(crate) fn unexpected_token(record: Pair<Rule>, position: Position) -> DockerfileError {
  DockerfileError::new(
    ErrorCode::InternalError,
    position,
    format!("unexpected token {:?}", record.as_rule())
  )
}
