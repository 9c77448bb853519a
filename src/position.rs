// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::fmt;

/// A point in Dockerfile source text.
///
/// Lines and columns are 1-based, `offset` is a 0-based byte index into the
/// original input.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Position {
  pub line: usize,
  pub column: usize,
  pub offset: usize,

  /// The file this position refers to, if the input was read from disk
  pub file_path: Option<String>
}

impl Position {
  pub fn new(line: usize, column: usize, offset: usize) -> Position {
    Position { line, column, offset, file_path: None }
  }

  /// Returns a copy of this position attributed to the given file.
  pub fn with_file<S: Into<String>>(mut self, path: S) -> Position {
    self.file_path = Some(path.into());
    self
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(path) = &self.file_path {
      write!(f, "{}:", path)?;
    }

    write!(f, "{}:{}", self.line, self.column)
  }
}

/// A span of source text between two positions.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Range {
  pub start: Position,
  pub end: Position
}

impl Range {
  pub fn new(start: Position, end: Position) -> Range {
    Range { start, end }
  }

  /// Returns the byte length of this range.
  pub fn len(&self) -> usize {
    self.end.offset.saturating_sub(self.start.offset)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Determines if the given byte offset falls inside this range.
  pub fn contains_offset(&self, offset: usize) -> bool {
    offset >= self.start.offset && offset < self.end.offset
  }
}
