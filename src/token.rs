// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

use crate::position::Position;

/// The known Dockerfile instructions.
///
/// `Unknown` covers any word in instruction position that isn't one of the
/// documented [Dockerfile instructions][ref]; the parser rejects it.
///
/// [ref]: https://docs.docker.com/engine/reference/builder/
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum InstructionKind {
  From,
  Run,
  Cmd,
  Label,
  Expose,
  Env,
  Add,
  Copy,
  Entrypoint,
  Volume,
  User,
  Workdir,
  Arg,
  Onbuild,
  Stopsignal,
  Healthcheck,
  Shell,
  Unknown
}

lazy_static! {
  static ref KEYWORDS: HashMap<&'static str, InstructionKind> = {
    let mut m = HashMap::with_capacity(17);
    m.insert("FROM", InstructionKind::From);
    m.insert("RUN", InstructionKind::Run);
    m.insert("CMD", InstructionKind::Cmd);
    m.insert("LABEL", InstructionKind::Label);
    m.insert("EXPOSE", InstructionKind::Expose);
    m.insert("ENV", InstructionKind::Env);
    m.insert("ADD", InstructionKind::Add);
    m.insert("COPY", InstructionKind::Copy);
    m.insert("ENTRYPOINT", InstructionKind::Entrypoint);
    m.insert("VOLUME", InstructionKind::Volume);
    m.insert("USER", InstructionKind::User);
    m.insert("WORKDIR", InstructionKind::Workdir);
    m.insert("ARG", InstructionKind::Arg);
    m.insert("ONBUILD", InstructionKind::Onbuild);
    m.insert("STOPSIGNAL", InstructionKind::Stopsignal);
    m.insert("HEALTHCHECK", InstructionKind::Healthcheck);
    m.insert("SHELL", InstructionKind::Shell);
    m
  };

  static ref IMPACTS: HashMap<InstructionKind, InstructionImpact> = {
    use InstructionKind as K;

    let mut m = HashMap::with_capacity(17);
    m.insert(K::From, InstructionImpact::new(true, true, 10));
    m.insert(K::Run, InstructionImpact::new(true, true, 8));
    m.insert(K::Copy, InstructionImpact::new(true, true, 7));
    m.insert(K::Add, InstructionImpact::new(true, true, 7));
    m.insert(K::Workdir, InstructionImpact::new(true, false, 1));
    m.insert(K::Env, InstructionImpact::new(false, true, 0));
    m.insert(K::Arg, InstructionImpact::new(false, true, 0));
    m.insert(K::Label, InstructionImpact::new(false, false, 0));
    m.insert(K::User, InstructionImpact::new(false, false, 0));
    m.insert(K::Volume, InstructionImpact::new(false, false, 0));
    m.insert(K::Expose, InstructionImpact::new(false, false, 0));
    m.insert(K::Cmd, InstructionImpact::new(false, false, 0));
    m.insert(K::Entrypoint, InstructionImpact::new(false, false, 0));
    m.insert(K::Shell, InstructionImpact::new(false, false, 0));
    m.insert(K::Stopsignal, InstructionImpact::new(false, false, 0));
    m.insert(K::Healthcheck, InstructionImpact::new(false, false, 0));
    m.insert(K::Onbuild, InstructionImpact::new(false, false, 0));
    m
  };
}

impl InstructionKind {
  /// Looks up an instruction keyword. Keywords are matched case-sensitively
  /// in their uppercase form.
  pub fn from_keyword(word: &str) -> Option<InstructionKind> {
    KEYWORDS.get(word).copied()
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      InstructionKind::From => "FROM",
      InstructionKind::Run => "RUN",
      InstructionKind::Cmd => "CMD",
      InstructionKind::Label => "LABEL",
      InstructionKind::Expose => "EXPOSE",
      InstructionKind::Env => "ENV",
      InstructionKind::Add => "ADD",
      InstructionKind::Copy => "COPY",
      InstructionKind::Entrypoint => "ENTRYPOINT",
      InstructionKind::Volume => "VOLUME",
      InstructionKind::User => "USER",
      InstructionKind::Workdir => "WORKDIR",
      InstructionKind::Arg => "ARG",
      InstructionKind::Onbuild => "ONBUILD",
      InstructionKind::Stopsignal => "STOPSIGNAL",
      InstructionKind::Healthcheck => "HEALTHCHECK",
      InstructionKind::Shell => "SHELL",
      InstructionKind::Unknown => "UNKNOWN"
    }
  }

  /// The expected build impact of this instruction.
  pub fn impact(&self) -> InstructionImpact {
    IMPACTS.get(self).copied().unwrap_or_default()
  }

  /// Whether this instruction is optional metadata that may be safely
  /// omitted from a build.
  pub fn is_optional(&self) -> bool {
    matches!(
      self,
      InstructionKind::Label | InstructionKind::Healthcheck | InstructionKind::Shell
    )
  }
}

impl fmt::Display for InstructionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The estimated effect of an instruction on the resulting image and the
/// build cache.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct InstructionImpact {
  /// Whether the instruction typically creates a new layer
  pub layer_creating: bool,

  /// Whether the instruction typically invalidates the build cache
  pub cache_breaking: bool,

  /// Estimated effect on image size, 0 (none) to 10
  pub size_impact: u8
}

impl InstructionImpact {
  const fn new(layer_creating: bool, cache_breaking: bool, size_impact: u8) -> Self {
    InstructionImpact { layer_creating, cache_breaking, size_impact }
  }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenType {
  Illegal,
  Eof,
  Newline,
  Whitespace,

  Instruction(InstructionKind),

  Comment,
  Continuation,
  EscapedChar,
  HeredocStart,
  HeredocContent,
  HeredocEnd,

  String,
  QuotedString,
  Number,
  Equals,
  Colon,
  Comma,
  LeftBracket,
  RightBracket,
  Variable,
  JsonArray,

  /// The `AS` keyword of a `FROM` instruction
  As
}

impl TokenType {
  pub fn category(&self) -> TokenCategory {
    match self {
      TokenType::Instruction(_) => TokenCategory::Instruction,
      TokenType::Variable => TokenCategory::Variable,
      TokenType::Comment => TokenCategory::Metadata,
      _ => TokenCategory::Syntax
    }
  }
}

impl fmt::Display for TokenType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TokenType::Instruction(kind) => write!(f, "INSTRUCTION_{}", kind),
      other => write!(f, "{}", format!("{:?}", other).to_ascii_uppercase())
    }
  }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenCategory {
  Instruction,
  Variable,
  Metadata,
  Syntax
}

/// Analysis hints derived from a single token.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TokenMetadata {
  pub is_keyword: bool,
  pub is_optional: bool,
  pub category: TokenCategory,
  pub impact: InstructionImpact
}

/// A single lexical unit of a Dockerfile.
///
/// `value` is the text this token contributes to an instruction's argument
/// string; quoted strings keep their quotes and variables keep their `$`
/// sigil. `raw` is the exact slice of the source the token was read from.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
  pub token_type: TokenType,
  pub value: String,
  pub raw: String,
  pub line: usize,
  pub column: usize,
  pub offset: usize,
  pub length: usize
}

impl Token {
  pub(crate) fn new<S: Into<String>>(
    token_type: TokenType,
    value: S,
    raw: &str,
    start: &Position
  ) -> Token {
    Token {
      token_type,
      value: value.into(),
      raw: raw.to_string(),
      line: start.line,
      column: start.column,
      offset: start.offset,
      length: raw.len()
    }
  }

  pub fn position(&self) -> Position {
    Position::new(self.line, self.column, self.offset)
  }

  /// Byte offset immediately after this token.
  pub fn end_offset(&self) -> usize {
    self.offset + self.length
  }

  /// Position immediately after this token.
  pub fn end_position(&self) -> Position {
    let newlines = self.raw.matches('\n').count();
    let column = match self.raw.rfind('\n') {
      Some(i) => self.raw[i + 1..].chars().count() + 1,
      None => self.column + self.raw.chars().count()
    };

    Position::new(self.line + newlines, column, self.end_offset())
  }

  pub fn is_instruction(&self) -> bool {
    matches!(self.token_type, TokenType::Instruction(_))
  }

  pub fn is_argument(&self) -> bool {
    matches!(
      self.token_type,
      TokenType::String | TokenType::QuotedString | TokenType::Number | TokenType::Variable
    )
  }

  /// Returns true for tokens that never carry instruction content.
  pub fn is_trivia(&self) -> bool {
    matches!(
      self.token_type,
      TokenType::Whitespace | TokenType::Newline | TokenType::Continuation | TokenType::Comment
    )
  }

  pub fn metadata(&self) -> TokenMetadata {
    let (is_optional, mut impact) = match self.token_type {
      TokenType::Instruction(kind) => (kind.is_optional(), kind.impact()),
      _ => (false, InstructionImpact::default())
    };

    // variable references make a layer's cache key depend on build input
    if self.token_type == TokenType::Variable {
      impact.cache_breaking = true;
    }

    TokenMetadata {
      is_keyword: self.is_instruction(),
      is_optional,
      category: self.token_type.category(),
      impact
    }
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.value.is_empty() {
      write!(f, "{} at line {}:{}", self.token_type, self.line, self.column)
    } else {
      write!(
        f, "{}({}) at line {}:{}",
        self.token_type, self.value, self.line, self.column
      )
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keywords_are_case_sensitive() {
    assert_eq!(InstructionKind::from_keyword("FROM"), Some(InstructionKind::From));
    assert_eq!(InstructionKind::from_keyword("from"), None);
    assert_eq!(InstructionKind::from_keyword("MAINTAINER"), None);
    assert_eq!(InstructionKind::from_keyword("HEALTHCHECK"), Some(InstructionKind::Healthcheck));
  }

  #[test]
  fn impact_table() {
    assert_eq!(InstructionKind::Run.impact().size_impact, 8);
    assert!(InstructionKind::From.impact().layer_creating);
    assert!(!InstructionKind::Label.impact().layer_creating);
    assert_eq!(InstructionKind::Unknown.impact(), InstructionImpact::default());
  }

  #[test]
  fn variable_metadata() {
    let token = Token::new(TokenType::Variable, "$FOO", "$FOO", &Position::new(1, 5, 4));
    let meta = token.metadata();
    assert_eq!(meta.category, TokenCategory::Variable);
    assert!(meta.impact.cache_breaking);
    assert!(!meta.is_keyword);
  }

  #[test]
  fn end_position_spans_lines() {
    let token = Token::new(
      TokenType::HeredocContent, "a\nbc\n", "a\nbc\n", &Position::new(2, 1, 10)
    );
    assert_eq!(token.end_position(), Position::new(4, 1, 15));

    let token = Token::new(TokenType::String, "abc", "abc", &Position::new(1, 5, 4));
    assert_eq!(token.end_position(), Position::new(1, 8, 7));
  }
}
