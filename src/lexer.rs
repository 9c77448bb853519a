// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::collections::BTreeSet;
use std::mem;

use log::{debug, trace};

use crate::diagnostic::{DockerfileError, WarnLevel, Warning};
use crate::error::ScanError;
use crate::position::Range;
use crate::scanner::Scanner;
use crate::token::{InstructionKind, Token, TokenType};

/// A run of source-adjacent argument tokens, e.g. `--from`, `=`, `builder`
/// form the single word `--from=builder`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Word {
  pub text: String,
  pub range: Range,

  /// Types of the tokens this word was assembled from, in order
  pub kinds: Vec<TokenType>
}

impl Word {
  /// Whether this word is exactly one token of the given type.
  pub fn is(&self, token_type: TokenType) -> bool {
    self.kinds.len() == 1 && self.kinds[0] == token_type
  }

  pub fn has_variable(&self) -> bool {
    self.kinds.contains(&TokenType::Variable)
  }
}

/// The tokens of one logical line, grouped by role.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct InstructionTokens {
  pub instruction: Token,

  /// Content tokens following the instruction keyword
  pub arguments: Vec<Token>,

  /// Comment lines directly preceding the instruction plus any comment lines
  /// inside its continuation
  pub comments: Vec<Token>,

  /// Every non-whitespace token of the logical line, in order
  pub raw: Vec<Token>,
  pub json_form: bool,

  /// A `FROM` line cut short by a scan error. It carries only the tokens
  /// read before the error and still opens a stage.
  pub failed: bool
}

impl InstructionTokens {
  /// The instruction keyword as written.
  pub fn command(&self) -> &str {
    &self.instruction.value
  }

  pub fn kind(&self) -> InstructionKind {
    match self.instruction.token_type {
      TokenType::Instruction(kind) => kind,
      _ => InstructionKind::Unknown
    }
  }

  pub fn line(&self) -> usize {
    self.instruction.line
  }

  /// Determines if the first argument after any leading `--flag` words
  /// opens a JSON array.
  pub fn is_json_form(&self) -> bool {
    self.words()
      .iter()
      .find(|w| !w.text.starts_with("--"))
      .map(|w| w.text.starts_with('['))
      .unwrap_or(false)
  }

  /// Groups argument tokens into whitespace-separated words. Continuations
  /// directly between two tokens do not split a word.
  pub fn words(&self) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::new();
    let mut last_end = None;

    for token in self.raw.iter().filter(|t| t.offset > self.instruction.offset) {
      match token.token_type {
        TokenType::Continuation => {
          last_end = match last_end {
            Some(end) if end == token.offset => Some(token.end_offset()),
            _ => None
          };
          continue;
        },
        TokenType::Newline
        | TokenType::Comment
        | TokenType::HeredocContent
        | TokenType::HeredocEnd
        | TokenType::Eof => {
          last_end = None;
          continue;
        },
        _ => ()
      }

      match words.last_mut() {
        Some(word) if last_end == Some(token.offset) => {
          word.text.push_str(&token.value);
          word.range.end = token.end_position();
          word.kinds.push(token.token_type);
        },
        _ => words.push(Word {
          text: token.value.clone(),
          range: Range::new(token.position(), token.end_position()),
          kinds: vec![token.token_type]
        })
      }

      last_end = Some(token.end_offset());
    }

    words
  }

  /// The argument text with continuations removed and words separated by a
  /// single space.
  pub fn arguments_string(&self) -> String {
    self.words()
      .into_iter()
      .map(|w| w.text)
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Keeps the tokens of a `FROM` line that hit a scan error so the stage it
/// opens is not lost.
fn failed_from_line(tokens: Vec<Token>) -> Option<InstructionTokens> {
  let first = tokens.iter().position(|t| !matches!(
    t.token_type,
    TokenType::Newline | TokenType::Continuation | TokenType::Comment
  ))?;

  if tokens[first].token_type != TokenType::Instruction(InstructionKind::From) {
    return None;
  }

  let arguments = tokens[first + 1..].iter()
    .filter(|t| !matches!(
      t.token_type,
      TokenType::Newline | TokenType::Continuation | TokenType::Comment
    ))
    .cloned()
    .collect();

  Some(InstructionTokens {
    instruction: tokens[first].clone(),
    arguments,
    comments: Vec::new(),
    raw: tokens,
    json_form: false,
    failed: true
  })
}

/// Groups scanner tokens into logical instruction lines.
///
/// The lexer keeps two tokens of lookahead and never surfaces whitespace.
pub struct Lexer<'a> {
  scanner: Scanner<'a>,
  current: Result<Token, ScanError>,
  peek: Result<Token, ScanError>,

  /// Comment lines waiting to be attached to the next instruction
  pending_comments: Vec<Token>,
  warnings: Vec<Warning>,

  /// The partial `FROM` line of the last scan error, if any
  failed_from: Option<InstructionTokens>
}

impl<'a> Lexer<'a> {
  pub fn new(scanner: Scanner<'a>) -> Lexer<'a> {
    let mut scanner = scanner;
    let current = Lexer::scan_significant(&mut scanner);
    let peek = Lexer::scan_significant(&mut scanner);

    Lexer {
      scanner,
      current,
      peek,
      pending_comments: Vec::new(),
      warnings: Vec::new(),
      failed_from: None
    }
  }

  fn scan_significant(scanner: &mut Scanner<'a>) -> Result<Token, ScanError> {
    loop {
      let token = scanner.scan()?;
      if token.token_type != TokenType::Whitespace {
        return Ok(token);
      }
    }
  }

  /// Returns the next token, advancing the lookahead buffer.
  pub fn next_token(&mut self) -> Result<Token, ScanError> {
    let next = Lexer::scan_significant(&mut self.scanner);
    let peeked = mem::replace(&mut self.peek, next);
    mem::replace(&mut self.current, peeked)
  }

  /// Returns the token the next call to `next_token()` will produce, if it
  /// was scanned successfully.
  pub fn peek_token(&self) -> Option<&Token> {
    self.current.as_ref().ok()
  }

  /// Returns the token following `peek_token()`.
  pub fn peek_second(&self) -> Option<&Token> {
    self.peek.as_ref().ok()
  }

  pub fn at_eof(&self) -> bool {
    matches!(self.peek_token(), Some(t) if t.token_type == TokenType::Eof)
  }

  pub fn warnings(&self) -> &[Warning] {
    &self.warnings
  }

  pub fn take_warnings(&mut self) -> Vec<Warning> {
    mem::take(&mut self.warnings)
  }

  /// Names of every variable referenced in the input scanned so far.
  pub fn variables(&self) -> &BTreeSet<String> {
    self.scanner.variables()
  }

  /// Reads the tokens of one logical line, up to and including the newline
  /// that ends it. Newlines following a continuation do not end the line.
  pub fn tokenize_line(&mut self) -> Result<Vec<Token>, ScanError> {
    let mut tokens = Vec::new();
    self.read_line(&mut tokens)?;

    Ok(tokens)
  }

  /// Reads a logical line into `tokens`, leaving whatever was read before a
  /// scan error in place.
  fn read_line(&mut self, tokens: &mut Vec<Token>) -> Result<(), ScanError> {
    let mut continued = false;
    let mut after_continuation = false;

    loop {
      let token = self.next_token()?;

      match token.token_type {
        TokenType::Eof => return Ok(()),
        TokenType::Newline if continued => {
          if after_continuation {
            self.warnings.push(Warning::new(
              WarnLevel::Low,
              token.position(),
              "empty continuation line",
              tokens.first().map(|t: &Token| t.value.clone()).unwrap_or_default()
            ));
          }

          tokens.push(token);
          after_continuation = true;
        },
        TokenType::Newline => {
          tokens.push(token);
          return Ok(());
        },
        TokenType::Continuation => {
          continued = true;
          after_continuation = true;
          tokens.push(token);
        },
        TokenType::Comment => {
          after_continuation = false;
          tokens.push(token);
        },
        _ => {
          continued = false;
          after_continuation = false;
          tokens.push(token);
        }
      }
    }
  }

  /// The source text of a logical line, without its trailing newline.
  fn line_text(&self, tokens: &[Token]) -> String {
    let start = tokens.first().map(|t| t.offset).unwrap_or(0);
    let end = tokens.iter()
      .filter(|t| t.token_type != TokenType::Newline)
      .map(|t| t.end_offset())
      .max()
      .unwrap_or(start);

    self.scanner.source()[start..end].to_string()
  }

  /// Skips to the start of the next line after a scan error.
  fn resync(&mut self) {
    loop {
      match self.next_token() {
        Ok(t) if t.token_type == TokenType::Newline || t.token_type == TokenType::Eof => break,
        _ => continue
      }
    }
  }

  /// Reads the next logical line and groups its tokens.
  ///
  /// Returns `Ok(None)` for blank and comment-only lines. On a scan error the
  /// rest of the line is skipped.
  pub fn process_instruction_line(
    &mut self
  ) -> Result<Option<InstructionTokens>, DockerfileError> {
    let mut tokens = Vec::new();
    if let Err(e) = self.read_line(&mut tokens) {
      trace!("scan error, skipping line: {}", e);
      self.pending_comments.clear();
      self.resync();
      self.failed_from = failed_from_line(tokens);
      return Err(e.into());
    }

    let first = tokens.iter().position(|t| !matches!(
      t.token_type,
      TokenType::Newline | TokenType::Continuation | TokenType::Comment
    ));

    let first = match first {
      Some(first) => first,
      None => {
        let mut comments: Vec<Token> = tokens
          .into_iter()
          .filter(|t| t.token_type == TokenType::Comment)
          .collect();

        if comments.is_empty() {
          self.pending_comments.clear();
        } else {
          self.pending_comments.append(&mut comments);
        }

        return Ok(None);
      }
    };

    let text = self.line_text(&tokens);

    if let Some(illegal) = tokens.iter().find(|t| t.token_type == TokenType::Illegal) {
      self.pending_comments.clear();
      return Err(DockerfileError::syntax(
        illegal.position(),
        format!("illegal character {:?}", illegal.value),
        text
      ));
    }

    let instruction = tokens[first].clone();
    if !instruction.is_instruction() {
      self.pending_comments.clear();
      return Err(DockerfileError::syntax(
        instruction.position(),
        "line must start with an instruction",
        text
      ));
    }

    let mut comments = mem::take(&mut self.pending_comments);
    let mut arguments = Vec::new();
    for token in &tokens[first + 1..] {
      match token.token_type {
        TokenType::Comment => comments.push(token.clone()),
        TokenType::Newline
        | TokenType::Continuation
        | TokenType::HeredocContent
        | TokenType::HeredocEnd => (),
        _ => arguments.push(token.clone())
      }
    }

    let mut line = InstructionTokens {
      instruction,
      arguments,
      comments,
      raw: tokens,
      json_form: false,
      failed: false
    };
    line.json_form = line.is_json_form();

    trace!(
      "line {}: {} with {} argument tokens",
      line.line(), line.command(), line.arguments.len()
    );

    Ok(Some(line))
  }

  /// Processes every line of the input, collecting per-line errors.
  pub fn process_all_instructions(&mut self) -> (Vec<InstructionTokens>, Vec<DockerfileError>) {
    let mut lines = Vec::new();
    let mut errors = Vec::new();

    while !self.at_eof() {
      match self.process_instruction_line() {
        Ok(Some(line)) => lines.push(line),
        Ok(None) => (),
        Err(e) => {
          errors.push(e);
          lines.extend(self.failed_from.take());
        }
      }
    }

    debug!("lexed {} instruction lines, {} errors", lines.len(), errors.len());

    (lines, errors)
  }
}
