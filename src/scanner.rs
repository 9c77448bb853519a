// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::collections::{BTreeSet, VecDeque};

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ScanError;
use crate::position::Position;
use crate::token::{InstructionKind, Token, TokenType};

/// The default Dockerfile escape character.
pub const DEFAULT_ESCAPE: char = '\\';

lazy_static! {
  /// Matches `$NAME` and `${NAME}` (with optional modifier) references.
  static ref VAR: Regex = Regex::new(
    r"\$(?:([A-Za-z_][A-Za-z0-9_]*)|\{([A-Za-z_][A-Za-z0-9_]*)(?::[-+][^}]*)?\})"
  ).unwrap();
}

/// A heredoc opener whose body has not been read yet.
#[derive(Debug, Clone)]
struct PendingHeredoc {
  identifier: String,
  strip_tabs: bool,
  position: Position
}

/// A parsed `<<[-~]IDENT` heredoc opener.
#[derive(Debug, PartialEq, Eq, Clone)]
pub(crate) struct HeredocOpener {
  pub identifier: String,
  pub strip_tabs: bool,

  /// Whether the identifier was quoted, disabling expansion in the body
  pub quoted: bool,

  /// Byte length of the opener text
  pub len: usize
}

impl HeredocOpener {
  /// Parses a heredoc opener at the start of `s`.
  ///
  /// Returns None for here-strings (`<<<`) and for openers without an
  /// identifier.
  pub(crate) fn parse(s: &str) -> Option<HeredocOpener> {
    let rest = s.strip_prefix("<<")?;
    let (strip_tabs, rest) = match rest.chars().next() {
      Some('-') | Some('~') => (true, &rest[1..]),
      _ => (false, rest)
    };

    let quote = match rest.chars().next() {
      Some(q @ '"') | Some(q @ '\'') => Some(q),
      _ => None
    };

    let body = if quote.is_some() { &rest[1..] } else { rest };
    let ident_len = body
      .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
      .unwrap_or_else(|| body.len());

    if ident_len == 0 {
      return None;
    }

    let mut len = s.len() - body.len() + ident_len;
    if let Some(q) = quote {
      if !body[ident_len..].starts_with(q) {
        return None;
      }

      len += 1;
    }

    Some(HeredocOpener {
      identifier: body[..ident_len].to_string(),
      strip_tabs,
      quoted: quote.is_some(),
      len
    })
  }
}

fn is_var_char(c: char) -> bool {
  c.is_alphanumeric() || c == '_'
}

/// Converts Dockerfile source text into a stream of [`Token`]s.
///
/// The scanner tracks enough line state to recognize instruction keywords,
/// comments, continuations and heredoc bodies; everything else is left to
/// the lexer and parser.
#[derive(Debug)]
pub struct Scanner<'a> {
  src: &'a str,
  offset: usize,
  line: usize,
  column: usize,
  escape: char,

  /// No significant token has been read on this logical line yet
  line_start: bool,

  /// Only blanks have been read on this physical line
  blank_line: bool,

  /// The previous significant token was an instruction keyword or a
  /// complete leading `--flag` word
  after_instruction: bool,

  /// Inside a leading `--flag` word
  in_flag: bool,

  /// A continuation has been read and no content has followed it yet
  continued: bool,
  instruction: Option<InstructionKind>,

  pending_heredocs: Vec<PendingHeredoc>,
  queued: VecDeque<Token>,
  variables: BTreeSet<String>
}

impl<'a> Scanner<'a> {
  pub fn new(src: &'a str) -> Scanner<'a> {
    Scanner::with_escape(src, DEFAULT_ESCAPE)
  }

  pub fn with_escape(src: &'a str, escape: char) -> Scanner<'a> {
    Scanner {
      src,
      offset: 0,
      line: 1,
      column: 1,
      escape,
      line_start: true,
      blank_line: true,
      after_instruction: false,
      in_flag: false,
      continued: false,
      instruction: None,
      pending_heredocs: Vec::new(),
      queued: VecDeque::new(),
      variables: BTreeSet::new()
    }
  }

  pub(crate) fn source(&self) -> &'a str {
    self.src
  }

  pub fn escape_char(&self) -> char {
    self.escape
  }

  /// Names of every variable referenced so far, without the `$` sigil.
  pub fn variables(&self) -> &BTreeSet<String> {
    &self.variables
  }

  /// Returns the next token. Once the input is exhausted every call returns
  /// an `Eof` token.
  pub fn scan(&mut self) -> Result<Token, ScanError> {
    if let Some(token) = self.queued.pop_front() {
      return Ok(token);
    }

    let start = self.mark();
    let ch = match self.peek() {
      Some(ch) => ch,
      None => return self.scan_eof(start)
    };

    let token = match ch {
      '\n' => self.scan_newline(start)?,
      '\r' if self.peek_nth(1) == Some('\n') => self.scan_newline(start)?,
      ' ' | '\t' => self.scan_whitespace(start),
      '#' if self.blank_line => self.scan_comment(start),
      c if c == self.escape => self.scan_escape(start)?,
      '"' | '\'' => self.scan_quoted(start, ch)?,
      '$' if self.starts_variable() => self.scan_variable(start)?,
      '[' if self.after_instruction => self.scan_json_array(start),
      '<' if self.instruction.is_some() && self.heredoc_opener().is_some() => {
        self.scan_heredoc_start(start)
      },
      '=' | ':' | ',' | '[' | ']' => self.scan_punctuation(start, ch),
      c if c.is_control() => {
        self.bump();
        Token::new(TokenType::Illegal, c.to_string(), self.slice(&start), &start)
      },
      _ => self.scan_word(start)
    };

    self.track(&token);
    Ok(token)
  }

  fn mark(&self) -> Position {
    Position::new(self.line, self.column, self.offset)
  }

  fn rest(&self) -> &'a str {
    &self.src[self.offset..]
  }

  fn slice(&self, start: &Position) -> &'a str {
    &self.src[start.offset..self.offset]
  }

  fn peek(&self) -> Option<char> {
    self.rest().chars().next()
  }

  fn peek_nth(&self, n: usize) -> Option<char> {
    self.rest().chars().nth(n)
  }

  fn bump(&mut self) -> Option<char> {
    let ch = self.peek()?;
    self.offset += ch.len_utf8();

    if ch == '\n' {
      self.line += 1;
      self.column = 1;
    } else {
      self.column += 1;
    }

    Some(ch)
  }

  /// Advances over the next `len` bytes.
  fn advance(&mut self, len: usize) {
    let target = self.offset + len;
    while self.offset < target && self.bump().is_some() {}
  }

  /// Updates line state after a token has been produced.
  fn track(&mut self, token: &Token) {
    match token.token_type {
      TokenType::Newline if self.continued => self.blank_line = true,
      TokenType::Newline => {
        self.line_start = true;
        self.blank_line = true;
        self.after_instruction = false;
        self.in_flag = false;
        self.instruction = None;
      },
      TokenType::Continuation => {
        self.blank_line = true;
        self.continued = true;
        self.end_flag();
      },
      TokenType::Whitespace => self.end_flag(),
      TokenType::Comment
      | TokenType::HeredocContent
      | TokenType::HeredocEnd => (),
      TokenType::Instruction(kind) => {
        self.line_start = false;
        self.blank_line = false;
        self.after_instruction = true;
        self.in_flag = false;
        self.instruction = Some(kind);
        self.continued = false;
      },
      _ => {
        // a JSON array may still follow flags such as `COPY --from=x [...]`
        let starts_flag = self.after_instruction
          && token.token_type == TokenType::String
          && token.value.starts_with("--");

        self.in_flag = starts_flag || self.in_flag;
        self.line_start = false;
        self.blank_line = false;
        self.after_instruction = false;
        self.continued = false;
      }
    }
  }

  fn end_flag(&mut self) {
    if self.in_flag {
      self.in_flag = false;
      self.after_instruction = true;
    }
  }

  fn scan_eof(&mut self, start: Position) -> Result<Token, ScanError> {
    if let Some(heredoc) = self.pending_heredocs.first().cloned() {
      self.pending_heredocs.clear();
      return Err(ScanError::UnterminatedHeredoc {
        identifier: heredoc.identifier,
        position: heredoc.position
      });
    }

    Ok(Token::new(TokenType::Eof, "", "", &start))
  }

  fn scan_newline(&mut self, start: Position) -> Result<Token, ScanError> {
    if self.peek() == Some('\r') {
      self.bump();
    }
    self.bump();

    if !self.pending_heredocs.is_empty() {
      // the opener line's newline is swallowed; the terminator line's
      // newline ends the instruction instead
      self.read_heredoc_bodies()?;
      if let Some(token) = self.queued.pop_front() {
        return Ok(token);
      }
    }

    Ok(Token::new(TokenType::Newline, "\n", self.slice(&start), &start))
  }

  fn scan_whitespace(&mut self, start: Position) -> Token {
    while let Some(' ') | Some('\t') = self.peek() {
      self.bump();
    }

    let text = self.slice(&start);
    Token::new(TokenType::Whitespace, text, text, &start)
  }

  fn scan_comment(&mut self, start: Position) -> Token {
    while let Some(ch) = self.peek() {
      if ch == '\n' || (ch == '\r' && self.peek_nth(1) == Some('\n')) {
        break;
      }

      self.bump();
    }

    let text = self.slice(&start);
    Token::new(TokenType::Comment, text, text, &start)
  }

  /// Byte length of an escape-blanks-newline continuation at the current
  /// offset, if there is one.
  fn continuation_len(&self) -> Option<usize> {
    let rest = self.rest();
    let after_escape = rest.strip_prefix(self.escape)?;
    let after_blanks = after_escape.trim_start_matches(|c| c == ' ' || c == '\t');
    let newline = if after_blanks.starts_with('\n') {
      1
    } else if after_blanks.starts_with("\r\n") {
      2
    } else {
      return None;
    };

    Some(rest.len() - after_blanks.len() + newline)
  }

  fn scan_escape(&mut self, start: Position) -> Result<Token, ScanError> {
    if let Some(len) = self.continuation_len() {
      self.advance(len);
      let raw = self.slice(&start);
      return Ok(Token::new(TokenType::Continuation, self.escape.to_string(), raw, &start));
    }

    self.bump();
    if self.rest().trim_start_matches(|c| c == ' ' || c == '\t').is_empty() {
      self.advance(self.rest().len());
      return Err(ScanError::DanglingContinuation { position: start });
    }

    self.bump();
    let text = self.slice(&start);
    Ok(Token::new(TokenType::EscapedChar, text, text, &start))
  }

  fn scan_quoted(&mut self, start: Position, quote: char) -> Result<Token, ScanError> {
    let mut value = String::new();
    value.push(quote);
    self.bump();

    loop {
      match self.peek() {
        None | Some('\n') => {
          return Err(ScanError::UnterminatedQuote {
            quote,
            position: start.clone(),
            snippet: self.slice(&start).trim_end_matches('\r').to_string()
          });
        },
        Some(c) if c == self.escape => {
          if let Some(len) = self.continuation_len() {
            self.advance(len);
            continue;
          }

          // keep the escape; the escaped character never closes the string
          value.push(c);
          self.bump();
          match self.peek() {
            Some(next) if next != '\n' => {
              value.push(next);
              self.bump();
            },
            _ => ()
          }
        },
        Some(c) if c == quote => {
          value.push(c);
          self.bump();
          break;
        },
        Some(c) => {
          value.push(c);
          self.bump();
        }
      }
    }

    if quote == '"' {
      for caps in VAR.captures_iter(&value) {
        if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
          self.variables.insert(name.as_str().to_string());
        }
      }
    }

    Ok(Token::new(TokenType::QuotedString, value, self.slice(&start), &start))
  }

  fn starts_variable(&self) -> bool {
    match self.peek_nth(1) {
      Some('{') => true,
      Some(c) => is_var_char(c),
      None => false
    }
  }

  fn scan_variable(&mut self, start: Position) -> Result<Token, ScanError> {
    self.bump();

    let name = if self.peek() == Some('{') {
      self.bump();
      self.scan_braced_variable(&start)?
    } else {
      let name_start = self.offset;
      while self.peek().map(is_var_char).unwrap_or(false) {
        self.bump();
      }

      self.src[name_start..self.offset].to_string()
    };

    self.variables.insert(name);

    let text = self.slice(&start);
    Ok(Token::new(TokenType::Variable, text, text, &start))
  }

  /// Reads the remainder of a `${...}` reference, returning the variable
  /// name.
  fn scan_braced_variable(&mut self, start: &Position) -> Result<String, ScanError> {
    let name_start = self.offset;

    loop {
      match self.peek() {
        Some('}') if self.offset > name_start => {
          let name = self.src[name_start..self.offset].to_string();
          self.bump();
          return Ok(name);
        },
        Some(':') if self.offset > name_start
          && matches!(self.peek_nth(1), Some('-') | Some('+')) =>
        {
          let name = self.src[name_start..self.offset].to_string();
          self.skip_variable_modifier(start)?;
          return Ok(name);
        },
        Some(c) if is_var_char(c) => {
          self.bump();
        },
        None | Some('\n') => {
          return Err(ScanError::UnterminatedVariable {
            position: start.clone(),
            snippet: self.slice(start).to_string()
          });
        },
        Some(c) => {
          let position = self.mark();
          self.bump();
          return Err(ScanError::InvalidVariable {
            ch: c,
            position,
            snippet: self.slice(start).to_string()
          });
        }
      }
    }
  }

  /// Skips a `:-word` / `:+word` modifier and the closing brace. The word
  /// may contain nested references.
  fn skip_variable_modifier(&mut self, start: &Position) -> Result<(), ScanError> {
    let mut depth = 1;

    while depth > 0 {
      match self.bump() {
        Some('{') => depth += 1,
        Some('}') => depth -= 1,
        Some('\n') | None => {
          return Err(ScanError::UnterminatedVariable {
            position: start.clone(),
            snippet: self.slice(start).trim_end().to_string()
          });
        },
        Some(_) => ()
      }
    }

    let inner = &self.slice(start)[1..];
    for caps in VAR.captures_iter(inner) {
      if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
        self.variables.insert(name.as_str().to_string());
      }
    }

    Ok(())
  }

  fn scan_json_array(&mut self, start: Position) -> Token {
    let mut value = String::new();
    let mut depth = 0usize;

    while let Some(ch) = self.peek() {
      match ch {
        '\n' => break,
        '\r' if self.peek_nth(1) == Some('\n') => break,
        c if c == self.escape && self.continuation_len().is_some() => {
          if let Some(len) = self.continuation_len() {
            self.advance(len);
          }
        },
        '[' => {
          depth += 1;
          value.push(ch);
          self.bump();
        },
        ']' => {
          depth = depth.saturating_sub(1);
          value.push(ch);
          self.bump();
          if depth == 0 {
            break;
          }
        },
        '"' | '\'' => self.scan_json_string(ch, &mut value),
        _ => {
          value.push(ch);
          self.bump();
        }
      }
    }

    Token::new(TokenType::JsonArray, value, self.slice(&start), &start)
  }

  /// Copies a JSON string literal into `value`, stopping early at an
  /// unescaped newline.
  fn scan_json_string(&mut self, quote: char, value: &mut String) {
    value.push(quote);
    self.bump();

    while let Some(ch) = self.peek() {
      if ch == self.escape {
        if let Some(len) = self.continuation_len() {
          self.advance(len);
          continue;
        }
      }

      match ch {
        '\n' => return,
        '\\' => {
          value.push(ch);
          self.bump();
          match self.peek() {
            Some(next) if next != '\n' => {
              value.push(next);
              self.bump();
            },
            _ => ()
          }
        },
        c if c == quote => {
          value.push(c);
          self.bump();
          return;
        },
        c => {
          value.push(c);
          self.bump();
        }
      }
    }
  }

  fn heredoc_opener(&self) -> Option<HeredocOpener> {
    HeredocOpener::parse(self.rest())
  }

  fn scan_heredoc_start(&mut self, start: Position) -> Token {
    // only called once heredoc_opener() matched
    let opener = match self.heredoc_opener() {
      Some(opener) => opener,
      None => return self.scan_word(start)
    };

    self.advance(opener.len);
    self.pending_heredocs.push(PendingHeredoc {
      identifier: opener.identifier,
      strip_tabs: opener.strip_tabs,
      position: start.clone()
    });

    let text = self.slice(&start);
    Token::new(TokenType::HeredocStart, text, text, &start)
  }

  /// Reads the body of every pending heredoc, queueing a `HeredocContent`
  /// and a `HeredocEnd` token for each.
  fn read_heredoc_bodies(&mut self) -> Result<(), ScanError> {
    let pending = std::mem::take(&mut self.pending_heredocs);

    for (i, heredoc) in pending.into_iter().enumerate() {
      if i > 0 {
        if self.rest().starts_with("\r\n") {
          self.advance(2);
        } else if self.peek() == Some('\n') {
          self.bump();
        }
      }

      let start = self.mark();
      let mut content = String::new();
      let mut end = None;

      while self.offset < self.src.len() {
        let rest = self.rest();
        let line_len = rest.find('\n').unwrap_or_else(|| rest.len());
        let line = rest[..line_len].trim_end_matches('\r');

        if line.trim() == heredoc.identifier {
          let end_start = self.mark();
          self.advance(line.len());
          end = Some(Token::new(
            TokenType::HeredocEnd,
            heredoc.identifier.clone(),
            self.slice(&end_start),
            &end_start
          ));
          break;
        }

        if heredoc.strip_tabs {
          content.push_str(line.trim_start_matches('\t'));
        } else {
          content.push_str(line);
        }
        content.push('\n');

        self.advance(line_len);
        if self.peek() == Some('\n') {
          self.bump();
        }
      }

      let end = match end {
        Some(end) => end,
        None => {
          return Err(ScanError::UnterminatedHeredoc {
            identifier: heredoc.identifier,
            position: heredoc.position
          });
        }
      };

      let raw = &self.src[start.offset..end.offset];
      self.queued.push_back(Token::new(TokenType::HeredocContent, content, raw, &start));
      self.queued.push_back(end);
    }

    Ok(())
  }

  fn scan_punctuation(&mut self, start: Position, ch: char) -> Token {
    self.bump();

    let token_type = match ch {
      '=' => TokenType::Equals,
      ':' => TokenType::Colon,
      ',' => TokenType::Comma,
      '[' => TokenType::LeftBracket,
      _ => TokenType::RightBracket
    };

    let text = self.slice(&start);
    Token::new(token_type, text, text, &start)
  }

  fn at_word_boundary(&self) -> bool {
    match self.peek() {
      None => true,
      Some(c) if c == self.escape => true,
      Some('$') => self.starts_variable(),
      Some(c) => {
        c.is_whitespace()
          || c.is_control()
          || matches!(c, '"' | '\'' | '=' | ':' | ',' | '[' | ']')
      }
    }
  }

  fn scan_word(&mut self, start: Position) -> Token {
    // the first character is always consumed, even if it would otherwise
    // be a boundary (e.g. a lone `$`)
    self.bump();
    while !self.at_word_boundary() {
      self.bump();
    }

    let text = self.slice(&start);
    let token_type = if self.line_start {
      match InstructionKind::from_keyword(text) {
        Some(kind) => TokenType::Instruction(kind),
        None if text.chars().all(|c| c.is_ascii_alphabetic()) => {
          TokenType::Instruction(InstructionKind::Unknown)
        },
        None => TokenType::String
      }
    } else if self.instruction == Some(InstructionKind::From) && text.eq_ignore_ascii_case("as") {
      TokenType::As
    } else if text.chars().all(|c| c.is_ascii_digit()) {
      TokenType::Number
    } else {
      TokenType::String
    };

    Token::new(token_type, text, text, &start)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  fn scan_all(input: &str) -> Result<Vec<Token>, ScanError> {
    let mut scanner = Scanner::new(input);
    let mut tokens = Vec::new();

    loop {
      let token = scanner.scan()?;
      if token.token_type == TokenType::Eof {
        return Ok(tokens);
      }

      if token.token_type != TokenType::Whitespace {
        tokens.push(token);
      }
    }
  }

  fn types(input: &str) -> Vec<TokenType> {
    scan_all(input).unwrap().into_iter().map(|t| t.token_type).collect()
  }

  fn values(input: &str) -> Vec<String> {
    scan_all(input).unwrap().into_iter().map(|t| t.value).collect()
  }

  #[test]
  fn scan_from() {
    let tokens = scan_all("FROM alpine:3.10 AS build\n").unwrap();
    assert_eq!(
      tokens.iter().map(|t| t.token_type).collect::<Vec<_>>(),
      vec![
        TokenType::Instruction(InstructionKind::From),
        TokenType::String,
        TokenType::Colon,
        TokenType::String,
        TokenType::As,
        TokenType::String,
        TokenType::Newline
      ]
    );

    assert_eq!(tokens[1].value, "alpine");
    assert_eq!(tokens[1].column, 6);
    assert_eq!(tokens[1].offset, 5);
    assert_eq!(tokens[3].value, "3.10");
    assert_eq!(tokens[5].line, 1);
  }

  #[test]
  fn scan_eof_repeats() {
    let mut scanner = Scanner::new("RUN a");
    while scanner.scan().unwrap().token_type != TokenType::Eof {}
    assert_eq!(scanner.scan().unwrap().token_type, TokenType::Eof);
    assert_eq!(scanner.scan().unwrap().token_type, TokenType::Eof);
  }

  #[test]
  fn scan_unknown_instruction() {
    assert_eq!(
      types("MAINTAINER me\nfrom alpine\n")[..2].to_vec(),
      vec![TokenType::Instruction(InstructionKind::Unknown), TokenType::String]
    );

    let tokens = scan_all("MAINTAINER me\nfrom alpine\n").unwrap();
    assert_eq!(tokens[3].token_type, TokenType::Instruction(InstructionKind::Unknown));
    assert_eq!(tokens[3].value, "from");
  }

  #[test]
  fn scan_keyword_only_at_line_start() {
    assert_eq!(
      types("RUN echo FROM 42\n"),
      vec![
        TokenType::Instruction(InstructionKind::Run),
        TokenType::String,
        TokenType::String,
        TokenType::Number,
        TokenType::Newline
      ]
    );
  }

  #[test]
  fn scan_comments() {
    let tokens = scan_all(indoc!(r#"
      # leading comment
      RUN echo # not a comment
        # but this is
    "#)).unwrap();

    assert_eq!(tokens[0].token_type, TokenType::Comment);
    assert_eq!(tokens[0].value, "# leading comment");

    let comments: Vec<_> = tokens.iter()
      .filter(|t| t.token_type == TokenType::Comment)
      .map(|t| t.value.as_str())
      .collect();
    assert_eq!(comments, vec!["# leading comment", "# but this is"]);
  }

  #[test]
  fn scan_continuation() {
    let tokens = scan_all("RUN apt-get update \\  \n  && echo hi\n").unwrap();
    let continuation = tokens.iter()
      .find(|t| t.token_type == TokenType::Continuation)
      .unwrap();

    assert_eq!(continuation.value, "\\");
    assert_eq!(continuation.raw, "\\  \n");

    // the continued line is not a new logical line
    let amp = tokens.iter().find(|t| t.value == "&&").unwrap();
    assert_eq!(amp.token_type, TokenType::String);
    assert_eq!(amp.line, 2);
  }

  #[test]
  fn scan_empty_continuation_line() {
    // the blank line does not end the instruction
    let tokens = scan_all("RUN a \\\n\n  b\n").unwrap();
    let b = tokens.iter().find(|t| t.value == "b").unwrap();
    assert_eq!(b.token_type, TokenType::String);
  }

  #[test]
  fn scan_dangling_continuation() {
    match scan_all("RUN foo \\  ") {
      Err(ScanError::DanglingContinuation { position }) => {
        assert_eq!(position, Position::new(1, 9, 8));
      },
      other => panic!("expected dangling continuation, got {:?}", other)
    }
  }

  #[test]
  fn scan_escaped_char() {
    let tokens = scan_all("RUN echo \\$HOME\n").unwrap();
    assert_eq!(tokens[2].token_type, TokenType::EscapedChar);
    assert_eq!(tokens[2].value, "\\$");
    assert_eq!(tokens[3].value, "HOME");
  }

  #[test]
  fn scan_custom_escape() {
    let mut scanner = Scanner::with_escape("RUN dir c:\\ `\nfoo\n", '`');
    let mut tokens = Vec::new();
    loop {
      let token = scanner.scan().unwrap();
      if token.token_type == TokenType::Eof {
        break;
      }
      tokens.push(token);
    }

    assert!(tokens.iter().any(|t| t.value == "\\"));
    assert!(tokens.iter().any(|t| t.token_type == TokenType::Continuation));
  }

  #[test]
  fn scan_quoted_strings() {
    let tokens = scan_all(r#"LABEL a="it's \"ok\"" b='x y'"#).unwrap();
    let quoted: Vec<_> = tokens.iter()
      .filter(|t| t.token_type == TokenType::QuotedString)
      .map(|t| t.value.as_str())
      .collect();

    assert_eq!(quoted, vec![r#""it's \"ok\"""#, "'x y'"]);
  }

  #[test]
  fn scan_quoted_continuation_folds() {
    let tokens = scan_all("RUN echo \"a \\\nb\"\n").unwrap();
    assert_eq!(tokens[2].value, "\"a b\"");
    assert_eq!(tokens[2].raw, "\"a \\\nb\"");
  }

  #[test]
  fn scan_unterminated_quote() {
    match scan_all("RUN echo \"foo\nRUN bar\n") {
      Err(ScanError::UnterminatedQuote { quote, position, snippet }) => {
        assert_eq!(quote, '"');
        assert_eq!(position.column, 10);
        assert_eq!(snippet, "\"foo");
      },
      other => panic!("expected unterminated quote, got {:?}", other)
    }
  }

  #[test]
  fn scan_variables() {
    let mut scanner = Scanner::new("RUN echo $FOO ${BAR} ${BAZ:-x} \"$QUX\" '$NOPE' $ 5$\n");
    let mut vars = Vec::new();
    loop {
      let token = scanner.scan().unwrap();
      match token.token_type {
        TokenType::Eof => break,
        TokenType::Variable => vars.push(token.value),
        _ => ()
      }
    }

    assert_eq!(vars, vec!["$FOO", "${BAR}", "${BAZ:-x}"]);
    assert_eq!(
      scanner.variables().iter().cloned().collect::<Vec<_>>(),
      vec!["BAR", "BAZ", "FOO", "QUX"]
    );
  }

  #[test]
  fn scan_invalid_variable() {
    match scan_all("RUN echo ${FOO-BAR}\n") {
      Err(ScanError::InvalidVariable { ch, position, .. }) => {
        assert_eq!(ch, '-');
        assert_eq!(position.column, 15);
      },
      other => panic!("expected invalid variable, got {:?}", other)
    }

    assert!(matches!(
      scan_all("RUN echo ${FOO\n"),
      Err(ScanError::UnterminatedVariable { .. })
    ));
  }

  #[test]
  fn scan_json_array() {
    let tokens = scan_all("CMD [\"echo\", \"a]b\"] \nRUN [x]\n").unwrap();
    assert_eq!(tokens[1].token_type, TokenType::JsonArray);
    assert_eq!(tokens[1].value, "[\"echo\", \"a]b\"]");

    // not in first-argument position
    assert_eq!(
      types("RUN echo [x]\n"),
      vec![
        TokenType::Instruction(InstructionKind::Run),
        TokenType::String,
        TokenType::LeftBracket,
        TokenType::String,
        TokenType::RightBracket,
        TokenType::Newline
      ]
    );
  }

  #[test]
  fn scan_json_array_after_flags() {
    assert_eq!(
      types("COPY --from=build [\"a b\", \"/dst\"]\n"),
      vec![
        TokenType::Instruction(InstructionKind::Copy),
        TokenType::String,
        TokenType::Equals,
        TokenType::String,
        TokenType::JsonArray,
        TokenType::Newline
      ]
    );

    assert_eq!(
      types("RUN --network=none echo [x]\n"),
      vec![
        TokenType::Instruction(InstructionKind::Run),
        TokenType::String,
        TokenType::Equals,
        TokenType::String,
        TokenType::String,
        TokenType::LeftBracket,
        TokenType::String,
        TokenType::RightBracket,
        TokenType::Newline
      ]
    );
  }

  #[test]
  fn scan_json_array_unterminated() {
    let tokens = scan_all("CMD [\"echo\",\nRUN x\n").unwrap();
    assert_eq!(tokens[1].token_type, TokenType::JsonArray);
    assert_eq!(tokens[1].value, "[\"echo\",");
    assert_eq!(tokens[2].token_type, TokenType::Newline);
  }

  #[test]
  fn scan_heredoc() {
    let tokens = scan_all(indoc!(r#"
      RUN <<EOF
      echo hi
        echo there
      EOF
      USER root
    "#)).unwrap();

    assert_eq!(
      tokens.iter().map(|t| t.token_type).collect::<Vec<_>>(),
      vec![
        TokenType::Instruction(InstructionKind::Run),
        TokenType::HeredocStart,
        TokenType::HeredocContent,
        TokenType::HeredocEnd,
        TokenType::Newline,
        TokenType::Instruction(InstructionKind::User),
        TokenType::String,
        TokenType::Newline
      ]
    );

    assert_eq!(tokens[1].value, "<<EOF");
    assert_eq!(tokens[2].value, "echo hi\n  echo there\n");
    assert_eq!(tokens[3].line, 4);
    assert_eq!(tokens[5].line, 5);
  }

  #[test]
  fn scan_heredoc_strip_tabs() {
    let values = values("COPY <<-EOT /dst\n\t\tline\n\tEOT\n");
    assert_eq!(values[1], "<<-EOT");
    assert_eq!(values[3], "line\n");
    assert_eq!(values[4], "EOT");
  }

  #[test]
  fn scan_multiple_heredocs() {
    let tokens = scan_all("COPY <<a <<b /dst\none\na\ntwo\nb\n").unwrap();
    let bodies: Vec<_> = tokens.iter()
      .filter(|t| t.token_type == TokenType::HeredocContent)
      .map(|t| t.value.as_str())
      .collect();

    assert_eq!(bodies, vec!["one\n", "two\n"]);

    let tokens = scan_all("COPY <<a <<b /dst\r\none\r\na\r\ntwo\r\nb\r\n").unwrap();
    let bodies: Vec<_> = tokens.iter()
      .filter(|t| t.token_type == TokenType::HeredocContent)
      .map(|t| t.value.as_str())
      .collect();

    assert_eq!(bodies, vec!["one\n", "two\n"]);
  }

  #[test]
  fn scan_unterminated_heredoc() {
    match scan_all("RUN <<EOF\necho hi\n") {
      Err(ScanError::UnterminatedHeredoc { identifier, position }) => {
        assert_eq!(identifier, "EOF");
        assert_eq!(position.column, 5);
      },
      other => panic!("expected unterminated heredoc, got {:?}", other)
    }
  }

  #[test]
  fn heredoc_opener() {
    assert_eq!(
      HeredocOpener::parse("<<\"EOF\" rest"),
      Some(HeredocOpener {
        identifier: "EOF".into(),
        strip_tabs: false,
        quoted: true,
        len: 7
      })
    );

    assert_eq!(HeredocOpener::parse("<<<EOF"), None);
    assert_eq!(HeredocOpener::parse("<< EOF"), None);
    assert_eq!(HeredocOpener::parse("<<'EOF"), None);
  }

  #[test]
  fn scan_crlf() {
    let tokens = scan_all("FROM alpine\r\nRUN a \\\r\n  b\r\n").unwrap();
    let newlines: Vec<_> = tokens.iter()
      .filter(|t| t.token_type == TokenType::Newline)
      .map(|t| t.raw.as_str())
      .collect();

    assert_eq!(newlines, vec!["\r\n", "\r\n"]);
    assert!(tokens.iter().all(|t| t.token_type != TokenType::Illegal));
  }

  #[test]
  fn scan_illegal() {
    let tokens = scan_all("RUN a\u{0}b\n").unwrap();
    assert_eq!(tokens[2].token_type, TokenType::Illegal);
  }

  #[test]
  fn scan_offsets_monotonic() {
    let input = indoc!(r#"
      ARG VERSION=1.0
      FROM alpine:${VERSION} AS base
      COPY --from=base ["a", "b"] /c
    "#);

    let mut scanner = Scanner::new(input);
    let mut last = 0;
    loop {
      let token = scanner.scan().unwrap();
      assert!(token.offset >= last);
      assert_eq!(&input[token.offset..token.end_offset()], token.raw);
      last = token.end_offset();

      if token.token_type == TokenType::Eof {
        break;
      }
    }
  }
}
