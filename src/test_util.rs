// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use crate::lexer::{InstructionTokens, Lexer};
use crate::scanner::Scanner;

/// Lexes the first instruction line of `input`, which must scan cleanly.
pub fn lex_one(input: &str) -> InstructionTokens {
  let (mut lines, errors) = Lexer::new(Scanner::new(input)).process_all_instructions();
  assert!(errors.is_empty(), "unexpected lexer errors: {:?}", errors);
  assert!(!lines.is_empty(), "no instruction in {:?}", input);

  lines.remove(0)
}
