// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

#![forbid(unsafe_code)]

//! # Dockerfile analyzer
//!
//! A pure Rust library for tokenizing, parsing and validating Dockerfiles.
//! Input is scanned into position-annotated tokens, grouped into logical
//! instruction lines, split into build stages and parsed per instruction.
//! Every problem found along the way is collected as a diagnostic next to
//! whatever could be parsed, so a single bad line never hides the rest of
//! the file.
//!
//! ## Quick start
//!
//! ```rust
//! use dockerfile_analyzer::ParsedDockerfile;
//!
//! let dockerfile = ParsedDockerfile::parse(r#"
//!   FROM alpine:3.11 as builder
//!   RUN echo "hello world" > /hello-world
//!
//!   FROM scratch
//!   COPY --from=builder /hello-world /hello-world
//! "#);
//!
//! for stage in &dockerfile.stages {
//!   println!("stage #{} ({})", stage.index, stage.parent());
//!   for ins in &stage.instructions {
//!     println!("  {} {:?}", ins.command, ins.args);
//!   }
//! }
//!
//! for error in &dockerfile.errors {
//!   eprintln!("{}", error);
//! }
//! ```

#[macro_use] extern crate pest_derive;

mod position;
mod token;
mod diagnostic;
mod error;
mod scanner;
mod lexer;
mod analyzer;
mod parser;
mod util;
mod image;
mod instructions;
mod stage;
mod dockerfile_parser;

pub use position::*;
pub use token::*;
pub use diagnostic::*;
pub use error::*;
pub use scanner::{Scanner, DEFAULT_ESCAPE};
pub use lexer::*;
pub use analyzer::*;
pub use image::*;
pub use stage::*;
pub use crate::dockerfile_parser::*;

#[cfg(test)] mod test_util;
