// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use std::collections::BTreeMap;
use std::fmt;

use crate::dockerfile_parser::Instruction;
use crate::image::ImageRef;
use crate::position::{Position, Range};
use crate::token::InstructionKind;

/// The parent image of a Docker build stage
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum StageParent<'a> {
  /// An externally-built image, potentially from a remote registry
  Image(&'a ImageRef),

  /// An index of a previous stage within the current Dockerfile
  Stage(usize),

  /// The empty (scratch) parent image
  Scratch
}

impl<'a> fmt::Display for StageParent<'a> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StageParent::Image(image) => image.fmt(f),
      StageParent::Stage(index) => index.fmt(f),
      StageParent::Scratch => write!(f, "scratch")
    }
  }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum VariableKind {
  Arg,
  Env
}

impl fmt::Display for VariableKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VariableKind::Arg => write!(f, "ARG"),
      VariableKind::Env => write!(f, "ENV")
    }
  }
}

/// Where a variable is visible.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum VariableScope {
  /// Declared before the first `FROM`
  Global,

  /// Declared inside a stage body
  Stage,

  /// An in-stage `ARG NAME` without a default that re-imports a global `ARG`
  Build
}

/// An `ARG` or `ENV` declaration.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Variable {
  pub name: String,

  /// The effective value: the `ENV` value or the `ARG` default, inherited
  /// from the global `ARG` in `Build` scope (empty if there is none)
  pub value: String,

  /// The `ARG` default, if one was given
  pub default: Option<String>,
  pub position: Position,

  /// Index of the owning stage; `None` iff the scope is `Global`
  pub stage: Option<usize>,
  pub kind: VariableKind,
  pub scope: VariableScope
}

/// A single stage in a [multi-stage build].
///
/// A stage begins with (and includes) a `FROM` instruction and continues until
/// (but does *not* include) the next `FROM` instruction, if any.
///
/// Stages have an index and an optional name. Later `COPY --from=$index [...]`
/// instructions may copy files between unnamed build stages. The name, if
/// defined in this stage's `FROM` instruction, may be used as well.
///
/// Note that instructions in a Dockerfile before the first `FROM` are not
/// included in the first stage's list of instructions.
///
/// [multi-stage build]: https://docs.docker.com/develop/develop-images/multistage-build/
#[derive(Debug, Clone)]
pub struct Stage {
  /// The stage's `AS` name as written, if any.
  pub name: Option<String>,

  /// The stage index.
  pub index: usize,

  /// The base image as written in the `FROM` instruction (after global `ARG`
  /// substitution, if enabled).
  pub base_image: String,

  /// The index of an earlier stage this stage is built from, if any.
  pub base_stage: Option<usize>,

  /// The parsed base image, unless the stage is built from an earlier stage.
  pub image: Option<ImageRef>,

  /// An ordered list of instructions in this stage, starting with its `FROM`.
  pub instructions: Vec<Instruction>,
  pub range: Range,

  /// Every spelling `--from` may use to refer to this stage
  pub aliases: Vec<String>,
  pub variables: BTreeMap<String, Variable>,
  pub platform: Option<String>
}

impl Ord for Stage {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    self.index.cmp(&other.index)
  }
}

impl PartialOrd for Stage {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for Stage {
  fn eq(&self, other: &Self) -> bool {
    self.index == other.index
  }
}

impl Eq for Stage {}

impl Stage {
  /// The direct parent of this stage.
  pub fn parent(&self) -> StageParent<'_> {
    if let Some(index) = self.base_stage {
      StageParent::Stage(index)
    } else if self.base_image.eq_ignore_ascii_case("scratch") {
      StageParent::Scratch
    } else {
      match &self.image {
        Some(image) => StageParent::Image(image),
        None => StageParent::Scratch
      }
    }
  }

  /// Determines if `reference` (a `--from` value) refers to this stage.
  pub fn matches(&self, reference: &str) -> bool {
    let reference = reference.to_ascii_lowercase();
    self.aliases.iter().any(|a| *a == reference)
  }

  /// Finds the index, relative to this stage, of an ARG instruction defining
  /// the given name. Only instructions following the ARG in a particular
  /// stage will have the value in scope, even if it was defined globally.
  pub fn arg_index(&self, name: &str) -> Option<usize> {
    self.instructions
      .iter()
      .position(|ins| ins.kind == InstructionKind::Arg && ins.args.iter().any(|a| a == name))
  }
}
