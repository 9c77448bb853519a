// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use snafu::ResultExt;

use crate::analyzer::{detect_stages, detect_variables, stage_for_line, StageInfo, VariableInfo};
use crate::diagnostic::{DockerfileError, ErrorCode, ErrorCollector, WarnLevel, Warning};
use crate::error::*;
use crate::image::ImageRef;
use crate::instructions::parse_instruction;
use crate::lexer::{InstructionTokens, Lexer};
use crate::position::{Position, Range};
use crate::scanner::{HeredocOpener, Scanner, DEFAULT_ESCAPE};
use crate::stage::{Stage, Variable, VariableKind, VariableScope};
use crate::token::{InstructionKind, TokenType};

lazy_static! {
  static ref DIRECTIVE: Regex = Regex::new(
    r"^#\s*([A-Za-z][A-Za-z0-9_-]*)\s*=\s*(.*?)\s*$"
  ).unwrap();
}

/// Parser directives recognized at the top of a Dockerfile.
const DIRECTIVES: &[&str] = &["escape", "syntax", "check"];

/// A heredoc body attached to an instruction, e.g. `RUN <<EOF`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Heredoc {
  /// The opener's identifier, without `<<`, `-` or quotes
  pub identifier: String,

  /// The terminator line's text
  pub delimiter: String,

  /// The body, one `\n` terminated entry per line, tabs already stripped
  /// for `<<-` openers
  pub content: String,

  /// From the opener to the end of the terminator line
  pub range: Range,
  pub strip_leading_tabs: bool
}

/// A single parsed Dockerfile instruction.
///
/// `args` are normalized per instruction: exec form arguments are decoded,
/// shell form is kept as one string, and `LABEL`/`ENV` pairs are stored as
/// unquoted `key=value` strings. Options such as `--from` or `AS name` are
/// stored in `flags`.
///
/// # Example
///
/// ```
/// use dockerfile_analyzer::{InstructionKind, ParsedDockerfile};
///
/// let dockerfile = ParsedDockerfile::parse("FROM alpine:3.11 AS build\n");
/// let from = &dockerfile.stages[0].instructions[0];
///
/// assert_eq!(from.kind, InstructionKind::From);
/// assert_eq!(from.args, vec!["alpine:3.11"]);
/// assert_eq!(from.flag("stage"), Some("build"));
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Instruction {
  pub kind: InstructionKind,

  /// The keyword as written
  pub command: String,
  pub args: Vec<String>,
  pub flags: BTreeMap<String, String>,
  pub range: Range,

  /// The exact source text of the logical line, including continuations and
  /// heredoc bodies
  pub raw: String,

  /// Comment lines directly above the instruction, without their `#`
  pub comment: Option<String>,
  pub json_form: bool,

  /// Index of the owning stage, `None` before the first `FROM`
  pub stage: Option<usize>,
  pub heredocs: Vec<Heredoc>,

  /// Stages or images this instruction copies or mounts from
  pub dependencies: Vec<String>
}

impl Instruction {
  /// Builds an instruction from a lexed line with empty arguments; the
  /// per-instruction parsers fill in the rest.
  pub(crate) fn from_tokens(
    line: &InstructionTokens,
    source: &str,
    stage: Option<usize>
  ) -> Instruction {
    let start = line.instruction.position();
    let end = line.raw.iter()
      .rev()
      .find(|t| !matches!(t.token_type, TokenType::Newline | TokenType::Eof))
      .map(|t| t.end_position())
      .unwrap_or_else(|| line.instruction.end_position());

    let raw = source.get(start.offset..end.offset).unwrap_or("").to_string();

    let comments: Vec<&str> = line.comments.iter()
      .map(|t| t.value.trim_start_matches('#').trim())
      .collect();
    let comment = if comments.is_empty() {
      None
    } else {
      Some(comments.join("\n"))
    };

    let of_type = move |tt: TokenType| line.raw.iter().filter(move |t| t.token_type == tt);
    let heredocs = of_type(TokenType::HeredocStart)
      .zip(of_type(TokenType::HeredocContent))
      .zip(of_type(TokenType::HeredocEnd))
      .map(|((opener, content), end)| {
        let parsed = HeredocOpener::parse(&opener.raw);

        Heredoc {
          identifier: parsed.as_ref()
            .map(|p| p.identifier.clone())
            .unwrap_or_else(|| end.value.clone()),
          delimiter: end.value.clone(),
          content: content.value.clone(),
          range: Range::new(opener.position(), end.end_position()),
          strip_leading_tabs: parsed.map(|p| p.strip_tabs).unwrap_or(false)
        }
      })
      .collect();

    Instruction {
      kind: line.kind(),
      command: line.command().to_string(),
      args: Vec::new(),
      flags: BTreeMap::new(),
      range: Range::new(start, end),
      raw,
      comment,
      json_form: line.json_form,
      stage,
      heredocs,
      dependencies: Vec::new()
    }
  }

  /// The first heredoc of this instruction, if any.
  pub fn heredoc(&self) -> Option<&Heredoc> {
    self.heredocs.first()
  }

  pub fn flag(&self, name: &str) -> Option<&str> {
    self.flags.get(name).map(String::as_str)
  }
}

/// Options controlling how a Dockerfile is parsed and validated.
///
/// ```
/// use dockerfile_analyzer::ParseOptions;
///
/// let options = ParseOptions::default()
///   .with_env_var_expansion(true)
///   .with_target_stage("release");
///
/// assert!(options.validate_instructions);
/// assert_eq!(options.target_stage.as_deref(), Some("release"));
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseOptions {
  /// Attach preceding comment lines to instructions
  pub include_comments: bool,

  /// Run document-level validation after parsing
  pub validate_instructions: bool,

  /// Whether `parse_file` may read a symlinked Dockerfile
  pub follow_symlinks: bool,

  /// Substitute global `ARG` defaults into `FROM` images
  pub allow_env_var_expansion: bool,

  /// Platform for stages without a `--platform` flag
  pub default_platform: Option<String>,

  /// Build context path; `ADD`/`COPY` sources may not escape it
  pub build_context: Option<String>,

  /// A stage that must exist
  pub target_stage: Option<String>
}

impl Default for ParseOptions {
  fn default() -> Self {
    ParseOptions {
      include_comments: true,
      validate_instructions: true,
      follow_symlinks: true,
      allow_env_var_expansion: false,
      default_platform: None,
      build_context: None,
      target_stage: None
    }
  }
}

impl ParseOptions {
  pub fn with_comments(mut self, include_comments: bool) -> Self {
    self.include_comments = include_comments;
    self
  }

  pub fn with_validation(mut self, validate_instructions: bool) -> Self {
    self.validate_instructions = validate_instructions;
    self
  }

  pub fn with_follow_symlinks(mut self, follow_symlinks: bool) -> Self {
    self.follow_symlinks = follow_symlinks;
    self
  }

  pub fn with_env_var_expansion(mut self, allow_env_var_expansion: bool) -> Self {
    self.allow_env_var_expansion = allow_env_var_expansion;
    self
  }

  pub fn with_default_platform<S: Into<String>>(mut self, platform: S) -> Self {
    self.default_platform = Some(platform.into());
    self
  }

  pub fn with_build_context<S: Into<String>>(mut self, build_context: S) -> Self {
    self.build_context = Some(build_context.into());
    self
  }

  pub fn with_target_stage<S: Into<String>>(mut self, target_stage: S) -> Self {
    self.target_stage = Some(target_stage.into());
    self
  }
}

/// Summary information about a parsed Dockerfile.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Metadata {
  pub filename: Option<String>,

  /// Input size in bytes
  pub size: usize,

  /// External base images, in stage order
  pub base_images: Vec<String>,
  pub stage_count: usize,

  /// Parser directives such as `# escape=` found at the top of the file
  pub directives: BTreeMap<String, String>,

  /// Names of every variable referenced anywhere in the file
  pub referenced_variables: BTreeSet<String>
}

/// A `(command, args)` view of an instruction.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FlatInstruction {
  pub command: String,
  pub args: Vec<String>
}

/// A parsed Dockerfile.
///
/// Parsing never fails outright: problems are collected in `errors` and
/// `warnings` next to whatever could be parsed. Use `FromStr` to treat any
/// error as fatal.
///
/// # Example
/// ```
/// use dockerfile_analyzer::ParsedDockerfile;
///
/// let s = r#"
///   FROM alpine:3.11 AS build
///   RUN echo "hello world" > /hello
///
///   FROM scratch
///   COPY --from=build /hello /hello
/// "#;
///
/// let dockerfile = ParsedDockerfile::parse(s);
/// assert!(dockerfile.errors.is_empty());
/// assert_eq!(dockerfile.stages.len(), 2);
/// assert_eq!(dockerfile.stage("build").map(|s| s.index), Some(0));
///
/// assert_eq!(
///   dockerfile.instructions().count(),
///   s.parse::<ParsedDockerfile>().unwrap().instructions().count()
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ParsedDockerfile {
  /// Instructions before the first `FROM`
  pub preamble: Vec<Instruction>,
  pub stages: Vec<Stage>,

  /// `ARG`s declared before the first `FROM`
  pub global_args: BTreeMap<String, Variable>,

  /// `ENV`s declared before the first `FROM`
  pub global_env: BTreeMap<String, Variable>,

  /// The raw content of the Dockerfile
  pub raw: String,
  pub metadata: Metadata,
  pub errors: Vec<DockerfileError>,
  pub warnings: Vec<Warning>,
  pub escape_char: char,
  pub parse_options: ParseOptions
}

/// Reads parser directives from the leading comment lines.
fn read_directives(input: &str) -> BTreeMap<String, String> {
  let mut directives = BTreeMap::new();

  for line in input.lines() {
    let caps = match DIRECTIVE.captures(line.trim()) {
      Some(caps) => caps,
      None => break
    };

    let name = caps[1].to_ascii_lowercase();
    if !DIRECTIVES.contains(&name.as_str()) || directives.contains_key(&name) {
      break;
    }

    directives.insert(name, caps[2].to_string());
  }

  directives
}

/// Determines if a relative source path leaves the directory it is
/// resolved against.
fn escapes_context(path: &str) -> bool {
  let mut depth: i64 = 0;

  for component in path.split('/') {
    match component {
      "" | "." => (),
      ".." => depth -= 1,
      _ => depth += 1
    }

    if depth < 0 {
      return true;
    }
  }

  false
}

fn stage_label(stage: &Stage) -> String {
  stage.name.clone().unwrap_or_else(|| stage.index.to_string())
}

fn to_variable(decl: &VariableInfo, global_args: &BTreeMap<String, Variable>) -> Variable {
  let default = match decl.kind {
    VariableKind::Arg => decl.value.clone(),
    VariableKind::Env => None
  };

  let inherited = decl.kind == VariableKind::Arg
    && decl.value.is_none()
    && decl.stage.is_some()
    && global_args.contains_key(&decl.name);

  let scope = if decl.stage.is_none() {
    VariableScope::Global
  } else if inherited {
    VariableScope::Build
  } else {
    VariableScope::Stage
  };

  let value = if inherited {
    global_args.get(&decl.name).map(|v| v.value.clone()).unwrap_or_default()
  } else {
    decl.value.clone().unwrap_or_default()
  };

  Variable {
    name: decl.name.clone(),
    value,
    default,
    position: decl.position.clone(),
    stage: decl.stage,
    kind: decl.kind,
    scope
  }
}

/// Builds the empty stages found by the analyzer, substituting global `ARG`
/// defaults into base images when enabled.
fn build_stages(
  infos: &[StageInfo],
  lines: &[InstructionTokens],
  global_args: &BTreeMap<String, Variable>,
  options: &ParseOptions
) -> Vec<Stage> {
  let vars: HashMap<&str, &str> = global_args.values()
    .filter(|v| v.default.is_some())
    .map(|v| (v.name.as_str(), v.value.as_str()))
    .collect();

  let mut stages: Vec<Stage> = Vec::new();

  for info in infos {
    let mut base_image = info.base_image.clone();
    if options.allow_env_var_expansion && base_image.contains('$') {
      if let Some((resolved, used)) = ImageRef::parse(&base_image).resolve_vars(&vars) {
        debug!("resolved base image {} -> {} using {:?}", base_image, resolved, used);
        base_image = resolved.to_string();
      }
    }

    let base_stage = stages.iter()
      .find(|s| s.name.as_ref().map(|n| n.eq_ignore_ascii_case(&base_image)).unwrap_or(false))
      .map(|s| s.index);

    let image = if base_stage.is_some()
      || base_image.is_empty()
      || base_image.eq_ignore_ascii_case("scratch")
    {
      None
    } else {
      Some(ImageRef::parse(&base_image))
    };

    let start = lines.iter()
      .find(|l| l.kind() == InstructionKind::From && l.line() == info.start_line)
      .map(|l| l.instruction.position())
      .unwrap_or_else(|| Position::new(info.start_line, 1, 0));

    let mut aliases = vec![info.index.to_string()];
    if let Some(name) = &info.name {
      aliases.push(name.to_ascii_lowercase());
    }

    stages.push(Stage {
      name: info.name.clone(),
      index: info.index,
      base_image,
      base_stage,
      image,
      instructions: Vec::new(),
      range: Range::new(start.clone(), start),
      aliases,
      variables: BTreeMap::new(),
      platform: options.default_platform.clone()
    });
  }

  stages
}

fn parse_dockerfile(input: &str, options: ParseOptions, filename: Option<String>) -> ParsedDockerfile {
  let directives = read_directives(input);
  let mut collector = ErrorCollector::new();

  let escape_char = match directives.get("escape").map(String::as_str) {
    None => DEFAULT_ESCAPE,
    Some("\\") => '\\',
    Some("`") => '`',
    Some(other) => {
      collector.add(DockerfileError::new(
        ErrorCode::ValidationError,
        Position::new(1, 1, 0),
        format!("invalid escape directive: {:?}, must be \\ or `", other)
      ));
      DEFAULT_ESCAPE
    }
  };

  let mut lexer = Lexer::new(Scanner::with_escape(input, escape_char));
  let (lines, lex_errors) = lexer.process_all_instructions();
  collector.extend(lex_errors);
  for warning in lexer.take_warnings() {
    collector.warn(warning);
  }

  let referenced_variables = lexer.variables().clone();

  let infos = detect_stages(&lines);
  let declarations = detect_variables(&lines, &infos);

  let mut global_args = BTreeMap::new();
  let mut global_env = BTreeMap::new();
  for decl in declarations.iter().filter(|d| d.stage.is_none()) {
    let variable = to_variable(decl, &global_args);
    match decl.kind {
      VariableKind::Arg => global_args.insert(decl.name.clone(), variable),
      VariableKind::Env => global_env.insert(decl.name.clone(), variable)
    };
  }

  let mut stages = build_stages(&infos, &lines, &global_args, &options);
  for decl in &declarations {
    if let Some(stage) = decl.stage.and_then(|i| stages.get_mut(i)) {
      stage.variables.insert(decl.name.clone(), to_variable(decl, &global_args));
    }
  }

  let mut preamble = Vec::new();
  for line in &lines {
    // already reported by the lexer
    if line.failed {
      continue;
    }

    let index = stage_for_line(&infos, line.line());
    collector.enter_stage(index.and_then(|i| stages.get(i)).map(stage_label));

    let mut ins = match parse_instruction(line, input, index, &mut collector) {
      Ok(ins) => ins,
      Err(e) => {
        collector.add(e);
        continue;
      }
    };

    if !options.include_comments {
      ins.comment = None;
    }

    match index.and_then(|i| stages.get_mut(i)) {
      Some(stage) => {
        if ins.kind == InstructionKind::From {
          if let Some(platform) = ins.flag("platform") {
            stage.platform = Some(platform.to_string());
          }
        }

        stage.range.end = ins.range.end.clone();
        stage.instructions.push(ins);
      },
      None => preamble.push(ins)
    }
  }

  collector.enter_stage(None);

  let mut dockerfile = ParsedDockerfile {
    preamble,
    stages,
    global_args,
    global_env,
    raw: input.to_string(),
    metadata: Metadata {
      filename,
      size: input.len(),
      base_images: Vec::new(),
      stage_count: 0,
      directives,
      referenced_variables
    },
    errors: Vec::new(),
    warnings: Vec::new(),
    escape_char,
    parse_options: options
  };

  dockerfile.metadata.stage_count = dockerfile.stages.len();
  dockerfile.metadata.base_images = dockerfile.stages.iter()
    .filter_map(|s| s.image.as_ref())
    .map(|image| image.to_string())
    .collect();

  if dockerfile.parse_options.validate_instructions {
    dockerfile.validate(&mut collector);
  }

  let (errors, warnings) = collector.into_parts();
  debug!(
    "parsed {} stages, {} instructions, {} errors, {} warnings",
    dockerfile.stages.len(), dockerfile.instructions().count(), errors.len(), warnings.len()
  );

  dockerfile.errors = errors;
  dockerfile.warnings = warnings;
  dockerfile
}

impl ParsedDockerfile {
  /// Parses a Dockerfile from a string with default options.
  pub fn parse(input: &str) -> ParsedDockerfile {
    ParsedDockerfile::parse_with_options(input, ParseOptions::default())
  }

  pub fn parse_with_options(input: &str, options: ParseOptions) -> ParsedDockerfile {
    parse_dockerfile(input, options, None)
  }

  /// Parses a Dockerfile from a reader.
  pub fn from_reader<R>(reader: R) -> Result<ParsedDockerfile>
  where
    R: Read
  {
    let mut buf = String::new();
    let mut buf_reader = BufReader::new(reader);
    buf_reader.read_to_string(&mut buf).context(ReadError)?;

    Ok(ParsedDockerfile::parse(&buf))
  }

  /// Reads and parses a Dockerfile from disk. Diagnostic positions carry the
  /// file's path.
  pub fn parse_file<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<ParsedDockerfile> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let metadata = fs::symlink_metadata(path).context(ReadError)?;
    if metadata.file_type().is_symlink() && !options.follow_symlinks {
      return SymlinkError { path: display }.fail();
    }

    let input = fs::read_to_string(path).context(ReadError)?;
    let mut dockerfile = parse_dockerfile(&input, options, Some(display.clone()));

    for error in &mut dockerfile.errors {
      error.position.file_path = Some(display.clone());
    }

    for warning in &mut dockerfile.warnings {
      warning.position.file_path = Some(display.clone());
    }

    Ok(dockerfile)
  }

  /// Finds a stage by index or (case-insensitive) name.
  pub fn stage(&self, reference: &str) -> Option<&Stage> {
    self.stages.iter().find(|s| s.matches(reference))
  }

  /// Iterates over every instruction: the preamble, then each stage in
  /// order.
  pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
    self.preamble.iter().chain(self.stages.iter().flat_map(|s| s.instructions.iter()))
  }

  /// Returns every instruction as a plain `(command, args)` pair.
  pub fn flatten(&self) -> Vec<FlatInstruction> {
    self.instructions()
      .map(|ins| FlatInstruction {
        command: ins.command.clone(),
        args: ins.args.clone()
      })
      .collect()
  }

  /// Renders `flatten()` as one `COMMAND arg1 arg2` line per instruction.
  pub fn format_flat(&self) -> String {
    let mut out = String::new();

    for flat in self.flatten() {
      out.push_str(&flat.command);
      for arg in &flat.args {
        out.push(' ');
        out.push_str(arg);
      }
      out.push('\n');
    }

    out
  }

  fn validate(&self, collector: &mut ErrorCollector) {
    if self.raw.trim().is_empty() {
      collector.add(DockerfileError::new(
        ErrorCode::ValidationError,
        Position::new(1, 1, 0),
        "Dockerfile is empty"
      ));
      return;
    }

    if self.stages.is_empty() {
      collector.add(DockerfileError::new(
        ErrorCode::ValidationError,
        Position::new(1, 1, 0),
        "Dockerfile must contain at least one FROM instruction"
      ));
    }

    for ins in self.preamble.iter().filter(|i| i.kind != InstructionKind::Arg) {
      collector.add(DockerfileError::new(
        ErrorCode::ValidationError,
        ins.range.start.clone(),
        format!("{} is not allowed before the first FROM, only ARG is", ins.command)
      ).with_snippet(ins.raw.lines().next().unwrap_or("")));
    }

    let mut names = HashSet::new();
    for stage in &self.stages {
      collector.enter_stage(Some(stage_label(stage)));

      if let Some(name) = &stage.name {
        if !names.insert(name.to_ascii_lowercase()) {
          collector.add(DockerfileError::new(
            ErrorCode::StageError,
            stage.range.start.clone(),
            format!("duplicate stage name: {}", name)
          ));
        }
      }

      self.validate_stage(stage, collector);
    }

    collector.enter_stage(None);

    if let Some(target) = &self.parse_options.target_stage {
      if self.stage(target).is_none() {
        collector.add(DockerfileError::new(
          ErrorCode::ReferenceError,
          Position::new(1, 1, 0),
          format!("target stage not found: {}", target)
        ).with_details(format!(
          "available stages: {}",
          self.stages.iter().map(stage_label).collect::<Vec<_>>().join(", ")
        )));
      }
    }
  }

  fn validate_stage(&self, stage: &Stage, collector: &mut ErrorCollector) {
    if let Some(image) = &stage.image {
      if image.is_implicit_latest() && !stage.base_image.contains('$') {
        collector.warn(Warning::new(
          WarnLevel::Medium,
          stage.range.start.clone(),
          format!("base image {} has no tag, latest is implied", image),
          stage.base_image.as_str()
        ));
      }
    }

    let mut seen = HashSet::new();
    for ins in &stage.instructions {
      if matches!(ins.kind, InstructionKind::Cmd | InstructionKind::Entrypoint)
        && !seen.insert(ins.kind)
      {
        collector.warn(Warning::new(
          WarnLevel::Low,
          ins.range.start.clone(),
          format!("multiple {} instructions in stage, only the last takes effect", ins.command),
          ins.raw.lines().next().unwrap_or("")
        ));
      }

      for dep in ins.dependencies.iter().filter(|d| !d.contains('$')) {
        let target = self.stage(dep);
        let numeric = dep.chars().all(|c| c.is_ascii_digit());

        let invalid = match target {
          Some(target) => target.index >= stage.index,
          None => numeric
        };

        if invalid {
          collector.add(DockerfileError::new(
            ErrorCode::ReferenceError,
            ins.range.start.clone(),
            format!("{} refers to stage {} which is not defined before this stage", ins.command, dep)
          ).with_snippet(ins.raw.lines().next().unwrap_or("")));
        }
      }

      if let Some(context) = &self.parse_options.build_context {
        self.validate_sources(ins, context, collector);
      }
    }
  }

  fn validate_sources(&self, ins: &Instruction, context: &str, collector: &mut ErrorCollector) {
    if !matches!(ins.kind, InstructionKind::Add | InstructionKind::Copy) || ins.flag("from").is_some() {
      return;
    }

    let sources = &ins.args[..ins.args.len().saturating_sub(1)];
    for source in sources {
      if source.starts_with("<<") || source.contains("://") {
        continue;
      }

      if escapes_context(source) {
        collector.add(DockerfileError::new(
          ErrorCode::ValidationError,
          ins.range.start.clone(),
          format!("{} source {} is outside the build context {}", ins.command, source, context)
        ));
      }
    }
  }
}

impl FromStr for ParsedDockerfile {
  type Err = Error;

  /// Parses with default options, failing if any error was reported.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let dockerfile = ParsedDockerfile::parse(s);

    if dockerfile.errors.is_empty() {
      Ok(dockerfile)
    } else {
      InvalidDockerfile { errors: dockerfile.errors }.fail()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  #[test]
  fn directives() {
    let directives = read_directives(indoc!(r#"
      # syntax=docker/dockerfile:1
      #escape = `
      # not a directive
      # check=skip=all
    "#));

    assert_eq!(directives.get("syntax").map(String::as_str), Some("docker/dockerfile:1"));
    assert_eq!(directives.get("escape").map(String::as_str), Some("`"));
    assert_eq!(directives.get("check"), None);
  }

  #[test]
  fn escape_directive() {
    let dockerfile = ParsedDockerfile::parse(indoc!(r#"
      # escape=`
      FROM mcr.microsoft.com/windows/servercore:ltsc2019
      RUN dir c:\ `
        && echo done
    "#));

    assert!(dockerfile.errors.is_empty(), "{:?}", dockerfile.errors);
    assert_eq!(dockerfile.escape_char, '`');
    assert_eq!(dockerfile.stages[0].instructions[1].args, vec![r"dir c:\ && echo done"]);
  }

  #[test]
  fn context_escape() {
    assert!(!escapes_context("src/main.rs"));
    assert!(!escapes_context("./a/../b"));
    assert!(!escapes_context("/etc/passwd"));
    assert!(escapes_context("../secret"));
    assert!(escapes_context("a/../../b"));
  }

  #[test]
  fn instruction_metadata() {
    let dockerfile = ParsedDockerfile::parse(indoc!(r#"
      FROM alpine:3.12

      # install curl
      # and nothing else
      RUN apk add curl \
        && rm -rf /var/cache/apk
    "#));

    let run = &dockerfile.stages[0].instructions[1];
    assert_eq!(run.comment.as_deref(), Some("install curl\nand nothing else"));
    assert_eq!(run.stage, Some(0));
    assert_eq!(run.range.start, Position::new(5, 1, 52));
    assert_eq!(run.range.end.line, 6);
    assert_eq!(run.raw, "RUN apk add curl \\\n  && rm -rf /var/cache/apk");

    let dockerfile = ParsedDockerfile::parse_with_options(
      &dockerfile.raw,
      ParseOptions::default().with_comments(false)
    );
    assert_eq!(dockerfile.stages[0].instructions[1].comment, None);
  }

  #[test]
  fn multiple_heredocs() {
    let dockerfile = ParsedDockerfile::parse(
      "FROM alpine:3.12\nCOPY <<a <<-\"b\" /dst/\none\na\n\ttwo\n\tb\n"
    );

    assert!(dockerfile.errors.is_empty(), "{:?}", dockerfile.errors);

    let copy = &dockerfile.stages[0].instructions[1];
    assert_eq!(copy.heredocs.len(), 2);
    assert_eq!(copy.heredocs[0].content, "one\n");
    assert_eq!(copy.heredocs[1].identifier, "b");
    assert_eq!(copy.heredocs[1].content, "two\n");
    assert!(copy.heredocs[1].strip_leading_tabs);
    assert_eq!(copy.args, vec!["<<a", "<<-\"b\"", "/dst/"]);
  }
}
