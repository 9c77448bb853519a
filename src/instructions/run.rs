// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::diagnostic::DockerfileError;
use crate::dockerfile_parser::Instruction;
use crate::lexer::Word;

use super::{exec_or_shell, leading_flags};

/// Returns the stage named by a `from=` option of a `--mount` flag.
fn mount_source(mount: &str) -> Option<&str> {
  mount
    .split(',')
    .filter_map(|opt| opt.strip_prefix("from="))
    .next()
}

/// Parses a [`RUN` instruction][run].
///
/// An run command may be defined as either a single string (to be run in the
/// default shell), or a list of strings (to be run directly). Heredoc bodies
/// are attached when the instruction is built.
///
/// [run]: https://docs.docker.com/engine/reference/builder/#run
pub(crate) fn parse_run(words: &[Word], ins: &mut Instruction) -> Result<(), DockerfileError> {
  let (flags, rest) = leading_flags(words);

  for flag in flags {
    let value = flag.required_value()?;

    match flag.name.as_str() {
      "mount" => {
        if let Some(source) = mount_source(value) {
          ins.dependencies.push(source.to_string());
        }

        // several mounts are allowed
        let mounts = ins.flags.entry("mount".into()).or_insert_with(String::new);
        if !mounts.is_empty() {
          mounts.push(' ');
        }
        mounts.push_str(value);
      },
      "network" | "security" => {
        ins.flags.insert(flag.name.clone(), value.to_string());
      },
      other => {
        return Err(DockerfileError::instruction(
          flag.position.clone(),
          format!("unknown RUN flag: --{}", other)
        ));
      }
    }
  }

  exec_or_shell(rest, ins)
}
