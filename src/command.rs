//! Typed command contracts.
//!
//! Every external program the launcher touches (pre-flight steps and the
//! server itself) is described by a struct implementing [`CommandArgs`].
//! The struct is the single source of truth for the argument vector, so a
//! flag typo is a compile error rather than a broken container.

use std::fmt;
use std::process::Command;

/// Trait for typed external command arguments.
///
/// # Contract
///
/// - `program()`: executable name or path, resolved through `PATH` at spawn time.
/// - `to_cli_args()`: arguments exactly as the program expects them.
/// - `get_env_vars()`: extra environment for the child, on top of the inherited one.
/// - `label()`: short human name used in logs and errors.
pub trait CommandArgs {
    /// Executable to run.
    fn program(&self) -> &str;

    /// Convert struct fields to CLI arguments.
    fn to_cli_args(&self) -> Vec<String>;

    /// Extra environment variables for the child.
    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![]
    }

    /// Short name for logs.
    fn label(&self) -> &str;

    /// Flatten into a [`CommandSpec`].
    fn to_spec(&self) -> CommandSpec {
        CommandSpec {
            label: self.label().to_string(),
            program: self.program().to_string(),
            args: self.to_cli_args(),
            env: self.get_env_vars(),
        }
    }
}

/// A fully resolved command line, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Build a `std::process::Command` with stdio inherited.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<String> = self.argv().into_iter().map(shell_quote).collect();
        write!(f, "{}", words.join(" "))
    }
}

/// Quote a word for display so the logged line can be pasted into a shell.
fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
