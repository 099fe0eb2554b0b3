//! Scripted command request.

use std::fmt;
use std::path::PathBuf;

use crate::env_policy::EnvPolicy;
use crate::error::Violation;
use crate::secret::SecretBuffer;

/// Longest line accepted, newline included.
///
/// Below `PIPE_BUF` on Linux, so each line reaches the pipe in one atomic
/// write, and large enough for a command naming a maximum-length principal.
pub const MAX_LINE_LEN: usize = 1024;

/// One newline-terminated line to type into the child's stdin.
///
/// Constructors append the newline and reject values that already contain
/// one (or a NUL byte), so a single value can never become two lines. Lines
/// are capped at [`MAX_LINE_LEN`] bytes.
pub enum ScriptLine {
    /// Non-sensitive line, e.g. a command.
    Plain(Vec<u8>),
    /// Secret-bearing line, zeroed on drop.
    Secret(SecretBuffer),
}

impl ScriptLine {
    /// Build a plain line from `text`, appending `\n`.
    pub fn plain(text: &str) -> Result<Self, Violation> {
        check_line(text)?;
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(b'\n');
        Ok(ScriptLine::Plain(bytes))
    }

    /// Build a secret line from `text`, appending `\n`.
    ///
    /// The buffer is sized up front so it never reallocates.
    pub fn secret(text: &str) -> Result<Self, Violation> {
        check_line(text)?;
        let mut buf = SecretBuffer::with_capacity(text.len() + 1);
        buf.push_str(text);
        buf.push_bytes(b"\n");
        Ok(ScriptLine::Secret(buf))
    }

    /// Exact bytes written to the pipe, newline included.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ScriptLine::Plain(bytes) => bytes,
            ScriptLine::Secret(buf) => buf.expose(),
        }
    }

    /// True for secret lines.
    pub fn is_secret(&self) -> bool {
        matches!(self, ScriptLine::Secret(_))
    }
}

impl fmt::Debug for ScriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptLine::Plain(bytes) => f
                .debug_tuple("Plain")
                .field(&String::from_utf8_lossy(bytes))
                .finish(),
            ScriptLine::Secret(buf) => f.debug_tuple("Secret").field(buf).finish(),
        }
    }
}

fn check_line(text: &str) -> Result<(), Violation> {
    let len = text.len() + 1;
    if len > MAX_LINE_LEN {
        return Err(Violation::LineTooLong {
            max: MAX_LINE_LEN,
            len,
        });
    }
    if text.contains('\n') {
        return Err(Violation::LineContainsNewline);
    }
    if text.contains('\0') {
        return Err(Violation::NulByte {
            what: "scripted line",
        });
    }
    Ok(())
}

/// A program to run and the lines to feed it.
///
/// Validated and converted by [`ScriptedCommand::prepare`] before execution.
#[derive(Debug)]
pub struct ScriptedCommand {
    /// Absolute path to the binary to execute.
    ///
    /// Will be canonicalized during preparation.
    pub bin: PathBuf,

    /// Arguments after argv[0]. argv[0] is the binary's file name.
    pub argv: Vec<String>,

    /// Environment for the child.
    ///
    /// Default is empty.
    pub env: EnvPolicy,

    /// Lines sent in order.
    pub lines: Vec<ScriptLine>,
}

impl ScriptedCommand {
    /// Create a new command with no arguments, environment, or lines.
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            argv: Vec::new(),
            env: EnvPolicy::default(),
            lines: Vec::new(),
        }
    }

    /// Set the arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the environment policy.
    pub fn with_env(mut self, env: EnvPolicy) -> Self {
        self.env = env;
        self
    }

    /// Append a line.
    pub fn line(mut self, line: ScriptLine) -> Self {
        self.lines.push(line);
        self
    }
}
