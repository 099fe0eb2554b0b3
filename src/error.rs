//! Error types for cpw.
//!
//! This module defines two main error categories:
//! - [`Violation`]: Input rejected during validation or `prepare()` - no process was created
//! - [`ExecError`]: Failures while driving the child - OS-level errors and abnormal child exits
//!
//! Both are fatal to the operation that produced them. A child that exits
//! normally with a nonzero code is *not* an error: its code is returned as data.

use nix::errno::Errno;
use nix::sys::signal::Signal;
use thiserror::Error;

/// Which input category a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Principal / user name
    Identity,
    /// Password or other secret
    Secret,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Identity => write!(f, "username"),
            Field::Secret => write!(f, "password"),
        }
    }
}

/// Input rejected before any process is created.
///
/// All error messages are safe to log: offending characters and secret
/// contents are never included, only positions and lengths.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Violation {
    // Input string errors
    /// Input exceeds the policy's maximum length
    #[error("{field} too long: max {max} bytes, got {len}")]
    TooLong { field: Field, max: usize, len: usize },

    /// Input contains a control character or a character outside the allow-list
    #[error("illegal character in {field} at byte {position}")]
    IllegalCharacter { field: Field, position: usize },

    /// Username does not follow the configured naming convention
    #[error("username does not start with any of: {}", .prefixes.join(", "))]
    UsernameConvention { prefixes: Vec<String> },

    // Script errors
    /// A scripted line already contains a newline
    #[error("scripted line contains an embedded newline")]
    LineContainsNewline,

    /// A scripted line is longer than a single pipe write may carry
    #[error("scripted line too long: max {max} bytes, got {len}")]
    LineTooLong { max: usize, len: usize },

    /// A string destined for execve contains a NUL byte
    #[error("{what} contains a NUL byte")]
    NulByte { what: &'static str },

    /// The script has no lines to send
    #[error("no lines to send")]
    NoLines,

    // Binary errors
    /// Binary path is not absolute
    #[error("binary path must be absolute: {path}")]
    BinNotAbsolute { path: String },

    /// Binary does not exist
    #[error("binary not found: {path}")]
    BinNotFound { path: String },

    /// Failed to canonicalize binary path
    #[error("failed to canonicalize binary path {path}: {reason}")]
    BinCanonicalizeFailed { path: String, reason: String },

    /// Binary path points to a directory
    #[error("binary path is a directory: {path}")]
    BinIsDirectory { path: String },

    /// Binary is not a regular file
    #[error("binary is not a regular file: {path}")]
    BinNotRegularFile { path: String },

    /// Binary is not executable
    #[error("binary is not executable: {path}")]
    BinNotExecutable { path: String },
}

/// Failure while driving the child process.
///
/// None of these are retried.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Installing a signal disposition failed
    #[error("failed to install handler for {signal:?}")]
    SignalInstall {
        signal: Signal,
        #[source]
        source: Errno,
    },

    /// pipe(2) failed
    #[error("error creating pipe")]
    Pipe(#[source] Errno),

    /// fork(2) failed
    #[error("error forking")]
    Fork(#[source] Errno),

    /// close(2) on a pipe end failed
    #[error("error closing {end} end of pipe")]
    Close {
        end: &'static str,
        #[source]
        source: Errno,
    },

    /// write(2) to the pipe failed
    #[error("error writing line {line}")]
    Write {
        line: usize,
        #[source]
        source: Errno,
    },

    /// write(2) accepted fewer bytes than requested
    #[error("short write on line {line}: {written} of {expected} bytes")]
    ShortWrite {
        line: usize,
        written: usize,
        expected: usize,
    },

    /// waitpid(2) failed
    #[error("error waiting for child")]
    Wait(#[source] Errno),

    /// Child was terminated by a signal
    #[error("child process {pid} exited on signal {signal}")]
    ChildSignaled { pid: i32, signal: i32 },

    /// waitpid(2) returned something other than an exit or a signal death
    #[error("unexpected wait status from child: {status}")]
    UnexpectedWaitStatus { status: String },
}

/// Combined error type for the validate-and-execute flow.
#[derive(Debug, Error)]
pub enum CpwError {
    #[error(transparent)]
    Violation(#[from] Violation),

    #[error(transparent)]
    Exec(#[from] ExecError),
}
