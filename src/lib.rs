//! # cpw
//!
//! Scripted-subprocess driver for interactive administrative tools.
//!
//! `cpw` launches an external program, types a fixed sequence of lines into
//! its standard input through a pipe, and reports how it exited. Lines that
//! carry secrets live in zero-on-drop buffers and are erased as soon as they
//! have been written.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cpw::{ScriptLine, ScriptedCommand, SignalPolicy};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Once, before the first child is created
//! let signals = SignalPolicy::install()?;
//!
//! let command = ScriptedCommand::new("/usr/bin/kadmin")
//!     .with_args(["-k", "-t", "/etc/krb5/admin.keytab"])
//!     .line(ScriptLine::plain("cpw s_alice")?)
//!     .line(ScriptLine::secret("Secr3t+")?)
//!     .line(ScriptLine::secret("Secr3t+")?);
//!
//! let code = command.prepare()?.execute(&signals)?;
//! println!("kadmin exited with {code}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Principles
//!
//! - **Allow-list validation**: untrusted strings are checked before any line is built
//! - **No shell interpretation**: the program is exec'd by absolute path with an argv
//! - **Explicit environment**: the child gets an empty environment unless told otherwise
//! - **Fail closed**: every OS error and every signal death of the child is an error
//! - **Type-safe API**: only `PreparedScript` can fork, and only with a `SignalPolicy`
//!
//! ## Platform Support
//!
//! Unix only (Linux, the BSDs, macOS). On Apple targets, which lack
//! `pipe2`, the pipe is created with `pipe` and both ends are then marked
//! close-on-exec.

#[cfg(windows)]
compile_error!("cpw drives children through fork/exec and pipes and does not support Windows.");

mod binary;
mod change_password;
mod dump_guard;
mod env_policy;
mod error;
mod outcome;
mod prepared;
mod request;
mod secret;
mod signals;
mod validate;

// Public API
pub use binary::resolve_binary;
pub use change_password::{PasswordChange, DEFAULT_PROGRAM};
pub use dump_guard::{guard_core_dumps, DumpGuardStatus};
pub use env_policy::{EnvPolicy, ALWAYS_STRIP};
pub use error::{CpwError, ExecError, Field, Violation};
pub use outcome::ProcessResult;
pub use prepared::PreparedScript;
pub use request::{ScriptLine, ScriptedCommand, MAX_LINE_LEN};
pub use secret::SecretBuffer;
pub use signals::{Disposition, SignalPolicy, DISPOSITIONS};
pub use validate::{
    validate, ValidationPolicy, IDENTITY_CHARS, IDENTITY_MAX_LEN, SECRET_CHARS, SECRET_MAX_LEN,
};
