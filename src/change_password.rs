//! Change a principal's password by scripting an admin tool's prompts.
//!
//! The tool (typically `kadmin`) is sent three lines:
//!
//! ```text
//! cpw <principal>
//! <password>
//! <password>
//! ```

use std::path::PathBuf;

use tracing::info;

use crate::env_policy::EnvPolicy;
use crate::error::{CpwError, Violation};
use crate::request::{ScriptLine, ScriptedCommand};
use crate::signals::SignalPolicy;
use crate::validate::ValidationPolicy;

/// Default administrative tool.
pub const DEFAULT_PROGRAM: &str = "/usr/bin/kadmin";

/// How to reach the admin tool and which principals it may touch.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    program: PathBuf,
    args: Vec<String>,
    env: EnvPolicy,
    user_prefixes: Vec<String>,
}

impl Default for PasswordChange {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl PasswordChange {
    /// Drive `program` with no arguments and an empty environment.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: EnvPolicy::Empty,
            user_prefixes: Vec::new(),
        }
    }

    /// Set the tool's arguments (after argv[0]).
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the tool's environment policy.
    pub fn env_policy(mut self, env: EnvPolicy) -> Self {
        self.env = env;
        self
    }

    /// Require usernames to start with one of `prefixes`. Empty means no rule.
    pub fn user_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Validate both inputs without building anything.
    ///
    /// # Errors
    ///
    /// - `UsernameConvention` if prefixes are configured and none matches
    /// - `TooLong` / `IllegalCharacter` from the identity or secret policy
    pub fn check(&self, user: &str, password: &str) -> Result<(), Violation> {
        if !self.user_prefixes.is_empty()
            && !self.user_prefixes.iter().any(|p| user.starts_with(p.as_str()))
        {
            return Err(Violation::UsernameConvention {
                prefixes: self.user_prefixes.clone(),
            });
        }

        ValidationPolicy::IDENTITY.validate(user)?;
        ValidationPolicy::SECRET.validate(password)?;
        Ok(())
    }

    /// Validate the inputs, then build the command with its three lines.
    pub fn script(&self, user: &str, password: &str) -> Result<ScriptedCommand, Violation> {
        self.check(user, password)?;

        Ok(ScriptedCommand::new(&self.program)
            .with_args(self.args.iter().cloned())
            .with_env(self.env.clone())
            .line(ScriptLine::plain(&format!("cpw {user}"))?)
            .line(ScriptLine::secret(password)?)
            .line(ScriptLine::secret(password)?))
    }

    /// Change the password and return the tool's exit code.
    ///
    /// The secret lines are built after validation and zeroed before this
    /// returns, on success and on every error.
    pub fn run(&self, user: &str, password: &str, signals: &SignalPolicy) -> Result<i32, CpwError> {
        let prepared = self.script(user, password)?.prepare()?;
        let code = prepared.execute(signals)?;
        info!(user, code, "password change finished");
        Ok(code)
    }
}
