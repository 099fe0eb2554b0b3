//! Classification of a reaped child.

use nix::sys::wait::WaitStatus;

use crate::error::ExecError;

/// How the child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    /// Normal exit with this code.
    Exited(i32),
    /// Killed by this signal number.
    Signaled(i32),
}

impl ProcessResult {
    /// Classify a `waitpid` result.
    ///
    /// # Errors
    ///
    /// `ExecError::UnexpectedWaitStatus` for anything other than an exit or a
    /// signal death (stopped, continued, ptrace events, still alive).
    pub fn from_wait_status(status: WaitStatus) -> Result<Self, ExecError> {
        match status {
            WaitStatus::Exited(_, code) => Ok(ProcessResult::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Ok(ProcessResult::Signaled(signal as i32)),
            other => Err(ExecError::UnexpectedWaitStatus {
                status: format!("{other:?}"),
            }),
        }
    }

    /// The exit code, treating signal death as fatal.
    ///
    /// # Errors
    ///
    /// `ExecError::ChildSignaled` if the child was killed by a signal.
    pub fn exit_code(self, pid: i32) -> Result<i32, ExecError> {
        match self {
            ProcessResult::Exited(code) => Ok(code),
            ProcessResult::Signaled(signal) => Err(ExecError::ChildSignaled { pid, signal }),
        }
    }
}
