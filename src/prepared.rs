//! Prepared script ready for execution.
//!
//! This module contains `PreparedScript`, which can only be created by
//! `ScriptedCommand::prepare()`, and the pipeline that runs it:
//!
//! ```text
//! parent                                 child
//! ------                                 -----
//! pipe2(O_CLOEXEC) -> (r, w)
//! fork() ------------------------------> dup2(r, 0)
//! close(r)                               close(w), close(r)
//! write(w, line) for each line           execve(program, argv, envp)
//! close(w)           -- EOF on stdin -->   ...reads lines...
//! waitpid(child)     <-- exit/signal --    exits
//! ```
//!
//! The parent never touches its own stdout; lines go straight to the pipe.

use std::ffi::{CStr, CString};
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd};
use std::os::raw::c_char;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::sys::wait::waitpid;
use nix::unistd::{close, dup2, fork, write, ForkResult, Pid};
use tracing::{debug, info};

use crate::binary::resolve_binary;
use crate::error::{ExecError, Violation};
use crate::outcome::ProcessResult;
use crate::request::{ScriptLine, ScriptedCommand};
use crate::signals::{write_diagnostic, SignalPolicy};

impl ScriptedCommand {
    /// Validate the command and convert it for execve.
    ///
    /// Everything the child needs is built here, before fork, so the child
    /// branch never allocates.
    ///
    /// # Errors
    ///
    /// - Any binary violation from [`resolve_binary`]
    /// - `NulByte` if an argument or environment entry contains NUL
    /// - `NoLines` if there is nothing to send
    pub fn prepare(self) -> Result<PreparedScript, Violation> {
        if self.lines.is_empty() {
            return Err(Violation::NoLines);
        }

        let bin = resolve_binary(&self.bin)?;
        let program = path_to_cstring(&bin)?;

        let mut argv = Vec::with_capacity(self.argv.len() + 1);
        argv.push(argv0(&self.bin)?);
        for arg in &self.argv {
            argv.push(CString::new(arg.as_bytes()).map_err(|_| Violation::NulByte {
                what: "argument",
            })?);
        }

        let env = self
            .env
            .apply()
            .into_iter()
            .map(|(k, v)| {
                CString::new(format!("{k}={v}")).map_err(|_| Violation::NulByte {
                    what: "environment variable",
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PreparedScript {
            bin,
            program,
            argv,
            env,
            lines: self.lines,
        })
    }
}

/// argv[0] is the file name the caller asked for, as a shell would set it.
fn argv0(bin: &Path) -> Result<CString, Violation> {
    let name = bin.file_name().unwrap_or(bin.as_os_str());
    path_to_cstring(Path::new(name))
}

fn path_to_cstring(path: &Path) -> Result<CString, Violation> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(path.as_os_str().as_bytes()).map_err(|_| Violation::NulByte {
        what: "binary path",
    })
}

/// A validated script ready to run.
///
/// This type cannot be constructed outside of `cpw`.
/// The only way to create it is via `ScriptedCommand::prepare()`.
#[derive(Debug)]
pub struct PreparedScript {
    bin: PathBuf,
    program: CString,
    argv: Vec<CString>,
    env: Vec<CString>,
    lines: Vec<ScriptLine>,
}

impl PreparedScript {
    /// Run the program, send every line, and wait for it to exit.
    ///
    /// Lines are erased as soon as the last one is written, before waiting.
    /// Not safe to call concurrently with anything else that forks and
    /// depends on different signal dispositions.
    ///
    /// # Returns
    ///
    /// The child's exit code. A nonzero code is data, not an error.
    ///
    /// # Errors
    ///
    /// - `ExecError::Pipe`, `Fork` if the child could not be created
    /// - `ExecError::Close`, `Write`, `ShortWrite` if the lines could not be delivered
    /// - `ExecError::Wait` if the child could not be reaped
    /// - `ExecError::ChildSignaled` if the child was killed by a signal
    /// - `ExecError::UnexpectedWaitStatus` for any other wait status
    pub fn execute(mut self, _signals: &SignalPolicy) -> Result<i32, ExecError> {
        let (read_end, write_end) = cloexec_pipe().map_err(ExecError::Pipe)?;
        debug!(
            read = read_end.as_raw_fd(),
            write = write_end.as_raw_fd(),
            "created pipe"
        );

        let argv_ptrs = null_terminated(&self.argv);
        let env_ptrs = null_terminated(&self.env);

        // SAFETY: the child only calls async-signal-safe functions (dup2,
        // close, fcntl, execve, write, _exit) on data prepared before fork.
        match unsafe { fork() }.map_err(ExecError::Fork)? {
            ForkResult::Child => {
                exec_child(read_end, write_end, &self.program, &argv_ptrs, &env_ptrs)
            }
            ForkResult::Parent { child } => {
                info!(
                    pid = %child,
                    program = %self.bin.display(),
                    lines = self.lines.len(),
                    "spawned child"
                );

                let lines = std::mem::take(&mut self.lines);
                if let Err(err) = transmit(read_end, write_end, lines) {
                    // The write end is closed by now, so the child sees EOF
                    let reaped = waitpid(child, None);
                    debug!(pid = %child, error = %err, ?reaped, "reaped child after failed delivery");
                    return Err(err);
                }

                wait_child(child)
            }
        }
    }

    /// Get argv, including argv[0].
    pub fn argv(&self) -> &[CString] {
        &self.argv
    }

    /// Get the `KEY=VALUE` environment entries.
    pub fn env(&self) -> &[CString] {
        &self.env
    }

    /// Number of lines that will be sent.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// A pipe whose ends are both close-on-exec.
#[cfg(not(target_vendor = "apple"))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
}

/// A pipe whose ends are both close-on-exec.
///
/// Apple has no `pipe2`, so the flag is set after creation.
#[cfg(target_vendor = "apple")]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    let (read_end, write_end) = nix::unistd::pipe()?;
    for fd in [&read_end, &write_end] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read_end, write_end))
}

fn null_terminated(strings: &[CString]) -> Vec<*const c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect()
}

/// Child side: wire the pipe onto stdin and become the target program.
///
/// Never returns. Every failure exits with status 1 so the child can never
/// fall through into the parent's code.
fn exec_child(
    read_end: OwnedFd,
    write_end: OwnedFd,
    program: &CStr,
    argv: &[*const c_char],
    env: &[*const c_char],
) -> ! {
    let read_fd = read_end.into_raw_fd();

    if read_fd == libc::STDIN_FILENO {
        // Already fd 0; dup2 would be a no-op and leave close-on-exec set
        if let Err(errno) = fcntl(read_fd, FcntlArg::F_SETFD(FdFlag::empty())) {
            child_abort(b"cpw: error clearing close-on-exec in child: errno ", errno);
        }
    } else if let Err(errno) = dup2(read_fd, libc::STDIN_FILENO) {
        child_abort(b"cpw: error calling dup2 in child: errno ", errno);
    }

    if let Err(errno) = close(write_end.into_raw_fd()) {
        child_abort(b"cpw: error closing write end of pipe in child: errno ", errno);
    }
    if read_fd != libc::STDIN_FILENO {
        if let Err(errno) = close(read_fd) {
            child_abort(b"cpw: error closing read end of pipe in child: errno ", errno);
        }
    }

    // SAFETY: program, argv and env are NUL-terminated C strings and both
    // pointer arrays end with a null pointer; all outlive this call.
    unsafe { libc::execve(program.as_ptr(), argv.as_ptr(), env.as_ptr()) };
    child_abort(b"cpw: execve failed: errno ", Errno::last())
}

fn child_abort(message: &[u8], errno: Errno) -> ! {
    write_diagnostic(message, errno as i32);
    // SAFETY: _exit skips atexit handlers and stdio flushing, which belong
    // to the parent's image.
    unsafe { libc::_exit(1) }
}

/// Parent side: send every line, then close the pipe so the child sees EOF.
///
/// `lines` is dropped, and its secret buffers zeroed, before this returns on
/// every path.
fn transmit(read_end: OwnedFd, write_end: OwnedFd, lines: Vec<ScriptLine>) -> Result<(), ExecError> {
    close(read_end.into_raw_fd()).map_err(|source| ExecError::Close { end: "read", source })?;

    for (index, line) in lines.iter().enumerate() {
        let bytes = line.as_bytes();
        let written = write(&write_end, bytes).map_err(|source| ExecError::Write {
            line: index + 1,
            source,
        })?;
        // No retry: on Linux lines are capped below PIPE_BUF, so a write is all or nothing
        if written != bytes.len() {
            return Err(ExecError::ShortWrite {
                line: index + 1,
                written,
                expected: bytes.len(),
            });
        }
        debug!(line = index + 1, bytes = written, secret = line.is_secret(), "sent line");
    }
    drop(lines);

    close(write_end.into_raw_fd()).map_err(|source| ExecError::Close {
        end: "write",
        source,
    })?;
    debug!("closed pipe, child sees end of input");
    Ok(())
}

fn wait_child(child: Pid) -> Result<i32, ExecError> {
    let status = waitpid(child, None).map_err(ExecError::Wait)?;
    let result = ProcessResult::from_wait_status(status)?;

    match result {
        ProcessResult::Exited(code) => info!(pid = %child, code, "child exited"),
        ProcessResult::Signaled(signal) => info!(pid = %child, signal, "child killed by signal"),
    }

    result.exit_code(child.as_raw())
}
