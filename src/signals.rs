//! Process-wide signal dispositions for the driver.
//!
//! Dispositions are global to the process. They are installed once, before
//! the first child is forked, and never changed afterwards. Two independent
//! drivers in one process are only safe if they agree on this table.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use tracing::debug;

use crate::error::ExecError;

/// What happens when a signal is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Run a handler that does nothing. Unlike `SIG_IGN` this keeps the
    /// child reapable by `waitpid` and keeps EPIPE as an error return.
    NoOp,
    /// `SIG_IGN`.
    Ignore,
    /// Exit the whole process with status 1 immediately.
    Terminate,
}

/// The fixed disposition table.
pub const DISPOSITIONS: &[(Signal, Disposition)] = &[
    // Lifecycle
    (Signal::SIGCHLD, Disposition::NoOp),
    (Signal::SIGPIPE, Disposition::NoOp),
    // Terminal control
    (Signal::SIGTTOU, Disposition::Ignore),
    (Signal::SIGTTIN, Disposition::Ignore),
    // Termination requests
    (Signal::SIGHUP, Disposition::Terminate),
    (Signal::SIGINT, Disposition::Terminate),
    (Signal::SIGTERM, Disposition::Terminate),
    (Signal::SIGQUIT, Disposition::Terminate),
    (Signal::SIGUSR1, Disposition::Terminate),
];

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Proof that the driver's signal dispositions are in place.
///
/// Obtained only from [`SignalPolicy::install`]; required by
/// [`PreparedScript::execute`](crate::PreparedScript::execute) so no child
/// can be forked before the table is applied.
#[derive(Debug, Clone, Copy)]
pub struct SignalPolicy {
    _private: (),
}

impl SignalPolicy {
    /// Install every disposition in [`DISPOSITIONS`].
    ///
    /// Idempotent: later calls return immediately once a call has succeeded.
    ///
    /// # Errors
    ///
    /// `ExecError::SignalInstall` for the first disposition that could not be
    /// set. The policy is then incomplete and the caller must not fork.
    pub fn install() -> Result<SignalPolicy, ExecError> {
        if INSTALLED.load(Ordering::Acquire) {
            return Ok(SignalPolicy { _private: () });
        }

        for &(signal, disposition) in DISPOSITIONS {
            let action = match disposition {
                Disposition::NoOp => SigAction::new(
                    SigHandler::Handler(noop_handler),
                    SaFlags::SA_RESTART,
                    SigSet::empty(),
                ),
                Disposition::Ignore => {
                    SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty())
                }
                Disposition::Terminate => SigAction::new(
                    SigHandler::Handler(terminate_handler),
                    SaFlags::empty(),
                    SigSet::empty(),
                ),
            };
            // SAFETY: both handlers only call async-signal-safe functions
            // (write(2) and _exit(2)) and touch no shared state.
            unsafe { sigaction(signal, &action) }
                .map_err(|source| ExecError::SignalInstall { signal, source })?;
            debug!(?signal, ?disposition, "installed signal disposition");
        }

        INSTALLED.store(true, Ordering::Release);
        Ok(SignalPolicy { _private: () })
    }
}

extern "C" fn noop_handler(_signo: libc::c_int) {}

extern "C" fn terminate_handler(signo: libc::c_int) {
    let expected = DISPOSITIONS
        .iter()
        .any(|&(s, d)| d == Disposition::Terminate && s as libc::c_int == signo);
    if !expected {
        write_diagnostic(b"cpw: interrupted by unexpected signal ", signo);
    }
    // SAFETY: _exit is async-signal-safe and never returns.
    unsafe { libc::_exit(1) }
}

/// Write `prefix`, a decimal number and a newline to stderr without allocating.
///
/// Usable from signal handlers and from a forked child before exec.
pub(crate) fn write_diagnostic(prefix: &[u8], number: i32) {
    let mut digits = [0u8; 12];
    let mut at = digits.len();
    let negative = number < 0;
    let mut n = number.unsigned_abs();
    loop {
        at -= 1;
        digits[at] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    if negative {
        at -= 1;
        digits[at] = b'-';
    }
    // SAFETY: plain write(2) on fd 2 with valid buffers; errors are ignored
    // because there is nowhere left to report them.
    unsafe {
        libc::write(libc::STDERR_FILENO, prefix.as_ptr().cast(), prefix.len());
        libc::write(
            libc::STDERR_FILENO,
            digits[at..].as_ptr().cast(),
            digits.len() - at,
        );
        libc::write(libc::STDERR_FILENO, b"\n".as_ptr().cast(), 1);
    }
}
