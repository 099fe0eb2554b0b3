//! Keep secret lines out of core dumps.
//!
//! One-time `prctl(PR_SET_DUMPABLE, 0)` and `setrlimit(RLIMIT_CORE, 0)`.
//! Both are best effort: the returned status says what took effect.

use std::sync::OnceLock;

use tracing::{debug, warn};

/// Which protections are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpGuardStatus {
    /// `prctl(PR_SET_DUMPABLE, 0)` succeeded. Also blocks ptrace attach.
    pub not_dumpable: bool,

    /// `setrlimit(RLIMIT_CORE, 0)` succeeded.
    pub core_limit_zero: bool,
}

impl DumpGuardStatus {
    /// True if at least one protection is active.
    pub fn is_protected(&self) -> bool {
        self.not_dumpable || self.core_limit_zero
    }
}

static STATUS: OnceLock<DumpGuardStatus> = OnceLock::new();

/// Apply the protections on first call and return the cached status after.
pub fn guard_core_dumps() -> DumpGuardStatus {
    *STATUS.get_or_init(|| {
        let status = DumpGuardStatus {
            not_dumpable: set_not_dumpable(),
            core_limit_zero: set_core_limit_zero(),
        };
        if status.is_protected() {
            debug!(?status, "core dump protection applied");
        } else {
            warn!("could not disable core dumps");
        }
        status
    })
}

#[cfg(target_os = "linux")]
fn set_not_dumpable() -> bool {
    // SAFETY: PR_SET_DUMPABLE takes one integer argument; the rest are ignored.
    unsafe { libc::prctl(libc::PR_SET_DUMPABLE, 0, 0, 0, 0) == 0 }
}

#[cfg(not(target_os = "linux"))]
fn set_not_dumpable() -> bool {
    false
}

fn set_core_limit_zero() -> bool {
    let limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: valid pointer to an initialized rlimit.
    unsafe { libc::setrlimit(libc::RLIMIT_CORE, &limit) == 0 }
}
