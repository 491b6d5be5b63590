//! Host CPU discovery.
//!
//! Used to expand `threads_up_to_cores` sweeps and to print the machine
//! summary. Unix asks the kernel through libc; other targets fall back to
//! what the standard library reports.

#[cfg(unix)]
mod platform {
    /// Number of processors currently online.
    pub fn online_cores() -> Option<usize> {
        // SAFETY: sysconf has no preconditions and only reads system state.
        let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
        if n > 0 {
            Some(n as usize)
        } else {
            None
        }
    }
}

#[cfg(not(unix))]
mod platform {
    pub fn online_cores() -> Option<usize> {
        std::thread::available_parallelism().ok().map(|n| n.get())
    }
}

/// Online CPU count, at least 1.
pub fn online_cores() -> usize {
    platform::online_cores().unwrap_or(1).max(1)
}

/// `1..=online_cores()` for thread sweeps that follow the machine.
pub fn thread_range() -> Vec<usize> {
    (1..=online_cores()).collect()
}
