//! Process liveness probing and kernel exit notification.
//!
//! The watcher never polls in the common case: on Linux each watched pid gets
//! a pidfd, on macOS a kqueue with an `EVFILT_PROC`/`NOTE_EXIT` filter. Both
//! descriptors become readable exactly when the process exits, so they are
//! registered with the tokio reactor and awaited like a socket.
//!
//! Where neither primitive is available (or the kernel refuses it) the
//! subscription falls back to sampling the process table with `sysinfo`.
//!
//! # Panic-Free Guarantees
//!
//! A pid that no longer exists, was reused, or became a zombie is an exit,
//! never an error. Nothing in this module panics or returns an error to the
//! watcher.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::config::{ExitDetection, WatchConfig};

/// Shortest sampling interval for the polling fallback.
pub const MIN_EXIT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Future that resolves once the watched process has exited.
pub type ExitFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Result of arming an exit subscription.
pub enum ExitSubscription {
    /// Armed; the future completes on exit. Dropping it releases the OS
    /// resources behind it.
    Armed(ExitFuture),

    /// The process was already gone when we tried to subscribe.
    AlreadyExited,
}

impl std::fmt::Debug for ExitSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Armed(_) => f.write_str("Armed(..)"),
            Self::AlreadyExited => f.write_str("AlreadyExited"),
        }
    }
}

/// OS seam used by the exit watcher.
pub trait ProcessProbe: Send + Sync + 'static {
    /// Signal-0 style liveness check.
    fn is_running(&self, pid: u32) -> bool;

    /// Arms an edge-triggered exit notification for `pid`.
    ///
    /// Must not block; must not need to run inside a runtime (the returned
    /// future is first polled from a spawned task).
    fn subscribe_exit(&self, pid: u32) -> ExitSubscription;
}

// ============================================================================
// Kernel Probe
// ============================================================================

/// Production probe backed by `kill(2)` and pidfd/kqueue.
#[derive(Debug, Clone)]
pub struct KernelProbe {
    detection: ExitDetection,
    poll_interval: Duration,
}

impl KernelProbe {
    /// Creates a probe that prefers kernel notification.
    ///
    /// `poll_interval` is clamped to [`MIN_EXIT_POLL_INTERVAL`] here and in
    /// the other constructors.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            detection: ExitDetection::Kernel,
            poll_interval: poll_interval.max(MIN_EXIT_POLL_INTERVAL),
        }
    }

    /// Creates a probe that only samples the process table.
    pub fn polling(poll_interval: Duration) -> Self {
        Self {
            detection: ExitDetection::Polling,
            poll_interval: poll_interval.max(MIN_EXIT_POLL_INTERVAL),
        }
    }

    /// Creates a probe from config.
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            detection: config.exit_detection,
            poll_interval: config.exit_poll_interval.max(MIN_EXIT_POLL_INTERVAL),
        }
    }

    fn poll_subscription(&self, pid: u32) -> ExitSubscription {
        let mut system = System::new();
        let Some(baseline) = sample(&mut system, pid) else {
            return ExitSubscription::AlreadyExited;
        };
        if baseline.zombie {
            return ExitSubscription::AlreadyExited;
        }
        ExitSubscription::Armed(Box::pin(poll_until_exit(
            system,
            pid,
            baseline.start_time,
            self.poll_interval,
        )))
    }
}

impl Default for KernelProbe {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EXIT_POLL_INTERVAL)
    }
}

impl ProcessProbe for KernelProbe {
    fn is_running(&self, pid: u32) -> bool {
        is_process_running(pid)
    }

    fn subscribe_exit(&self, pid: u32) -> ExitSubscription {
        if !is_valid_pid(pid) {
            return ExitSubscription::AlreadyExited;
        }

        if self.detection == ExitDetection::Polling {
            return self.poll_subscription(pid);
        }

        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            match kernel::open(pid) {
                Ok(Some(fd)) => {
                    let fallback_interval = self.poll_interval;
                    return ExitSubscription::Armed(Box::pin(async move {
                        kernel::wait_readable(fd, pid, fallback_interval).await;
                    }));
                }
                Ok(None) => return ExitSubscription::AlreadyExited,
                Err(e) => {
                    warn!(
                        pid,
                        error = %e,
                        "Kernel exit notification unavailable, falling back to polling"
                    );
                }
            }
        }

        self.poll_subscription(pid)
    }
}

// ============================================================================
// Liveness
// ============================================================================

fn is_valid_pid(pid: u32) -> bool {
    pid != 0 && i32::try_from(pid).is_ok()
}

/// Checks if a process with the given PID is running.
///
/// `EPERM` means the process exists but belongs to someone else, which still
/// counts as running. Zombies count as running here; the exit subscription is
/// what notices them.
#[cfg(unix)]
pub fn is_process_running(pid: u32) -> bool {
    let Ok(raw) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    // SAFETY: signal 0 only performs the existence and permission checks.
    if unsafe { libc::kill(raw, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Checks if a process with the given PID is running.
#[cfg(not(unix))]
pub fn is_process_running(pid: u32) -> bool {
    if !is_valid_pid(pid) {
        return false;
    }
    let mut system = System::new();
    sample(&mut system, pid).is_some()
}

// ============================================================================
// Polling Fallback
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Sample {
    start_time: u64,
    zombie: bool,
}

fn sample(system: &mut System, pid: u32) -> Option<Sample> {
    let pid = Pid::from_u32(pid);
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).map(|p| Sample {
        start_time: p.start_time(),
        zombie: p.status() == ProcessStatus::Zombie,
    })
}

/// Samples the process table until the pid is gone, is a zombie, or has been
/// recycled for a different process (start time changed).
async fn poll_until_exit(mut system: System, pid: u32, start_time: u64, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately; the baseline was just taken.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match sample(&mut system, pid) {
            None => break,
            Some(s) if s.zombie => break,
            Some(s) if s.start_time != start_time => {
                debug!(pid, "PID reused by a different process");
                break;
            }
            Some(_) => {}
        }
    }
}

// ============================================================================
// Kernel Primitives
// ============================================================================

#[cfg(any(target_os = "linux", target_os = "macos"))]
mod kernel {
    use std::io;
    use std::os::fd::OwnedFd;
    use std::time::Duration;

    use tokio::io::unix::AsyncFd;
    use tokio::io::Interest;
    use tracing::warn;

    /// Waits until the exit descriptor is readable.
    ///
    /// Registration failures degrade to polling rather than reporting a
    /// bogus exit.
    pub(super) async fn wait_readable(fd: OwnedFd, pid: u32, fallback_interval: Duration) {
        let registered = match AsyncFd::with_interest(fd, Interest::READABLE) {
            Ok(afd) => afd,
            Err(e) => {
                warn!(pid, error = %e, "Failed to register exit descriptor, polling instead");
                poll_fallback(pid, fallback_interval).await;
                return;
            }
        };

        if let Err(e) = registered.readable().await {
            warn!(pid, error = %e, "Exit descriptor wait failed, polling instead");
            drop(registered);
            poll_fallback(pid, fallback_interval).await;
        }
    }

    async fn poll_fallback(pid: u32, every: Duration) {
        let mut system = sysinfo::System::new();
        match super::sample(&mut system, pid) {
            Some(s) if !s.zombie => {
                super::poll_until_exit(system, pid, s.start_time, every).await;
            }
            _ => {}
        }
    }

    fn esrch_or(err: io::Error) -> io::Result<Option<OwnedFd>> {
        if err.raw_os_error() == Some(libc::ESRCH) {
            Ok(None)
        } else {
            Err(err)
        }
    }

    /// Opens a pidfd for `pid`. `Ok(None)` means the process is already gone.
    #[cfg(target_os = "linux")]
    pub(super) fn open(pid: u32) -> io::Result<Option<OwnedFd>> {
        use std::os::fd::{FromRawFd, RawFd};

        let raw_pid = libc::pid_t::try_from(pid)
            .map_err(|_| io::Error::from_raw_os_error(libc::EINVAL))?;
        // SAFETY: pidfd_open(pid, flags) has no memory arguments and returns
        // a new descriptor or -1.
        let fd = unsafe { libc::syscall(libc::SYS_pidfd_open, raw_pid, 0 as libc::c_uint) };
        if fd < 0 {
            return esrch_or(io::Error::last_os_error());
        }
        let fd = RawFd::try_from(fd).map_err(|_| io::Error::from_raw_os_error(libc::EBADF))?;
        // SAFETY: the kernel just handed us this descriptor and nothing else owns it.
        Ok(Some(unsafe { OwnedFd::from_raw_fd(fd) }))
    }

    /// Opens a kqueue with a one-shot NOTE_EXIT filter for `pid`.
    /// `Ok(None)` means the process is already gone.
    #[cfg(target_os = "macos")]
    pub(super) fn open(pid: u32) -> io::Result<Option<OwnedFd>> {
        use std::os::fd::{AsRawFd, FromRawFd};

        // SAFETY: kqueue() takes no arguments and returns a new descriptor or -1.
        let kq = unsafe { libc::kqueue() };
        if kq < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: freshly created descriptor, owned by nobody else.
        let kq = unsafe { OwnedFd::from_raw_fd(kq) };

        let change = libc::kevent {
            ident: pid as libc::uintptr_t,
            filter: libc::EVFILT_PROC,
            flags: libc::EV_ADD | libc::EV_ONESHOT,
            fflags: libc::NOTE_EXIT,
            data: 0,
            udata: std::ptr::null_mut(),
        };
        // SAFETY: one valid changelist entry, no eventlist, null timeout.
        let rc = unsafe {
            libc::kevent(
                kq.as_raw_fd(),
                &change,
                1,
                std::ptr::null_mut(),
                0,
                std::ptr::null(),
            )
        };
        if rc < 0 {
            return esrch_or(io::Error::last_os_error());
        }
        Ok(Some(kq))
    }
}
