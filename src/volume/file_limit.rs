//! Process-wide open-file ceiling adjustment.
//!
//! Split-volume streams keep every volume open for their whole lifetime.
//! Once a stream holds [`OPEN_FILES_THRESHOLD`] volumes, the soft limit on
//! open file descriptors is raised once per [`FileLimit`], best effort.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Number of open volumes that triggers the limit increase.
pub const OPEN_FILES_THRESHOLD: usize = 500;

/// Capability to raise the open-file ceiling of the current process.
pub trait RaiseFileLimit: Send + Sync {
    /// Raises the limit. Failures are logged and otherwise ignored.
    fn raise(&self) -> io::Result<()>;
}

/// Raises the soft `RLIMIT_NOFILE` limit up to the hard limit.
///
/// On non-Unix platforms this is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFileLimit;

impl RaiseFileLimit for SystemFileLimit {
    #[cfg(unix)]
    fn raise(&self) -> io::Result<()> {
        let mut limit = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: `limit` is a valid, writable rlimit struct.
        if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) } != 0 {
            return Err(io::Error::last_os_error());
        }

        #[allow(unused_mut)]
        let mut target = limit.rlim_max;
        // macOS rejects RLIM_INFINITY for the soft limit.
        #[cfg(target_os = "macos")]
        {
            target = target.min(libc::OPEN_MAX as libc::rlim_t);
        }
        if limit.rlim_cur >= target {
            return Ok(());
        }

        log::debug!(
            "Raising open file limit from {} to {}",
            limit.rlim_cur,
            target
        );
        limit.rlim_cur = target;
        // SAFETY: `limit` is a valid rlimit struct with cur <= max.
        if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &limit) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn raise(&self) -> io::Result<()> {
        Ok(())
    }
}

/// One-shot guard around a [`RaiseFileLimit`] capability.
///
/// The raise runs at most once, the first time [`FileLimit::note_open_files`]
/// observes a count at or above the threshold.
pub struct FileLimit {
    raiser: Box<dyn RaiseFileLimit>,
    threshold: usize,
    raised: AtomicBool,
}

impl FileLimit {
    /// Creates a guard with the default threshold.
    pub fn new(raiser: impl RaiseFileLimit + 'static) -> Self {
        Self::with_threshold(raiser, OPEN_FILES_THRESHOLD)
    }

    /// Creates a guard with a custom threshold.
    pub fn with_threshold(raiser: impl RaiseFileLimit + 'static, threshold: usize) -> Self {
        Self {
            raiser: Box::new(raiser),
            threshold,
            raised: AtomicBool::new(false),
        }
    }

    /// Returns the process-wide guard backed by [`SystemFileLimit`].
    pub fn global() -> Arc<FileLimit> {
        static GLOBAL: OnceLock<Arc<FileLimit>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(FileLimit::new(SystemFileLimit)))
            .clone()
    }

    /// Returns the threshold that triggers the raise.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns `true` once the raise has been attempted.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Records the number of files a stream currently holds open.
    ///
    /// Returns `true` if this call performed the raise.
    pub fn note_open_files(&self, open_files: usize) -> bool {
        if open_files < self.threshold {
            return false;
        }
        if self.raised.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Err(e) = self.raiser.raise() {
            log::warn!("Failed to raise the open file limit: {}", e);
        }
        true
    }
}

impl std::fmt::Debug for FileLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLimit")
            .field("threshold", &self.threshold)
            .field("raised", &self.is_raised())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingRaiser(Arc<AtomicUsize>);

    impl RaiseFileLimit for CountingRaiser {
        fn raise(&self) -> io::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingRaiser;

    impl RaiseFileLimit for FailingRaiser {
        fn raise(&self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn test_raises_once_at_threshold() {
        let calls = Arc::new(AtomicUsize::new(0));
        let limit = FileLimit::with_threshold(CountingRaiser(calls.clone()), 3);

        assert!(!limit.note_open_files(1));
        assert!(!limit.note_open_files(2));
        assert!(!limit.is_raised());
        assert!(limit.note_open_files(3));
        assert!(!limit.note_open_files(4));
        assert!(!limit.note_open_files(1000));

        assert!(limit.is_raised());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_is_best_effort() {
        let limit = FileLimit::with_threshold(FailingRaiser, 1);
        assert!(limit.note_open_files(1));
        assert!(limit.is_raised());
        assert!(!limit.note_open_files(2));
    }

    #[test]
    fn test_default_threshold() {
        let limit = FileLimit::new(SystemFileLimit);
        assert_eq!(limit.threshold(), OPEN_FILES_THRESHOLD);
    }
}
