//! Cooperative cancellation and progress reporting
//!
//! Long-running operations consult an [`ExecutionMonitor`] between passes and
//! between rows. The eigen decomposition itself is never interrupted.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::errors::{LdaError, LdaResult};

/// Hook through which the host observes and cancels an operation
pub trait ExecutionMonitor: Sync {
    /// Return `Err(LdaError::Canceled)` if the operation should stop
    fn check_canceled(&self) -> LdaResult<()>;

    /// Report progress as a fraction in `[0, 1]`
    fn set_progress(&self, fraction: f64);
}

/// Monitor that never cancels and discards progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl ExecutionMonitor for NoopMonitor {
    fn check_canceled(&self) -> LdaResult<()> {
        Ok(())
    }

    fn set_progress(&self, _fraction: f64) {}
}

/// Thread-safe monitor backed by atomics, cancellable from another thread
#[derive(Debug, Default)]
pub struct CancellationToken {
    canceled: AtomicBool,
    progress_bits: AtomicU64,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    /// Last reported progress fraction
    pub fn progress(&self) -> f64 {
        f64::from_bits(self.progress_bits.load(Ordering::Relaxed))
    }
}

impl ExecutionMonitor for CancellationToken {
    fn check_canceled(&self) -> LdaResult<()> {
        if self.is_canceled() {
            Err(LdaError::Canceled)
        } else {
            Ok(())
        }
    }

    fn set_progress(&self, fraction: f64) {
        let clamped = fraction.clamp(0.0, 1.0);
        self.progress_bits
            .store(clamped.to_bits(), Ordering::Relaxed);
    }
}

/// Progress over a fixed number of row visits, reported in coarse steps
pub(crate) struct RowProgress<'a> {
    monitor: &'a dyn ExecutionMonitor,
    total: usize,
    done: usize,
    stride: usize,
    start: f64,
    span: f64,
}

impl<'a> RowProgress<'a> {
    pub(crate) fn new(monitor: &'a dyn ExecutionMonitor, total: usize) -> Self {
        Self::within(monitor, total, 0.0, 1.0)
    }

    /// Progress mapped into `[start, start + span]`, for multi-pass operations
    pub(crate) fn within(
        monitor: &'a dyn ExecutionMonitor,
        total: usize,
        start: f64,
        span: f64,
    ) -> Self {
        Self {
            monitor,
            total,
            done: 0,
            stride: (total / 100).max(1),
            start,
            span,
        }
    }

    /// Record one row, checking for cancellation
    pub(crate) fn tick(&mut self) -> LdaResult<()> {
        self.monitor.check_canceled()?;
        self.done += 1;
        if self.done % self.stride == 0 || self.done == self.total {
            let fraction = self.done as f64 / self.total.max(1) as f64;
            self.monitor.set_progress(self.start + self.span * fraction);
        }
        Ok(())
    }
}

/// Monitor that cancels once more than `allowed` checks have been made
#[cfg(test)]
pub(crate) struct CancelAfter {
    allowed: usize,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl CancelAfter {
    pub(crate) fn new(allowed: usize) -> Self {
        Self {
            allowed,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
impl ExecutionMonitor for CancelAfter {
    fn check_canceled(&self) -> LdaResult<()> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if n > self.allowed {
            Err(LdaError::Canceled)
        } else {
            Ok(())
        }
    }

    fn set_progress(&self, _fraction: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_cancel() {
        let token = CancellationToken::new();
        assert!(token.check_canceled().is_ok());
        token.cancel();
        assert!(matches!(token.check_canceled(), Err(LdaError::Canceled)));
    }

    #[test]
    fn test_row_progress_reaches_one() {
        let token = CancellationToken::new();
        let mut progress = RowProgress::new(&token, 250);
        for _ in 0..250 {
            progress.tick().unwrap();
        }
        assert!((token.progress() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_row_progress_within_range() {
        let token = CancellationToken::new();
        let mut progress = RowProgress::within(&token, 10, 0.0, 0.5);
        for _ in 0..10 {
            progress.tick().unwrap();
        }
        assert!((token.progress() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_row_progress_stops_when_canceled() {
        let token = CancellationToken::new();
        let mut progress = RowProgress::new(&token, 10);
        progress.tick().unwrap();
        token.cancel();
        assert!(matches!(progress.tick(), Err(LdaError::Canceled)));
    }

    #[test]
    fn test_cancel_after_counts_checks() {
        let monitor = CancelAfter::new(2);
        assert!(monitor.check_canceled().is_ok());
        assert!(monitor.check_canceled().is_ok());
        assert!(matches!(monitor.check_canceled(), Err(LdaError::Canceled)));
        assert_eq!(monitor.calls(), 3);
    }

    #[test]
    fn test_progress_is_clamped() {
        let token = CancellationToken::new();
        token.set_progress(3.0);
        assert_eq!(token.progress(), 1.0);
    }
}
