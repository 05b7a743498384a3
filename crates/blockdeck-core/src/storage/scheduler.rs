//! Debounced save scheduling with bounded retry.
//!
//! The session marks the scheduler dirty after every committed command;
//! the host loop drives `maybe_save` each tick and `flush` before the
//! session ends. Rapid consecutive commits coalesce into one save. Failed
//! saves are retried with exponential backoff up to a bounded attempt
//! count; after exhaustion the scheduler degrades to a dirty/warning
//! state and waits for an explicit flush. In-memory state is never
//! discarded.

use super::{Storage, StorageResult};
use crate::board::Board;
use log::{debug, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default quiet window before a dirty board is saved.
pub const DEFAULT_DEBOUNCE_MS: u64 = 400;

/// Attempts per save before the scheduler degrades.
pub const MAX_SAVE_ATTEMPTS: u32 = 5;

const BASE_RETRY_MS: u64 = 250;
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(30);

/// Observable state of the synchronizer, for non-blocking UI notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Everything committed has been saved.
    Clean,
    /// Unsaved changes, waiting out the debounce window.
    Pending,
    /// A save failed; a retry is scheduled.
    Retrying { attempt: u32 },
    /// Retries exhausted; the board is dirty until an explicit flush
    /// succeeds.
    Degraded,
}

/// Debounced, retrying save driver for one board session.
pub struct SaveScheduler<S: Storage> {
    storage: Arc<S>,
    debounce: Duration,
    /// Set on every commit; the debounce window restarts so bursts
    /// coalesce.
    dirty_since: Option<Instant>,
    attempts: u32,
    next_attempt_at: Option<Instant>,
    degraded: bool,
}

impl<S: Storage> SaveScheduler<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self::with_debounce(storage, Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }

    pub fn with_debounce(storage: Arc<S>, debounce: Duration) -> Self {
        Self {
            storage,
            debounce,
            dirty_since: None,
            attempts: 0,
            next_attempt_at: None,
            degraded: false,
        }
    }

    /// Record that the board changed. Restarts the debounce window.
    pub fn mark_dirty(&mut self) {
        self.dirty_since = Some(Instant::now());
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    pub fn status(&self) -> SyncStatus {
        if self.dirty_since.is_none() {
            SyncStatus::Clean
        } else if self.degraded {
            SyncStatus::Degraded
        } else if self.attempts > 0 {
            SyncStatus::Retrying { attempt: self.attempts }
        } else {
            SyncStatus::Pending
        }
    }

    /// Whether a save attempt is due right now.
    pub fn should_save(&self) -> bool {
        let Some(since) = self.dirty_since else {
            return false;
        };
        if self.degraded {
            // Only an explicit flush retries after exhaustion.
            return false;
        }
        if since.elapsed() < self.debounce {
            return false;
        }
        match self.next_attempt_at {
            Some(at) => Instant::now() >= at,
            None => true,
        }
    }

    /// Save if dirty and due. Returns true when a save was performed.
    pub async fn maybe_save(&mut self, board: &Board) -> StorageResult<bool> {
        if !self.should_save() {
            return Ok(false);
        }
        self.attempt(board).await?;
        Ok(true)
    }

    /// Trailing flush: save immediately when dirty, ignoring the debounce
    /// window and any degraded state. Call before the session ends.
    pub async fn flush(&mut self, board: &Board) -> StorageResult<()> {
        if self.dirty_since.is_none() {
            return Ok(());
        }
        self.attempt(board).await
    }

    async fn attempt(&mut self, board: &Board) -> StorageResult<()> {
        let id = board.id;
        match self.storage.save(board).await {
            Ok(()) => {
                debug!("board {id} saved");
                self.dirty_since = None;
                self.attempts = 0;
                self.next_attempt_at = None;
                self.degraded = false;
                Ok(())
            }
            Err(err) => {
                self.attempts += 1;
                if self.attempts >= MAX_SAVE_ATTEMPTS {
                    self.degraded = true;
                    self.next_attempt_at = None;
                    warn!("board {id} save failed {} times, giving up until flush: {err}", self.attempts);
                } else {
                    let backoff = retry_backoff(self.attempts);
                    self.next_attempt_at = Some(Instant::now() + backoff);
                    warn!("board {id} save failed (attempt {}), retrying in {backoff:?}: {err}", self.attempts);
                }
                Err(err)
            }
        }
    }
}

fn retry_backoff(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    Duration::from_millis(BASE_RETRY_MS.saturating_mul(1u64 << exp)).min(MAX_RETRY_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::block_on;
    use crate::storage::{BoxFuture, MemoryStorage, StorageError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    /// Storage whose next `fail_remaining` saves fail.
    struct FlakyStorage {
        inner: MemoryStorage,
        fail_remaining: AtomicU32,
    }

    impl FlakyStorage {
        fn failing(times: u32) -> Self {
            Self {
                inner: MemoryStorage::new(),
                fail_remaining: AtomicU32::new(times),
            }
        }
    }

    impl Storage for FlakyStorage {
        fn save(&self, board: &Board) -> BoxFuture<'_, StorageResult<()>> {
            if self
                .fail_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Box::pin(async { Err(StorageError::Io("backend unavailable".into())) });
            }
            self.inner.save(board)
        }
        fn load(&self, id: Uuid) -> BoxFuture<'_, StorageResult<Board>> {
            self.inner.load(id)
        }
        fn delete(&self, id: Uuid) -> BoxFuture<'_, StorageResult<()>> {
            self.inner.delete(id)
        }
        fn list(&self) -> BoxFuture<'_, StorageResult<Vec<Uuid>>> {
            self.inner.list()
        }
        fn exists(&self, id: Uuid) -> BoxFuture<'_, StorageResult<bool>> {
            self.inner.exists(id)
        }
    }

    fn board() -> Board {
        Board::new(Uuid::new_v4(), "scheduler tests")
    }

    #[test]
    fn test_clean_scheduler_does_not_save() {
        let storage = Arc::new(MemoryStorage::new());
        let mut scheduler = SaveScheduler::with_debounce(storage, Duration::ZERO);
        assert_eq!(scheduler.status(), SyncStatus::Clean);
        assert!(!block_on(scheduler.maybe_save(&board())).unwrap());
    }

    #[test]
    fn test_commits_coalesce_into_one_save() {
        let storage = Arc::new(MemoryStorage::new());
        let mut scheduler = SaveScheduler::with_debounce(storage.clone(), Duration::ZERO);
        let board = board();

        // Three rapid commits, one tick.
        scheduler.mark_dirty();
        scheduler.mark_dirty();
        scheduler.mark_dirty();
        assert_eq!(scheduler.status(), SyncStatus::Pending);

        assert!(block_on(scheduler.maybe_save(&board)).unwrap());
        assert_eq!(scheduler.status(), SyncStatus::Clean);
        assert!(block_on(storage.exists(board.id)).unwrap());

        // Nothing left to save.
        assert!(!block_on(scheduler.maybe_save(&board)).unwrap());
    }

    #[test]
    fn test_debounce_window_defers_save() {
        let storage = Arc::new(MemoryStorage::new());
        let mut scheduler = SaveScheduler::with_debounce(storage, Duration::from_secs(3600));
        scheduler.mark_dirty();
        assert!(!scheduler.should_save());
        // flush ignores the window.
        assert!(block_on(scheduler.flush(&board())).is_ok());
        assert_eq!(scheduler.status(), SyncStatus::Clean);
    }

    #[test]
    fn test_failed_save_schedules_retry_and_keeps_dirty() {
        let storage = Arc::new(FlakyStorage::failing(1));
        let mut scheduler = SaveScheduler::with_debounce(storage, Duration::ZERO);
        let board = board();

        scheduler.mark_dirty();
        assert!(block_on(scheduler.maybe_save(&board)).is_err());
        assert!(scheduler.is_dirty());
        assert_eq!(scheduler.status(), SyncStatus::Retrying { attempt: 1 });
        // Backoff holds the next attempt.
        assert!(!scheduler.should_save());

        // A flush retries immediately and succeeds.
        assert!(block_on(scheduler.flush(&board)).is_ok());
        assert_eq!(scheduler.status(), SyncStatus::Clean);
    }

    #[test]
    fn test_exhausted_retries_degrade_without_losing_state() {
        let storage = Arc::new(FlakyStorage::failing(MAX_SAVE_ATTEMPTS));
        let mut scheduler = SaveScheduler::with_debounce(storage, Duration::ZERO);
        let board = board();

        scheduler.mark_dirty();
        for _ in 0..MAX_SAVE_ATTEMPTS {
            assert!(block_on(scheduler.flush(&board)).is_err());
        }
        assert_eq!(scheduler.status(), SyncStatus::Degraded);
        assert!(scheduler.is_dirty());
        // maybe_save stays quiet once degraded.
        assert!(!block_on(scheduler.maybe_save(&board)).unwrap());

        // A later manual flush against a recovered backend clears it.
        assert!(block_on(scheduler.flush(&board)).is_ok());
        assert_eq!(scheduler.status(), SyncStatus::Clean);
    }

    #[test]
    fn test_retry_backoff_grows_and_caps() {
        assert_eq!(retry_backoff(1), Duration::from_millis(250));
        assert_eq!(retry_backoff(2), Duration::from_millis(500));
        assert_eq!(retry_backoff(3), Duration::from_millis(1000));
        assert_eq!(retry_backoff(40), MAX_RETRY_BACKOFF);
    }
}
