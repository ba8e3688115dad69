use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// A granted hold on a named job. The token fences stale holders: a release
/// carrying an old token is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lease {
    pub token: u64,
}

/// Time-bounded mutual exclusion for scheduled jobs.
///
/// At most one live lease exists per job name across every instance sharing
/// the lock service. Two time bounds shape each lease:
///
/// - `max_hold`: the lease expires on its own after this long, so a runner
///   that crashed mid-job frees the job without intervention;
/// - `min_hold`: the lease keeps blocking until this much time has passed
///   since acquisition even if released earlier, so a fast run cannot be
///   immediately followed by an overlapping run on a clock-skewed replica.
///
/// Implementations may sit on any shared medium: this crate ships a
/// process-local table; a database row or a TTL key would serve a real
/// multi-instance deployment.
#[async_trait]
pub trait SweepLock: Send + Sync {
    /// Tries to take the job's lease. `None` means another holder's lease is
    /// still live.
    async fn try_acquire(
        &self,
        job: &str,
        max_hold: Duration,
        min_hold: Duration,
    ) -> Option<Lease>;

    /// Releases a held lease, subject to the minimum hold.
    async fn release(&self, job: &str, lease: Lease);
}

#[derive(Debug)]
struct LeaseEntry {
    token: u64,
    /// Earliest instant the lease may stop blocking, per `min_hold`.
    held_until: Instant,
    /// Instant the lease expires on its own, per `max_hold`.
    expires_at: Instant,
}

/// A process-local `SweepLock` backed by an in-memory lease table.
#[derive(Debug, Default)]
pub struct InMemorySweepLock {
    leases: Mutex<HashMap<String, LeaseEntry>>,
    next_token: AtomicU64,
}

impl InMemorySweepLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SweepLock for InMemorySweepLock {
    async fn try_acquire(
        &self,
        job: &str,
        max_hold: Duration,
        min_hold: Duration,
    ) -> Option<Lease> {
        let mut leases = self.leases.lock().await;
        let now = Instant::now();
        if let Some(entry) = leases.get(job) {
            if entry.expires_at > now {
                return None;
            }
        }
        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        leases.insert(
            job.to_string(),
            LeaseEntry {
                token,
                held_until: now + min_hold,
                expires_at: now + max_hold,
            },
        );
        Some(Lease { token })
    }

    async fn release(&self, job: &str, lease: Lease) {
        let mut leases = self.leases.lock().await;
        let Some(entry) = leases.get_mut(job) else {
            return;
        };
        if entry.token != lease.token {
            // A stale holder releasing after its lease expired must not
            // shorten the current holder's lease.
            return;
        }
        // The lease keeps blocking until the minimum hold has elapsed.
        entry.expires_at = entry.held_until.max(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = "limit-order-sweep";

    #[tokio::test]
    async fn only_one_holder_at_a_time() {
        let lock = InMemorySweepLock::new();
        let lease = lock
            .try_acquire(JOB, Duration::from_secs(60), Duration::ZERO)
            .await;
        assert!(lease.is_some());
        assert!(lock
            .try_acquire(JOB, Duration::from_secs(60), Duration::ZERO)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn release_frees_the_job_once_the_minimum_hold_passed() {
        let lock = InMemorySweepLock::new();
        let lease = lock
            .try_acquire(JOB, Duration::from_secs(60), Duration::ZERO)
            .await
            .unwrap();
        lock.release(JOB, lease).await;
        assert!(lock
            .try_acquire(JOB, Duration::from_secs(60), Duration::ZERO)
            .await
            .is_some());
    }

    #[tokio::test]
    async fn minimum_hold_blocks_an_immediate_rerun() {
        let lock = InMemorySweepLock::new();
        let lease = lock
            .try_acquire(JOB, Duration::from_secs(60), Duration::from_millis(80))
            .await
            .unwrap();
        lock.release(JOB, lease).await;

        // Released, but the minimum hold has not elapsed yet.
        assert!(lock
            .try_acquire(JOB, Duration::from_secs(60), Duration::ZERO)
            .await
            .is_none());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(lock
            .try_acquire(JOB, Duration::from_secs(60), Duration::ZERO)
            .await
            .is_some());
    }

    #[tokio::test]
    async fn expired_lease_frees_a_crashed_holder() {
        let lock = InMemorySweepLock::new();
        // Acquired and never released.
        lock.try_acquire(JOB, Duration::from_millis(40), Duration::ZERO)
            .await
            .unwrap();

        assert!(lock
            .try_acquire(JOB, Duration::from_secs(60), Duration::ZERO)
            .await
            .is_none());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(lock
            .try_acquire(JOB, Duration::from_secs(60), Duration::ZERO)
            .await
            .is_some());
    }

    #[tokio::test]
    async fn a_stale_release_cannot_shorten_the_current_lease() {
        let lock = InMemorySweepLock::new();
        let stale = lock
            .try_acquire(JOB, Duration::from_millis(30), Duration::ZERO)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let current = lock
            .try_acquire(JOB, Duration::from_secs(60), Duration::ZERO)
            .await
            .unwrap();
        assert_ne!(stale.token, current.token);

        // The crashed holder wakes up late and releases its expired lease.
        lock.release(JOB, stale).await;
        assert!(lock
            .try_acquire(JOB, Duration::from_secs(60), Duration::ZERO)
            .await
            .is_none());
    }
}
