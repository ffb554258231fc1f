//! Soft cancellation of inference responses by sequence number
//!
//! In-flight network requests cannot be cancelled, so every request gets a
//! number when it is issued and only the newest one may touch state. A
//! response is admitted when its number is still the highest issued and
//! greater than the last committed one; anything older is dropped no matter
//! when it arrives.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct InferenceSequencer {
    issued: AtomicU64,
    /// Last committed sequence number. Held while a response is applied so
    /// two admitted responses never interleave their writes.
    committed: Mutex<u64>,
}

/// Exclusive right to apply one response
pub struct CommitPermit<'a> {
    seq: u64,
    committed: MutexGuard<'a, u64>,
}

impl CommitPermit<'_> {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Mark the response as applied
    pub fn commit(mut self) {
        *self.committed = self.seq;
    }
}

impl InferenceSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number the next request; the first one is 1
    pub fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn is_latest(&self, seq: u64) -> bool {
        seq == self.latest()
    }

    /// Waits for any response currently being applied, then admits `seq`
    /// only if it is still the newest request.
    pub async fn admit(&self, seq: u64) -> Option<CommitPermit<'_>> {
        let committed = self.committed.lock().await;
        if self.is_latest(seq) && seq > *committed {
            Some(CommitPermit { seq, committed })
        } else {
            None
        }
    }

    pub async fn last_committed(&self) -> u64 {
        *self.committed.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_only_latest_is_admitted() {
        // GIVEN: requests 1, 2, 3 issued in order
        let seq = InferenceSequencer::new();
        let (s1, s2, s3) = (seq.issue(), seq.issue(), seq.issue());
        assert_eq!((s1, s2, s3), (1, 2, 3));

        // WHEN: responses arrive 1, 3, 2
        let r1 = seq.admit(s1).await.is_some();
        let permit = seq.admit(s3).await.unwrap();
        permit.commit();
        let r2 = seq.admit(s2).await.is_some();

        // THEN: only 3 is applied
        assert!(!r1);
        assert!(!r2);
        assert_eq!(seq.last_committed().await, 3);
    }

    #[tokio::test]
    async fn test_committed_response_is_not_admitted_twice() {
        let seq = InferenceSequencer::new();
        let s1 = seq.issue();

        seq.admit(s1).await.unwrap().commit();

        assert!(seq.admit(s1).await.is_none());
    }

    #[tokio::test]
    async fn test_uncommitted_permit_leaves_state_alone() {
        let seq = InferenceSequencer::new();
        let s1 = seq.issue();

        drop(seq.admit(s1).await.unwrap());

        assert_eq!(seq.last_committed().await, 0);
        assert!(seq.admit(s1).await.is_some());
    }
}
