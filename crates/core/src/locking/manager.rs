//! The lock protocol: check, acquire, refresh, release and sweep.

use std::sync::Arc;

use chrono::Utc;

use super::{AcquireOutcome, LockPolicy, LockStatus, LockStore, StoreError};
use crate::types::StoryId;

/// How many times `acquire` retries when the lock changes between the
/// conditional write and the read-back.
pub const ACQUIRE_ATTEMPTS: usize = 3;

/// Failure of a lock operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    /// The store could not be read or written.
    #[error(transparent)]
    DataAccess(#[from] StoreError),

    /// Another journalist holds a live lock.
    #[error("Story is being edited by {holder}")]
    Conflict { holder: String },

    /// The caller no longer holds the lock it tried to refresh.
    #[error("You no longer hold the editing lock on this story")]
    NotHeld,

    /// The lock kept changing hands while acquiring.
    #[error("Story lock changed concurrently, try again")]
    Contended,
}

/// Grants and tracks editing locks through a [`LockStore`].
///
/// Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn LockStore>,
    policy: LockPolicy,
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl LockManager {
    pub fn new(store: Arc<dyn LockStore>, policy: LockPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    /// The course a story belongs to. Callers scope lock operations to their
    /// own course with this before touching the lock.
    pub async fn course_of(&self, story_id: StoryId) -> Result<String, LockError> {
        Ok(self.store.course_of(story_id).await?)
    }

    /// Report the lock state of a story for `current_user`.
    pub async fn check(
        &self,
        story_id: StoryId,
        current_user: &str,
    ) -> Result<LockStatus, LockError> {
        let fields = self.store.read(story_id).await?;
        Ok(LockStatus::evaluate(
            &fields,
            current_user,
            Utc::now(),
            self.policy.timeout,
        ))
    }

    /// Take the lock for `user`.
    ///
    /// Succeeds when the story is unlocked, already held by `user`, or held by
    /// an expired lock. The decision is made by one conditional write in the
    /// store; the read-back is only used to name the blocking holder.
    pub async fn acquire(&self, story_id: StoryId, user: &str) -> Result<LockStatus, LockError> {
        for attempt in 1..=ACQUIRE_ATTEMPTS {
            let now = Utc::now();
            let outcome = self
                .store
                .try_acquire(story_id, user, now, self.policy.stale_before(now))
                .await?;

            match outcome {
                AcquireOutcome::Acquired(fields) => {
                    tracing::debug!(%story_id, user, "Story lock acquired");
                    return Ok(LockStatus::evaluate(&fields, user, now, self.policy.timeout));
                }
                AcquireOutcome::Held(fields) => {
                    let status = LockStatus::evaluate(&fields, user, now, self.policy.timeout);
                    if let (true, Some(holder)) = (status.is_locked, status.locked_by) {
                        tracing::debug!(%story_id, user, holder = %holder, "Story lock denied");
                        return Err(LockError::Conflict { holder });
                    }
                    tracing::debug!(%story_id, user, attempt, "Story lock moved during acquire, retrying");
                }
            }
        }

        Err(LockError::Contended)
    }

    /// Extend `user`'s lock to expire a full timeout from now.
    ///
    /// Fails with [`LockError::NotHeld`] when the lock was released, swept, or
    /// taken over since it was acquired.
    pub async fn refresh(&self, story_id: StoryId, user: &str) -> Result<LockStatus, LockError> {
        let now = Utc::now();
        let affected = self.store.refresh(story_id, user, now).await?;
        if affected == 0 {
            return Err(LockError::NotHeld);
        }

        Ok(LockStatus {
            is_locked: false,
            locked_by: Some(user.to_string()),
            locked_at: Some(now),
            is_expired: false,
            is_self: true,
        })
    }

    /// Clear the lock regardless of who holds it.
    pub async fn release(&self, story_id: StoryId) -> Result<(), LockError> {
        let affected = self.store.clear(story_id).await?;
        if affected == 0 {
            return Err(StoreError::NotFound(story_id).into());
        }
        tracing::debug!(%story_id, "Story lock released");
        Ok(())
    }

    /// Clear every expired lock. Returns the number of stories unlocked.
    pub async fn cleanup_stale(&self) -> Result<u64, LockError> {
        let stale_before = self.policy.stale_before(Utc::now());
        Ok(self.store.clear_stale(stale_before).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locking::{LockFields, MemoryLockStore};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::Duration;
    use uuid::Uuid;

    use crate::types::Timestamp;

    async fn manager_with(rows: &[(StoryId, LockFields)]) -> (LockManager, Arc<MemoryLockStore>) {
        let store = Arc::new(MemoryLockStore::new());
        for (id, fields) in rows {
            store.insert(*id, "JOUR-101", fields.clone()).await;
        }
        let manager = LockManager::new(store.clone(), LockPolicy::default());
        (manager, store)
    }

    fn minutes_ago(mins: i64) -> Timestamp {
        Utc::now() - Duration::minutes(mins)
    }

    // -----------------------------------------------------------------------
    // check
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_check_unlocked_story() {
        let id = Uuid::new_v4();
        let (manager, _) = manager_with(&[(id, LockFields::default())]).await;

        let status = manager.check(id, "bob").await.unwrap();
        assert!(!status.is_locked);
        assert!(status.is_expired);
    }

    #[tokio::test]
    async fn test_check_unknown_story_is_data_access_error() {
        let (manager, _) = manager_with(&[]).await;
        let id = Uuid::new_v4();

        let err = manager.check(id, "bob").await.unwrap_err();
        assert_matches!(err, LockError::DataAccess(StoreError::NotFound(missing)) if missing == id);
    }

    #[tokio::test]
    async fn test_course_of_known_and_unknown_story() {
        let id = Uuid::new_v4();
        let (manager, _) = manager_with(&[(id, LockFields::default())]).await;

        assert_eq!(manager.course_of(id).await.unwrap(), "JOUR-101");
        assert_matches!(
            manager.course_of(Uuid::new_v4()).await,
            Err(LockError::DataAccess(StoreError::NotFound(_)))
        );
    }

    // -----------------------------------------------------------------------
    // acquire
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_acquire_unlocked_story() {
        let id = Uuid::new_v4();
        let (manager, store) = manager_with(&[(id, LockFields::default())]).await;

        let before = Utc::now();
        let status = manager.acquire(id, "alice").await.unwrap();
        assert!(status.is_self);

        let fields = store.get(id).await.unwrap();
        assert_eq!(fields.locked_by.as_deref(), Some("alice"));
        assert!(fields.locked_at.unwrap() >= before);
    }

    #[tokio::test]
    async fn test_acquire_conflict_names_holder() {
        let id = Uuid::new_v4();
        let (manager, store) =
            manager_with(&[(id, LockFields::held_by("alice", minutes_ago(1)))]).await;

        let err = manager.acquire(id, "bob").await.unwrap_err();
        assert_eq!(err, LockError::Conflict { holder: "alice".into() });
        assert!(err.to_string().contains("alice"));
        assert_eq!(err.to_string(), "Story is being edited by alice");

        assert_eq!(store.get(id).await.unwrap().locked_by.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_acquire_expired_lock() {
        let id = Uuid::new_v4();
        let (manager, store) =
            manager_with(&[(id, LockFields::held_by("alice", minutes_ago(6)))]).await;

        manager.acquire(id, "bob").await.unwrap();
        assert_eq!(store.get(id).await.unwrap().locked_by.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_reacquire_own_lock_bumps_timestamp() {
        let id = Uuid::new_v4();
        let stamped = minutes_ago(4);
        let (manager, store) = manager_with(&[(id, LockFields::held_by("alice", stamped))]).await;

        manager.acquire(id, "alice").await.unwrap();
        assert!(store.get(id).await.unwrap().locked_at.unwrap() > stamped);
    }

    #[tokio::test]
    async fn test_acquire_then_check_is_self() {
        let id = Uuid::new_v4();
        let (manager, _) = manager_with(&[(id, LockFields::default())]).await;

        manager.acquire(id, "alice").await.unwrap();
        let status = manager.check(id, "alice").await.unwrap();
        assert!(status.is_self);
        assert!(!status.is_locked);
    }

    #[tokio::test]
    async fn test_concurrent_acquires_grant_exactly_one() {
        let id = Uuid::new_v4();
        let (manager, _) = manager_with(&[(id, LockFields::default())]).await;

        let handles: Vec<_> = ["alice", "bob", "carol", "dave"]
            .into_iter()
            .map(|user| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.acquire(id, user).await })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => granted += 1,
                Err(err) => assert_matches!(err, LockError::Conflict { .. }),
            }
        }
        assert_eq!(granted, 1);
    }

    /// Store whose conditional write always loses, but whose read-back shows
    /// no live holder.
    struct FlappingStore;

    #[async_trait]
    impl LockStore for FlappingStore {
        async fn course_of(&self, _: StoryId) -> Result<String, StoreError> {
            Ok("JOUR-101".into())
        }
        async fn read(&self, _: StoryId) -> Result<LockFields, StoreError> {
            Ok(LockFields::default())
        }
        async fn try_acquire(
            &self,
            _: StoryId,
            _: &str,
            _: Timestamp,
            _: Timestamp,
        ) -> Result<AcquireOutcome, StoreError> {
            Ok(AcquireOutcome::Held(LockFields::default()))
        }
        async fn refresh(&self, _: StoryId, _: &str, _: Timestamp) -> Result<u64, StoreError> {
            Ok(0)
        }
        async fn clear(&self, _: StoryId) -> Result<u64, StoreError> {
            Ok(0)
        }
        async fn clear_stale(&self, _: Timestamp) -> Result<u64, StoreError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_acquire_gives_up_after_repeated_contention() {
        let manager = LockManager::new(Arc::new(FlappingStore), LockPolicy::default());
        let err = manager.acquire(Uuid::new_v4(), "alice").await.unwrap_err();
        assert_eq!(err, LockError::Contended);
    }

    // -----------------------------------------------------------------------
    // refresh
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_refresh_own_lock() {
        let id = Uuid::new_v4();
        let stamped = minutes_ago(4);
        let (manager, store) = manager_with(&[(id, LockFields::held_by("alice", stamped))]).await;

        let status = manager.refresh(id, "alice").await.unwrap();
        assert!(status.is_self);
        assert!(store.get(id).await.unwrap().locked_at.unwrap() > stamped);
    }

    #[tokio::test]
    async fn test_refresh_lost_lock_is_not_held() {
        let id = Uuid::new_v4();
        let (manager, store) =
            manager_with(&[(id, LockFields::held_by("bob", minutes_ago(1)))]).await;

        let err = manager.refresh(id, "alice").await.unwrap_err();
        assert_eq!(err, LockError::NotHeld);
        assert_eq!(store.get(id).await.unwrap().locked_by.as_deref(), Some("bob"));
    }

    // -----------------------------------------------------------------------
    // release
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_release_clears_any_holder() {
        let id = Uuid::new_v4();
        let (manager, store) =
            manager_with(&[(id, LockFields::held_by("alice", minutes_ago(1)))]).await;

        manager.release(id).await.unwrap();
        assert_eq!(store.get(id).await.unwrap(), LockFields::default());

        for user in ["alice", "bob"] {
            assert!(!manager.check(id, user).await.unwrap().is_locked);
        }
    }

    #[tokio::test]
    async fn test_release_unknown_story() {
        let (manager, _) = manager_with(&[]).await;
        let err = manager.release(Uuid::new_v4()).await.unwrap_err();
        assert_matches!(err, LockError::DataAccess(StoreError::NotFound(_)));
    }

    // -----------------------------------------------------------------------
    // cleanup_stale
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_cleanup_clears_only_stale_locks() {
        let stale = Uuid::new_v4();
        let fresh = Uuid::new_v4();
        let free = Uuid::new_v4();
        let (manager, store) = manager_with(&[
            (stale, LockFields::held_by("alice", minutes_ago(6))),
            (fresh, LockFields::held_by("bob", minutes_ago(2))),
            (free, LockFields::default()),
        ])
        .await;

        assert_eq!(manager.cleanup_stale().await.unwrap(), 1);
        assert_eq!(store.get(stale).await.unwrap(), LockFields::default());
        assert_eq!(store.get(fresh).await.unwrap().locked_by.as_deref(), Some("bob"));

        assert_eq!(manager.cleanup_stale().await.unwrap(), 0);
    }
}
