//! Cooperative story editing locks.
//!
//! A lock is not an entity of its own: it is the `(locked_by, locked_at)` pair
//! on a story row. This module holds the expiry rules and the status
//! computation shared by the [`LockManager`], the storage backends, and the
//! HTTP layer.

mod manager;
mod memory;
mod store;

pub use manager::{LockError, LockManager, ACQUIRE_ATTEMPTS};
pub use memory::MemoryLockStore;
pub use store::{AcquireOutcome, LockStore, StoreError};

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Timing constants
// ---------------------------------------------------------------------------

/// A lock not refreshed within this many seconds is expired (5 minutes).
pub const LOCK_TIMEOUT_SECS: i64 = 5 * 60;

/// How often the stale-lock sweep runs (10 minutes).
///
/// Longer than [`LOCK_TIMEOUT_SECS`]: readers already ignore expired locks, the
/// sweep only tidies the persisted columns.
pub const LOCK_SWEEP_INTERVAL_SECS: u64 = 10 * 60;

/// Upper bound on a holder's display name.
pub const MAX_HOLDER_NAME_LEN: usize = 100;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Tunable lock timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    pub timeout: chrono::Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            timeout: chrono::Duration::seconds(LOCK_TIMEOUT_SECS),
        }
    }
}

impl LockPolicy {
    pub fn with_timeout_secs(secs: i64) -> Self {
        Self {
            timeout: chrono::Duration::seconds(secs),
        }
    }

    /// Locks stamped strictly before this instant are expired at `now`.
    pub fn stale_before(&self, now: Timestamp) -> Timestamp {
        now - self.timeout
    }
}

// ---------------------------------------------------------------------------
// Lock fields and status
// ---------------------------------------------------------------------------

/// The two lock columns as persisted on a story.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFields {
    pub locked_by: Option<String>,
    pub locked_at: Option<Timestamp>,
}

impl LockFields {
    pub fn held_by(holder: impl Into<String>, at: Timestamp) -> Self {
        Self {
            locked_by: Some(holder.into()),
            locked_at: Some(at),
        }
    }

    /// Returns `true` if these fields would block `user` at `now`.
    pub fn blocks(&self, user: &str, now: Timestamp, timeout: chrono::Duration) -> bool {
        LockStatus::evaluate(self, user, now, timeout).is_locked
    }
}

/// Lock state of a story as seen by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    /// `true` only when someone else holds a live lock.
    pub is_locked: bool,
    pub locked_by: Option<String>,
    pub locked_at: Option<Timestamp>,
    pub is_expired: bool,
    pub is_self: bool,
}

impl LockStatus {
    /// Compute the status of `fields` for `current_user`.
    pub fn evaluate(
        fields: &LockFields,
        current_user: &str,
        now: Timestamp,
        timeout: chrono::Duration,
    ) -> Self {
        let is_expired = is_lock_expired(fields.locked_at, now, timeout);
        let is_self = fields.locked_by.as_deref() == Some(current_user);
        let is_locked = fields.locked_by.is_some() && !is_expired && !is_self;

        Self {
            is_locked,
            locked_by: fields.locked_by.clone(),
            locked_at: fields.locked_at,
            is_expired,
            is_self,
        }
    }
}

/// Returns `true` if a lock stamped at `locked_at` has lapsed by `now`.
///
/// A missing timestamp counts as expired.
pub fn is_lock_expired(
    locked_at: Option<Timestamp>,
    now: Timestamp,
    timeout: chrono::Duration,
) -> bool {
    match locked_at {
        None => true,
        Some(at) => now - at > timeout,
    }
}

/// Validate a would-be lock holder's display name.
pub fn validate_holder_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Lock holder name must not be empty".to_string());
    }
    if name.chars().count() > MAX_HOLDER_NAME_LEN {
        return Err(format!(
            "Lock holder name must be at most {MAX_HOLDER_NAME_LEN} characters"
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn timeout() -> Duration {
        LockPolicy::default().timeout
    }

    // -----------------------------------------------------------------------
    // Expiry
    // -----------------------------------------------------------------------

    #[test]
    fn test_missing_timestamp_is_expired() {
        assert!(is_lock_expired(None, Utc::now(), timeout()));
    }

    #[test]
    fn test_fresh_lock_is_not_expired() {
        let now = Utc::now();
        assert!(!is_lock_expired(Some(now - Duration::minutes(1)), now, timeout()));
    }

    #[test]
    fn test_old_lock_is_expired() {
        let now = Utc::now();
        assert!(is_lock_expired(Some(now - Duration::minutes(6)), now, timeout()));
    }

    #[test]
    fn test_lock_exactly_at_timeout_is_not_expired() {
        let now = Utc::now();
        assert!(!is_lock_expired(Some(now - timeout()), now, timeout()));
    }

    // -----------------------------------------------------------------------
    // Status evaluation
    // -----------------------------------------------------------------------

    #[test]
    fn test_no_holder_is_never_locked() {
        let now = Utc::now();
        for locked_at in [None, Some(now), Some(now - Duration::minutes(30))] {
            let fields = LockFields {
                locked_by: None,
                locked_at,
            };
            let status = LockStatus::evaluate(&fields, "bob", now, timeout());
            assert!(!status.is_locked);
            assert!(!status.is_self);
        }
    }

    #[test]
    fn test_expired_lock_blocks_nobody() {
        let now = Utc::now();
        let fields = LockFields::held_by("alice", now - Duration::minutes(6));

        let own = LockStatus::evaluate(&fields, "alice", now, timeout());
        let other = LockStatus::evaluate(&fields, "bob", now, timeout());

        assert!(own.is_expired && !own.is_locked);
        assert!(other.is_expired && !other.is_locked);
    }

    #[test]
    fn test_fresh_lock_blocks_others_but_not_holder() {
        let now = Utc::now();
        let fields = LockFields::held_by("alice", now - Duration::minutes(2));

        let own = LockStatus::evaluate(&fields, "alice", now, timeout());
        assert!(own.is_self);
        assert!(!own.is_locked);

        let other = LockStatus::evaluate(&fields, "bob", now, timeout());
        assert!(!other.is_self);
        assert!(other.is_locked);
        assert_eq!(other.locked_by.as_deref(), Some("alice"));
    }

    #[test]
    fn test_holder_without_timestamp_is_expired() {
        let fields = LockFields {
            locked_by: Some("alice".to_string()),
            locked_at: None,
        };
        assert!(!fields.blocks("bob", Utc::now(), timeout()));
    }

    #[test]
    fn test_policy_stale_before() {
        let now = Utc::now();
        let policy = LockPolicy::with_timeout_secs(60);
        assert_eq!(policy.stale_before(now), now - Duration::seconds(60));
    }

    // -----------------------------------------------------------------------
    // Holder name validation
    // -----------------------------------------------------------------------

    #[test]
    fn test_validate_holder_name() {
        assert!(validate_holder_name("Alice Martin").is_ok());
        assert!(validate_holder_name("").is_err());
        assert!(validate_holder_name("   ").is_err());

        let long = "x".repeat(MAX_HOLDER_NAME_LEN + 1);
        let result = validate_holder_name(&long);
        assert!(result.unwrap_err().contains("at most"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let status = LockStatus::evaluate(&LockFields::default(), "bob", Utc::now(), timeout());
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["is_locked"], false);
        assert_eq!(json["is_expired"], true);
        assert!(json["locked_by"].is_null());
    }
}
