//! Background jobs.
//!
//! Jobs run on their own tokio task and stop when their
//! [`CancellationToken`](tokio_util::sync::CancellationToken) fires.

pub mod lock_sweep;
