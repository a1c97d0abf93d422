//! Source of synthetic user ids for pods that specify none.
//!
//! The range is high enough to stay clear of system and service accounts
//! on any real node.

use std::ops::RangeInclusive;

use rand::Rng;

/// Lowest user id handed out by default
pub const MIN_DEFAULT_UID: i64 = 1_000_000_000;
/// Highest user id handed out by default
pub const MAX_DEFAULT_UID: i64 = 1_000_999_998;
/// Inclusive range of default user ids
pub const DEFAULT_UID_RANGE: RangeInclusive<i64> = MIN_DEFAULT_UID..=MAX_DEFAULT_UID;

/// Supplies user ids for pods without `runAsUser`.
///
/// Implementations are shared across concurrent requests.
pub trait UidSource: Send + Sync {
    /// Return a user id inside [`DEFAULT_UID_RANGE`]
    fn next_uid(&self) -> i64;
}

/// Uniformly random ids drawn from the thread-local generator.
///
/// Each worker thread has its own independently seeded generator, so no
/// locking is needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomUids;

impl UidSource for RandomUids {
    fn next_uid(&self) -> i64 {
        rand::rng().random_range(DEFAULT_UID_RANGE)
    }
}

impl<F> UidSource for F
where
    F: Fn() -> i64 + Send + Sync,
{
    fn next_uid(&self) -> i64 {
        self()
    }
}
