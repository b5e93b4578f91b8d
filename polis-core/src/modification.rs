//! Per-request modification timestamp accumulator.
//!
//! Data-access code running inside a request reports every record it reads via
//! [`ModificationTracker::touch`]. At the end of the request, policies read the
//! most recent timestamp with [`ModificationTracker::latest`] to derive
//! `Last-Modified` and `ETag` headers.
//!
//! The tracker is a cheap handle: clones share the same accumulator, so one
//! clone can live in the request extensions while another is kept by the
//! pipeline stage that applies policies.
//!
//! ```
//! use polis_core::ModificationTracker;
//!
//! let tracker = ModificationTracker::new();
//! tracker.touch_timestamp(120);
//! tracker.touch_timestamp(60);
//! tracker.touch_timestamp(180);
//!
//! // The most recent touch wins, not the last one recorded.
//! assert_eq!(tracker.latest().map(|t| t.timestamp()), Some(180));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

const UNTOUCHED: i64 = i64::MIN;

/// Accumulates the maximum modification timestamp seen during one request.
#[derive(Clone)]
pub struct ModificationTracker {
    latest: Arc<AtomicI64>,
}

impl ModificationTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self {
            latest: Arc::new(AtomicI64::new(UNTOUCHED)),
        }
    }

    /// Records that content modified at `modified` contributed to the response.
    pub fn touch(&self, modified: DateTime<Utc>) {
        self.touch_timestamp(modified.timestamp());
    }

    /// Records a modification time given in Unix seconds.
    pub fn touch_timestamp(&self, seconds: i64) {
        self.latest.fetch_max(seconds, Ordering::AcqRel);
    }

    /// Returns the most recent modification time recorded so far.
    pub fn latest(&self) -> Option<DateTime<Utc>> {
        match self.latest.load(Ordering::Acquire) {
            UNTOUCHED => None,
            seconds => DateTime::from_timestamp(seconds, 0),
        }
    }

    /// Forgets every recorded touch.
    pub fn reset(&self) {
        self.latest.store(UNTOUCHED, Ordering::Release);
    }
}

impl Default for ModificationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModificationTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModificationTracker")
            .field("latest", &self.latest())
            .finish()
    }
}
