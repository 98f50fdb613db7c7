//! Due-time arithmetic for recurring triggers.

use chrono::{DateTime, Utc};
use jobhub_core::Cadence;
use std::time::Duration;

/// What to do with a planned firing at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireDecision {
    /// The slot is still in the future
    Wait(DateTime<Utc>),
    /// The slot is due and within the grace window
    FireNow,
    /// The slot was missed beyond grace; resume at the given future slot
    Skip(DateTime<Utc>),
}

/// Returns true if `next_run_at` is at or before `now`.
#[must_use]
pub fn is_due(next_run_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    next_run_at <= now
}

/// First firing for a freshly installed trigger.
#[must_use]
pub fn next_run_after(now: DateTime<Utc>, cadence: Cadence) -> DateTime<Utc> {
    now + cadence.as_duration()
}

/// First slot of the series `scheduled + k * cadence` strictly after `now`.
#[must_use]
pub fn next_slot(scheduled: DateTime<Utc>, now: DateTime<Utc>, cadence: Cadence) -> DateTime<Utc> {
    let period = cadence.as_duration();
    if scheduled > now {
        return scheduled;
    }
    let behind = (now - scheduled).num_seconds();
    let step = period.num_seconds().max(1);
    let skipped = behind / step + 1;
    scheduled + period * i32::try_from(skipped).unwrap_or(i32::MAX)
}

/// Decide between waiting, firing, or skipping a planned slot.
#[must_use]
pub fn resolve_next_fire(
    scheduled: DateTime<Utc>,
    now: DateTime<Utc>,
    cadence: Cadence,
    grace: Duration,
) -> FireDecision {
    if !is_due(scheduled, now) {
        return FireDecision::Wait(scheduled);
    }

    let late = (now - scheduled).to_std().unwrap_or(Duration::ZERO);
    if late <= grace {
        FireDecision::FireNow
    } else {
        FireDecision::Skip(next_slot(scheduled, now, cadence))
    }
}
