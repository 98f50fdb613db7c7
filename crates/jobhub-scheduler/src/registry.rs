//! Per-search recurring triggers with coalescing and a concurrency ceiling.

use crate::entry::{FireOutcome, RunSummary, ScheduleEntry, ScheduledSearch};
use crate::error::{Result, SchedulerError};
use crate::store::{ScheduleStore, SearchRunner};
use crate::timing::{next_run_after, resolve_next_fire, FireDecision};
use chrono::{DateTime, Utc};
use jobhub_core::{Cadence, SchedulerConfig, SearchId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

struct Trigger {
    cadence: Cadence,
    next_run_at: Arc<Mutex<DateTime<Utc>>>,
    task: JoinHandle<()>,
}

struct Shared {
    store: Arc<dyn ScheduleStore>,
    runner: Arc<dyn SearchRunner>,
    grace: Duration,
    permits: Semaphore,
    in_flight: Mutex<HashSet<SearchId>>,
    triggers: Mutex<HashMap<SearchId, Trigger>>,
    running: AtomicBool,
}

/// What a trigger does when its deadline arrives.
enum TriggerCheck {
    /// Fire with the search's current cadence
    Fire(Cadence),
    /// The search is gone or inactive
    Retire,
}

/// Releases the per-search claim when the run ends, even on panic.
struct InFlightGuard {
    shared: Arc<Shared>,
    search_id: SearchId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.shared
            .in_flight
            .lock()
            .expect("acquire in-flight lock")
            .remove(&self.search_id);
    }
}

impl Shared {
    fn claim(self: &Arc<Self>, search_id: SearchId) -> Option<InFlightGuard> {
        let mut in_flight = self.in_flight.lock().expect("acquire in-flight lock");
        if !in_flight.insert(search_id) {
            return None;
        }
        Some(InFlightGuard {
            shared: Arc::clone(self),
            search_id,
        })
    }

    async fn execute(&self, search_id: SearchId, guard: InFlightGuard) -> RunSummary {
        let Ok(_permit) = self.permits.acquire().await else {
            return RunSummary::failed("scheduler is shut down");
        };

        debug!(search_id = %search_id, "starting search run");
        let summary = self.runner.run(search_id).await;
        drop(guard);
        summary
    }

    fn fire(self: &Arc<Self>, search_id: SearchId) -> FireOutcome {
        let Some(guard) = self.claim(search_id) else {
            info!(search_id = %search_id, "previous run still active, skipping firing");
            return FireOutcome::Coalesced;
        };

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let summary = shared.execute(search_id, guard).await;
            if summary.success {
                info!(
                    search_id = %search_id,
                    duration_ms = summary.duration.as_millis(),
                    "scheduled run finished"
                );
            } else {
                warn!(
                    search_id = %search_id,
                    error = summary.error.as_deref().unwrap_or("unknown"),
                    "scheduled run finished with errors"
                );
            }
        });

        FireOutcome::Started
    }

    async fn check_trigger(&self, search_id: SearchId, cadence: Cadence) -> TriggerCheck {
        match self.store.load_criteria(search_id).await {
            Ok(Some(criteria)) if criteria.is_active => TriggerCheck::Fire(criteria.cadence),
            Ok(Some(_)) => {
                info!(search_id = %search_id, "search deactivated, removing trigger");
                TriggerCheck::Retire
            }
            Ok(None) => {
                info!(search_id = %search_id, "search deleted, removing trigger");
                TriggerCheck::Retire
            }
            Err(e) => {
                warn!(
                    search_id = %search_id,
                    error = %e,
                    "failed to reload search criteria, keeping trigger"
                );
                TriggerCheck::Fire(cadence)
            }
        }
    }

    /// Whether `slot` belongs to the trigger currently installed for the search.
    fn owns(
        triggers: &HashMap<SearchId, Trigger>,
        search_id: SearchId,
        slot: &Arc<Mutex<DateTime<Utc>>>,
    ) -> bool {
        triggers
            .get(&search_id)
            .is_some_and(|trigger| Arc::ptr_eq(&trigger.next_run_at, slot))
    }

    async fn retire(&self, search_id: SearchId, slot: &Arc<Mutex<DateTime<Utc>>>) {
        {
            let mut triggers = self.triggers.lock().expect("acquire triggers lock");
            if !Self::owns(&triggers, search_id, slot) {
                return;
            }
            triggers.remove(&search_id);
        }

        if let Err(e) = self.store.remove_entry(search_id).await {
            warn!(search_id = %search_id, error = %e, "failed to delete schedule entry");
        }
    }

    fn update_cadence(
        &self,
        search_id: SearchId,
        slot: &Arc<Mutex<DateTime<Utc>>>,
        cadence: Cadence,
    ) {
        let mut triggers = self.triggers.lock().expect("acquire triggers lock");
        if Self::owns(&triggers, search_id, slot) {
            if let Some(trigger) = triggers.get_mut(&search_id) {
                trigger.cadence = cadence;
            }
        }
    }
}

fn instant_for(at: DateTime<Utc>) -> Instant {
    Instant::now() + (at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}

fn wall_clock_for(deadline: Instant) -> DateTime<Utc> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    Utc::now() + chrono::Duration::from_std(remaining).unwrap_or_else(|_| chrono::Duration::zero())
}

/// Timer loop for one search.
///
/// Criteria are reloaded before every firing: a deleted or deactivated
/// search loses its trigger and durable entry, and a new cadence takes
/// effect from the next slot.
async fn run_trigger(
    shared: Arc<Shared>,
    search_id: SearchId,
    mut cadence: Cadence,
    first_fire: DateTime<Utc>,
    next_run_at: Arc<Mutex<DateTime<Utc>>>,
) {
    let mut deadline = instant_for(first_fire);

    loop {
        tokio::time::sleep_until(deadline).await;

        let late = Instant::now().saturating_duration_since(deadline);
        match shared.check_trigger(search_id, cadence).await {
            TriggerCheck::Retire => {
                shared.retire(search_id, &next_run_at).await;
                return;
            }
            TriggerCheck::Fire(current) if current != cadence => {
                info!(
                    search_id = %search_id,
                    from = %cadence,
                    to = %current,
                    "cadence changed, adjusting trigger"
                );
                cadence = current;
                shared.update_cadence(search_id, &next_run_at, cadence);
            }
            TriggerCheck::Fire(_) => {}
        }

        if late <= shared.grace {
            shared.fire(search_id);
        } else {
            warn!(
                search_id = %search_id,
                late_secs = late.as_secs(),
                "missed firing beyond grace window, skipping"
            );
        }

        let period = cadence.as_std();
        let now = Instant::now();
        while deadline <= now {
            deadline += period;
        }

        let next = wall_clock_for(deadline);
        *next_run_at.lock().expect("acquire next-run lock") = next;
        if let Err(e) = shared
            .store
            .upsert_entry(&ScheduleEntry::new(search_id, cadence, next))
            .await
        {
            warn!(search_id = %search_id, error = %e, "failed to persist next run time");
        }
    }
}

/// Owns one timer task per scheduled search.
///
/// Each firing runs as its own task. A search never has more than one run
/// in flight, and at most `max_concurrent_runs` runs execute at once across
/// all searches.
pub struct SchedulerRegistry {
    shared: Arc<Shared>,
}

impl SchedulerRegistry {
    /// Create a registry. Nothing is installed until [`start`](Self::start)
    /// or [`schedule`](Self::schedule) is called.
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        runner: Arc<dyn SearchRunner>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                runner,
                grace: config.misfire_grace(),
                permits: Semaphore::new(config.max_concurrent_runs.max(1)),
                in_flight: Mutex::new(HashSet::new()),
                triggers: Mutex::new(HashMap::new()),
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Reconcile persisted entries against active searches and install
    /// their triggers. Returns the number of installed triggers.
    ///
    /// Fails with [`SchedulerError::Stopped`] once the registry has been
    /// shut down.
    pub async fn start(&self) -> Result<usize> {
        if self.shared.permits.is_closed() {
            return Err(SchedulerError::Stopped);
        }
        let store = &self.shared.store;
        let active: HashSet<SearchId> = store.active_search_ids().await?.into_iter().collect();
        let entries: HashMap<SearchId, ScheduleEntry> = store
            .load_entries()
            .await?
            .into_iter()
            .map(|entry| (entry.search_id, entry))
            .collect();

        let mut removed = 0;
        for search_id in entries.keys().filter(|id| !active.contains(id)) {
            store.remove_entry(*search_id).await?;
            removed += 1;
        }

        let mut ids: Vec<SearchId> = active.into_iter().collect();
        ids.sort();

        let now = Utc::now();
        let mut installed = 0;
        for search_id in ids {
            let Some(criteria) = store.load_criteria(search_id).await? else {
                continue;
            };
            let cadence = criteria.cadence;

            let first_fire = match entries.get(&search_id) {
                Some(entry) => match resolve_next_fire(entry.next_run_at, now, cadence, self.shared.grace) {
                    FireDecision::Wait(at) => at.min(next_run_after(now, cadence)),
                    FireDecision::FireNow => now,
                    FireDecision::Skip(at) => {
                        info!(
                            search_id = %search_id,
                            missed = %entry.next_run_at,
                            resume_at = %at,
                            "firing missed while stopped, resuming at next slot"
                        );
                        at
                    }
                },
                None => next_run_after(now, cadence),
            };

            store
                .upsert_entry(&ScheduleEntry::new(search_id, cadence, first_fire))
                .await?;
            self.install(search_id, cadence, first_fire);
            installed += 1;
        }

        self.shared.running.store(true, Ordering::SeqCst);
        info!(installed, removed, "scheduler started");
        Ok(installed)
    }

    /// Install or replace the trigger for a search.
    ///
    /// Returns `false` when the search is missing or inactive, the store
    /// could not be read, or the registry has been shut down.
    pub async fn schedule(&self, search_id: SearchId) -> bool {
        if self.shared.permits.is_closed() {
            warn!(search_id = %search_id, "scheduler is shut down, not scheduling");
            return false;
        }
        let criteria = match self.shared.store.load_criteria(search_id).await {
            Ok(Some(criteria)) if criteria.is_active => criteria,
            Ok(Some(_)) => {
                info!(search_id = %search_id, "search is inactive, not scheduling");
                return false;
            }
            Ok(None) => {
                warn!(search_id = %search_id, "search not found, not scheduling");
                return false;
            }
            Err(e) => {
                error!(search_id = %search_id, error = %e, "failed to load search criteria");
                return false;
            }
        };

        let first_fire = next_run_after(Utc::now(), criteria.cadence);
        if let Err(e) = self
            .shared
            .store
            .upsert_entry(&ScheduleEntry::new(search_id, criteria.cadence, first_fire))
            .await
        {
            error!(search_id = %search_id, error = %e, "failed to persist schedule entry");
            return false;
        }

        self.install(search_id, criteria.cadence, first_fire);
        info!(
            search_id = %search_id,
            cadence = %criteria.cadence,
            next_run_at = %first_fire,
            "search scheduled"
        );
        true
    }

    /// Remove the trigger and the durable entry. Returns `false` when
    /// nothing was scheduled.
    pub async fn unschedule(&self, search_id: SearchId) -> bool {
        let trigger = self
            .shared
            .triggers
            .lock()
            .expect("acquire triggers lock")
            .remove(&search_id);
        let removed_trigger = match trigger {
            Some(trigger) => {
                trigger.task.abort();
                true
            }
            None => false,
        };

        let removed_entry = match self.shared.store.remove_entry(search_id).await {
            Ok(removed) => removed,
            Err(e) => {
                error!(search_id = %search_id, error = %e, "failed to delete schedule entry");
                false
            }
        };

        if removed_trigger || removed_entry {
            info!(search_id = %search_id, "search unscheduled");
        }
        removed_trigger || removed_entry
    }

    /// Fire a search now without waiting for the run. Coalesced when the
    /// search already has a run in flight.
    pub fn fire(&self, search_id: SearchId) -> FireOutcome {
        self.shared.fire(search_id)
    }

    /// Run a search now and wait for it, honoring per-search exclusion and
    /// the concurrency ceiling.
    pub async fn run_now(&self, search_id: SearchId) -> RunSummary {
        let Some(guard) = self.shared.claim(search_id) else {
            info!(search_id = %search_id, "manual run requested while already running");
            return RunSummary::failed("already running");
        };

        info!(search_id = %search_id, "manual run requested");
        self.shared.execute(search_id, guard).await
    }

    /// Installed triggers, ordered by search id.
    #[must_use]
    pub fn list_scheduled(&self) -> Vec<ScheduledSearch> {
        let triggers = self.shared.triggers.lock().expect("acquire triggers lock");
        let mut scheduled: Vec<ScheduledSearch> = triggers
            .iter()
            .map(|(search_id, trigger)| ScheduledSearch {
                search_id: *search_id,
                cadence: trigger.cadence,
                next_run_at: *trigger.next_run_at.lock().expect("acquire next-run lock"),
            })
            .collect();
        scheduled.sort_by_key(|s| s.search_id);
        scheduled
    }

    /// Number of installed triggers.
    #[must_use]
    pub fn scheduled_count(&self) -> usize {
        self.shared.triggers.lock().expect("acquire triggers lock").len()
    }

    /// Whether a trigger is installed for the search.
    #[must_use]
    pub fn is_scheduled(&self, search_id: SearchId) -> bool {
        self.shared
            .triggers
            .lock()
            .expect("acquire triggers lock")
            .contains_key(&search_id)
    }

    /// Whether the search has a run in flight.
    #[must_use]
    pub fn is_in_flight(&self, search_id: SearchId) -> bool {
        self.shared
            .in_flight
            .lock()
            .expect("acquire in-flight lock")
            .contains(&search_id)
    }

    /// Whether [`start`](Self::start) has completed and `shutdown` has not
    /// been called since.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Abort every timer and refuse further runs. Durable entries are kept
    /// for the next process; runs already holding a permit finish, queued
    /// runs fail. A registry cannot be restarted after shutdown.
    pub fn shutdown(&self) {
        let mut triggers = self.shared.triggers.lock().expect("acquire triggers lock");
        let count = triggers.len();
        for (_, trigger) in triggers.drain() {
            trigger.task.abort();
        }
        self.shared.permits.close();
        self.shared.running.store(false, Ordering::SeqCst);
        info!(timers = count, "scheduler stopped");
    }

    fn install(&self, search_id: SearchId, cadence: Cadence, first_fire: DateTime<Utc>) {
        let next_run_at = Arc::new(Mutex::new(first_fire));
        let task = tokio::spawn(run_trigger(
            Arc::clone(&self.shared),
            search_id,
            cadence,
            first_fire,
            Arc::clone(&next_run_at),
        ));

        let previous = self
            .shared
            .triggers
            .lock()
            .expect("acquire triggers lock")
            .insert(
                search_id,
                Trigger {
                    cadence,
                    next_run_at,
                    task,
                },
            );
        if let Some(previous) = previous {
            previous.task.abort();
            debug!(search_id = %search_id, "replaced existing trigger");
        }
    }
}

impl Drop for SchedulerRegistry {
    fn drop(&mut self) {
        if let Ok(mut triggers) = self.shared.triggers.lock() {
            for (_, trigger) in triggers.drain() {
                trigger.task.abort();
            }
        }
    }
}
