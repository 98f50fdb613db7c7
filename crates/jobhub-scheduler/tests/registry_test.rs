use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use jobhub_core::{Cadence, PlatformName, SchedulerConfig, SearchCriteria, SearchId};
use jobhub_scheduler::{
    FireOutcome, RunSummary, ScheduleEntry, ScheduleStore, SchedulerRegistry, SearchRunner,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MemoryStore {
    criteria: Mutex<HashMap<SearchId, SearchCriteria>>,
    entries: Mutex<HashMap<SearchId, ScheduleEntry>>,
}

impl MemoryStore {
    fn with_search(self, id: i64, cadence: i64, active: bool) -> Self {
        let now = Utc::now();
        self.criteria.lock().unwrap().insert(
            SearchId::new(id),
            SearchCriteria {
                id: SearchId::new(id),
                keywords: format!("search {id}"),
                job_types: Vec::new(),
                platforms: vec![PlatformName::new("indeed").unwrap()],
                cadence: Cadence::new(cadence),
                is_active: active,
                created_at: now,
                updated_at: now,
            },
        );
        self
    }

    fn with_entry(self, id: i64, cadence: i64, next_run_at: chrono::DateTime<Utc>) -> Self {
        self.entries.lock().unwrap().insert(
            SearchId::new(id),
            ScheduleEntry::new(SearchId::new(id), Cadence::new(cadence), next_run_at),
        );
        self
    }

    fn entry(&self, id: i64) -> Option<ScheduleEntry> {
        self.entries.lock().unwrap().get(&SearchId::new(id)).cloned()
    }

    fn set_active(&self, id: i64, active: bool) {
        if let Some(criteria) = self.criteria.lock().unwrap().get_mut(&SearchId::new(id)) {
            criteria.is_active = active;
        }
    }

    fn set_cadence(&self, id: i64, cadence: i64) {
        if let Some(criteria) = self.criteria.lock().unwrap().get_mut(&SearchId::new(id)) {
            criteria.cadence = Cadence::new(cadence);
        }
    }

    fn remove_search(&self, id: i64) {
        self.criteria.lock().unwrap().remove(&SearchId::new(id));
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn load_criteria(
        &self,
        search_id: SearchId,
    ) -> jobhub_scheduler::Result<Option<SearchCriteria>> {
        Ok(self.criteria.lock().unwrap().get(&search_id).cloned())
    }

    async fn active_search_ids(&self) -> jobhub_scheduler::Result<Vec<SearchId>> {
        Ok(self
            .criteria
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.is_active)
            .map(|c| c.id)
            .collect())
    }

    async fn load_entries(&self) -> jobhub_scheduler::Result<Vec<ScheduleEntry>> {
        Ok(self.entries.lock().unwrap().values().cloned().collect())
    }

    async fn upsert_entry(&self, entry: &ScheduleEntry) -> jobhub_scheduler::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(entry.search_id, entry.clone());
        Ok(())
    }

    async fn remove_entry(&self, search_id: SearchId) -> jobhub_scheduler::Result<bool> {
        Ok(self.entries.lock().unwrap().remove(&search_id).is_some())
    }
}

/// Counts runs and tracks the peak number running at once.
struct CountingRunner {
    delay: Duration,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl CountingRunner {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchRunner for CountingRunner {
    async fn run(&self, _search_id: SearchId) -> RunSummary {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        RunSummary {
            success: true,
            duration: self.delay,
            error: None,
        }
    }
}

fn config(max_concurrent_runs: usize) -> SchedulerConfig {
    SchedulerConfig {
        max_concurrent_runs,
        ..SchedulerConfig::default()
    }
}

async fn wait_for_calls(runner: &CountingRunner, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while runner.calls() < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("runs did not finish in time");
}

#[tokio::test]
async fn test_schedule_active_search() {
    let store = Arc::new(MemoryStore::default().with_search(1, 15, true));
    let runner = Arc::new(CountingRunner::new(Duration::ZERO));
    let registry = SchedulerRegistry::new(store.clone(), runner, &config(3));

    let before = Utc::now();
    assert!(registry.schedule(SearchId::new(1)).await);

    let scheduled = registry.list_scheduled();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].search_id, SearchId::new(1));
    assert!(scheduled[0].next_run_at >= before + ChronoDuration::minutes(15));
    assert!(store.entry(1).is_some());
}

#[tokio::test]
async fn test_schedule_is_idempotent() {
    let store = Arc::new(MemoryStore::default().with_search(1, 15, true));
    let runner = Arc::new(CountingRunner::new(Duration::ZERO));
    let registry = SchedulerRegistry::new(store, runner, &config(3));

    assert!(registry.schedule(SearchId::new(1)).await);
    assert!(registry.schedule(SearchId::new(1)).await);
    assert_eq!(registry.scheduled_count(), 1);
}

#[tokio::test]
async fn test_schedule_rejects_missing_and_inactive() {
    let store = Arc::new(MemoryStore::default().with_search(2, 15, false));
    let runner = Arc::new(CountingRunner::new(Duration::ZERO));
    let registry = SchedulerRegistry::new(store.clone(), runner, &config(3));

    assert!(!registry.schedule(SearchId::new(1)).await);
    assert!(!registry.schedule(SearchId::new(2)).await);
    assert_eq!(registry.scheduled_count(), 0);
    assert!(store.entry(2).is_none());
}

#[tokio::test]
async fn test_unschedule() {
    let store = Arc::new(MemoryStore::default().with_search(1, 15, true));
    let runner = Arc::new(CountingRunner::new(Duration::ZERO));
    let registry = SchedulerRegistry::new(store.clone(), runner, &config(3));

    assert!(!registry.unschedule(SearchId::new(1)).await);

    registry.schedule(SearchId::new(1)).await;
    assert!(registry.unschedule(SearchId::new(1)).await);
    assert!(!registry.is_scheduled(SearchId::new(1)));
    assert!(store.entry(1).is_none());
}

#[tokio::test]
async fn test_firing_while_running_is_coalesced() {
    let store = Arc::new(MemoryStore::default());
    let runner = Arc::new(CountingRunner::new(Duration::from_millis(100)));
    let registry = SchedulerRegistry::new(store, runner.clone(), &config(3));
    let id = SearchId::new(4);

    assert_eq!(registry.fire(id), FireOutcome::Started);
    assert_eq!(registry.fire(id), FireOutcome::Coalesced);
    assert_eq!(registry.fire(id), FireOutcome::Coalesced);

    wait_for_calls(&runner, 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(runner.calls(), 1);
    assert!(!registry.is_in_flight(id));

    // Once the run has finished the search can fire again
    assert_eq!(registry.fire(id), FireOutcome::Started);
    wait_for_calls(&runner, 2).await;
}

#[tokio::test]
async fn test_run_now_while_running_reports_already_running() {
    let store = Arc::new(MemoryStore::default());
    let runner = Arc::new(CountingRunner::new(Duration::from_millis(100)));
    let registry = SchedulerRegistry::new(store, runner.clone(), &config(3));
    let id = SearchId::new(5);

    assert_eq!(registry.fire(id), FireOutcome::Started);
    let summary = registry.run_now(id).await;

    assert!(!summary.success);
    assert_eq!(summary.error.as_deref(), Some("already running"));
    wait_for_calls(&runner, 1).await;
}

#[tokio::test]
async fn test_run_now_returns_runner_summary() {
    let store = Arc::new(MemoryStore::default());
    let runner = Arc::new(CountingRunner::new(Duration::from_millis(10)));
    let registry = SchedulerRegistry::new(store, runner.clone(), &config(3));

    let summary = registry.run_now(SearchId::new(6)).await;

    assert!(summary.success);
    assert_eq!(summary.duration, Duration::from_millis(10));
    assert_eq!(runner.calls(), 1);
}

#[tokio::test]
async fn test_concurrency_ceiling() {
    let store = Arc::new(MemoryStore::default());
    let runner = Arc::new(CountingRunner::new(Duration::from_millis(40)));
    let registry = SchedulerRegistry::new(store, runner.clone(), &config(2));

    for id in 1..=5 {
        assert_eq!(registry.fire(SearchId::new(id)), FireOutcome::Started);
    }

    wait_for_calls(&runner, 5).await;
    assert_eq!(runner.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_trigger_fires_every_cadence() {
    let store = Arc::new(MemoryStore::default().with_search(1, 5, true));
    let runner = Arc::new(CountingRunner::new(Duration::ZERO));
    let registry = SchedulerRegistry::new(store.clone(), runner.clone(), &config(3));

    assert!(registry.schedule(SearchId::new(1)).await);
    let first = registry.list_scheduled()[0].next_run_at;

    tokio::time::sleep(Duration::from_secs(4 * 60)).await;
    assert_eq!(runner.calls(), 0);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(runner.calls(), 1);

    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    assert_eq!(runner.calls(), 2);

    let next = registry.list_scheduled()[0].next_run_at;
    assert!(next > first);
    assert_eq!(store.entry(1).unwrap().next_run_at, next);
}

#[tokio::test(start_paused = true)]
async fn test_trigger_retires_when_search_deactivated_or_deleted() {
    let store = Arc::new(
        MemoryStore::default()
            .with_search(1, 5, true)
            .with_search(2, 5, true),
    );
    let runner = Arc::new(CountingRunner::new(Duration::ZERO));
    let registry = SchedulerRegistry::new(store.clone(), runner.clone(), &config(3));

    assert!(registry.schedule(SearchId::new(1)).await);
    assert!(registry.schedule(SearchId::new(2)).await);

    tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
    assert_eq!(runner.calls(), 2);

    store.set_active(1, false);
    store.remove_search(2);

    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    assert_eq!(runner.calls(), 2);
    assert!(!registry.is_scheduled(SearchId::new(1)));
    assert!(!registry.is_scheduled(SearchId::new(2)));
    assert!(store.entry(1).is_none());
    assert!(store.entry(2).is_none());

    tokio::time::sleep(Duration::from_secs(15 * 60)).await;
    assert_eq!(runner.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_trigger_follows_cadence_change() {
    let store = Arc::new(MemoryStore::default().with_search(1, 5, true));
    let runner = Arc::new(CountingRunner::new(Duration::ZERO));
    let registry = SchedulerRegistry::new(store.clone(), runner.clone(), &config(3));

    assert!(registry.schedule(SearchId::new(1)).await);

    tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
    assert_eq!(runner.calls(), 1);

    store.set_cadence(1, 10);

    // The slot already planned at 10 minutes still fires, then every 10 minutes
    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    assert_eq!(runner.calls(), 2);

    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    assert_eq!(runner.calls(), 2);

    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    assert_eq!(runner.calls(), 3);

    assert_eq!(registry.list_scheduled()[0].cadence, Cadence::new(10));
    assert_eq!(store.entry(1).unwrap().cadence, Cadence::new(10));
}

#[tokio::test]
async fn test_shutdown_fails_queued_runs() {
    let store = Arc::new(MemoryStore::default());
    let runner = Arc::new(CountingRunner::new(Duration::from_millis(100)));
    let registry = SchedulerRegistry::new(store, runner.clone(), &config(1));

    assert_eq!(registry.fire(SearchId::new(1)), FireOutcome::Started);
    assert_eq!(registry.fire(SearchId::new(2)), FireOutcome::Started);
    tokio::time::sleep(Duration::from_millis(10)).await;

    registry.shutdown();

    // The run holding the permit finishes, the queued one never starts
    wait_for_calls(&runner, 1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(runner.calls(), 1);
    assert!(!registry.is_in_flight(SearchId::new(2)));

    let summary = registry.run_now(SearchId::new(3)).await;
    assert_eq!(summary.error.as_deref(), Some("scheduler is shut down"));
    assert!(registry.start().await.is_err());
}

#[tokio::test]
async fn test_start_reconciles_entries() {
    let now = Utc::now();
    let store = Arc::new(
        MemoryStore::default()
            .with_search(1, 15, true)
            .with_search(2, 15, false)
            .with_search(3, 30, true)
            .with_entry(2, 15, now + ChronoDuration::minutes(5))
            .with_entry(9, 15, now + ChronoDuration::minutes(5))
            .with_entry(3, 30, now + ChronoDuration::minutes(10)),
    );
    let runner = Arc::new(CountingRunner::new(Duration::ZERO));
    let registry = SchedulerRegistry::new(store.clone(), runner, &config(3));

    let installed = registry.start().await.unwrap();

    assert_eq!(installed, 2);
    assert!(registry.is_running());
    assert!(store.entry(2).is_none());
    assert!(store.entry(9).is_none());

    let scheduled = registry.list_scheduled();
    let ids: Vec<i64> = scheduled.iter().map(|s| s.search_id.get()).collect();
    assert_eq!(ids, vec![1, 3]);
    // Persisted future slot is kept
    assert_eq!(scheduled[1].next_run_at, now + ChronoDuration::minutes(10));

    registry.shutdown();
    assert!(!registry.is_running());
    assert_eq!(registry.scheduled_count(), 0);
    // Durable entries survive shutdown
    assert!(store.entry(1).is_some());
}

#[tokio::test]
async fn test_start_skips_firing_missed_beyond_grace() {
    let now = Utc::now();
    let store = Arc::new(
        MemoryStore::default()
            .with_search(1, 15, true)
            .with_entry(1, 15, now - ChronoDuration::hours(3)),
    );
    let runner = Arc::new(CountingRunner::new(Duration::ZERO));
    let registry = SchedulerRegistry::new(store, runner.clone(), &config(3));

    registry.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(runner.calls(), 0);
    let next = registry.list_scheduled()[0].next_run_at;
    assert!(next > now);
    assert!(next <= now + ChronoDuration::minutes(15));
}

#[tokio::test]
async fn test_start_fires_firing_missed_within_grace() {
    let now = Utc::now();
    let store = Arc::new(
        MemoryStore::default()
            .with_search(1, 15, true)
            .with_entry(1, 15, now - ChronoDuration::minutes(1)),
    );
    let runner = Arc::new(CountingRunner::new(Duration::ZERO));
    let registry = SchedulerRegistry::new(store, runner.clone(), &config(3));

    registry.start().await.unwrap();
    wait_for_calls(&runner, 1).await;

    assert_eq!(runner.calls(), 1);
}
