//! End-to-end monitor behaviour against a real CSV log on disk.

use chargewatch::clock::ManualClock;
use chargewatch::notify::{AlertChannel, Notifier, TransportError};
use chargewatch::reconcile::{MonitorSnapshot, Reconciler, RunContext};
use chargewatch::scheduler::run_monitor_loop;
use chargewatch::status::{RawStatuses, SourceError, StatusSource};
use chargewatch::storage::{CsvTransitionLog, Segmenting, TransitionStore};
use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Serves queued polls; repeats the last one when the queue runs dry.
#[derive(Default)]
struct FakeSource {
    queue: Mutex<VecDeque<RawStatuses>>,
    last: Mutex<Option<RawStatuses>>,
}

impl FakeSource {
    fn push(&self, poll: &[(&str, &str)]) {
        let poll = poll
            .iter()
            .map(|(id, s)| (id.to_string(), s.to_string()))
            .collect();
        self.queue.lock().unwrap().push_back(poll);
    }
}

#[async_trait::async_trait]
impl StatusSource for FakeSource {
    async fn fetch(&self) -> Result<RawStatuses, SourceError> {
        let next = self.queue.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(poll) = next {
            *last = Some(poll);
        }
        last.clone()
            .ok_or_else(|| SourceError::Unavailable("no poll scripted".into()))
    }
}

#[derive(Default)]
struct Inbox {
    batches: Mutex<Vec<Vec<String>>>,
}

#[async_trait::async_trait]
impl AlertChannel for Inbox {
    fn name(&self) -> &'static str {
        "inbox"
    }

    async fn deliver(&self, _header: &str, blocks: &[String]) -> Result<(), TransportError> {
        self.batches.lock().unwrap().push(blocks.to_vec());
        Ok(())
    }
}

impl Inbox {
    fn alert_count(&self) -> usize {
        self.batches.lock().unwrap().iter().map(Vec::len).sum()
    }
}

fn tz() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap()
}

fn start() -> DateTime<FixedOffset> {
    tz().with_ymd_and_hms(2025, 11, 30, 23, 54, 0).unwrap()
}

fn open_log(dir: &Path) -> Arc<CsvTransitionLog> {
    Arc::new(CsvTransitionLog::new(
        dir.join("charger_log.csv"),
        Segmenting::Monthly,
        tz(),
    ))
}

struct Process {
    source: Arc<FakeSource>,
    inbox: Arc<Inbox>,
    clock: Arc<ManualClock>,
    log: Arc<CsvTransitionLog>,
    reconciler: Reconciler,
}

fn spawn_process(dir: &Path, now: DateTime<FixedOffset>) -> Process {
    let source = Arc::new(FakeSource::default());
    let inbox = Arc::new(Inbox::default());
    let clock = Arc::new(ManualClock::new(now));
    let log = open_log(dir);
    let reconciler = Reconciler::new(
        source.clone(),
        log.clone(),
        Notifier::new(inbox.clone(), 10, std::time::Duration::ZERO),
        clock.clone(),
    );
    Process {
        source,
        inbox,
        clock,
        log,
        reconciler,
    }
}

#[tokio::test]
async fn test_restart_resumes_from_log() {
    let dir = tempfile::tempdir().unwrap();

    // First process lifetime.
    let p1 = spawn_process(dir.path(), start());
    let mut ctx = RunContext::restore(&*p1.log).unwrap();
    assert!(ctx.states().is_empty());

    p1.source.push(&[("A", "Available"), ("B", "Charging")]);
    p1.reconciler.tick(&mut ctx).await.unwrap();
    assert_eq!(p1.inbox.alert_count(), 0);

    p1.clock.advance(Duration::minutes(9));
    p1.source.push(&[("A", "Unavailable"), ("B", "Charging")]);
    let report = p1.reconciler.tick(&mut ctx).await.unwrap();
    assert_eq!(report.transitions.len(), 1);
    assert_eq!(report.transitions[0].duration.as_deref(), Some("9 minutes"));
    assert_eq!(p1.inbox.alert_count(), 1);
    let before_crash = ctx.states().clone();
    drop(ctx);

    // The second tick crossed into December, so two segments exist.
    assert!(dir.path().join("2025-11_charger_log.csv").exists());
    assert!(dir.path().join("2025-12_charger_log.csv").exists());

    // Second process lifetime.
    let p2 = spawn_process(dir.path(), start() + Duration::minutes(30));
    let mut ctx = RunContext::restore(&*p2.log).unwrap();
    assert_eq!(ctx.states(), &before_crash);
    assert_eq!(ctx.state("A").unwrap().status, "offline");

    // Recovery on the first tick of the new process is logged, not alerted.
    p2.source.push(&[("A", "Available"), ("B", "Charging")]);
    let report = p2.reconciler.tick(&mut ctx).await.unwrap();
    assert_eq!(report.transitions.len(), 1);
    assert_eq!(report.transitions[0].old_status.as_deref(), Some("offline"));
    assert_eq!(report.transitions[0].duration.as_deref(), Some("21 minutes"));
    assert_eq!(p2.inbox.alert_count(), 0);

    // Nothing changes on the next poll: no new rows.
    let rows_before = p2.log.records().unwrap().len();
    p2.clock.advance(Duration::minutes(3));
    let report = p2.reconciler.tick(&mut ctx).await.unwrap();
    assert!(report.transitions.is_empty());
    assert_eq!(p2.log.records().unwrap().len(), rows_before);
    assert_eq!(rows_before, 4);
}

#[tokio::test]
async fn test_log_matches_memory_and_replay_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let p = spawn_process(dir.path(), start());
    let mut ctx = RunContext::default();

    p.source.push(&[("A", "Available"), ("B", "Charging"), ("C", "Faulted")]);
    p.source.push(&[("A", "Preparing"), ("B", "Finishing"), ("C", "Faulted")]);
    p.source.push(&[("A", "Charging"), ("B", "Available"), ("C", "Mystery")]);
    for _ in 0..3 {
        p.reconciler.tick(&mut ctx).await.unwrap();
        p.clock.advance(Duration::minutes(3));
    }

    let first = p.log.reconstruct_latest().unwrap();
    let second = p.log.reconstruct_latest().unwrap();
    assert_eq!(first, second);
    assert_eq!(&first, ctx.states());
    assert_eq!(first["C"].status, "unknown:Mystery");
}

#[tokio::test]
async fn test_clock_stepping_back_keeps_log_and_memory_in_step() {
    let dir = tempfile::tempdir().unwrap();
    let now = tz().with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap();
    let p = spawn_process(dir.path(), now);
    let mut ctx = RunContext::default();

    p.source.push(&[("A", "Available")]);
    p.reconciler.tick(&mut ctx).await.unwrap();

    // NTP pulls the wall clock back before the next poll.
    p.clock.set(now - Duration::minutes(10));
    p.source.push(&[("A", "Unavailable")]);
    let report = p.reconciler.tick(&mut ctx).await.unwrap();
    assert_eq!(report.transitions[0].timestamp, now);
    assert_eq!(report.transitions[0].duration.as_deref(), Some("0 minutes"));
    assert_eq!(ctx.state("A").unwrap().status, "offline");

    let replayed = p.log.reconstruct_latest().unwrap();
    assert_eq!(&replayed, ctx.states());
}

#[tokio::test]
async fn test_many_offline_alerts_are_batched() {
    let dir = tempfile::tempdir().unwrap();
    let p = spawn_process(dir.path(), start());
    let ids: Vec<String> = (0..23).map(|i| format!("CP-{i:02}")).collect();

    let online: Vec<(&str, &str)> = ids.iter().map(|id| (id.as_str(), "Available")).collect();
    let offline: Vec<(&str, &str)> = ids.iter().map(|id| (id.as_str(), "Unavailable")).collect();
    p.source.push(&online);
    p.source.push(&offline);

    let mut ctx = RunContext::default();
    p.reconciler.tick(&mut ctx).await.unwrap();
    p.clock.advance(Duration::minutes(3));
    let report = p.reconciler.tick(&mut ctx).await.unwrap();

    assert_eq!(report.alerts, 23);
    let delivery = report.delivery.unwrap();
    assert_eq!(delivery.batches_sent, 3);

    let batches = p.inbox.batches.lock().unwrap();
    let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![10, 10, 3]);
    // Alerts keep connector order across batches.
    assert!(batches[0][0].contains("CP\\-00"));
    assert!(batches[2][2].contains("CP\\-22"));
}

#[tokio::test]
async fn test_monitor_loop_publishes_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let p = spawn_process(dir.path(), start());
    p.source.push(&[("A", "Available")]);

    let ctx = RunContext::restore(&*p.log).unwrap();
    let (tx, mut rx) = tokio::sync::watch::channel(MonitorSnapshot::default());
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(run_monitor_loop(
        p.reconciler,
        ctx,
        std::time::Duration::from_millis(20),
        tx,
        async move {
            let _ = stop_rx.await;
        },
    ));

    rx.changed().await.unwrap();
    let first: MonitorSnapshot = rx.borrow_and_update().clone();
    assert_eq!(first.connectors.len(), 1);
    assert!(!first.first_tick_pending);
    assert_eq!(first.last_tick.as_ref().unwrap().transitions, 1);

    rx.changed().await.unwrap();
    let second = rx.borrow_and_update().clone();
    assert_eq!(second.last_tick.as_ref().unwrap().transitions, 0);

    stop_tx.send(()).unwrap();
    let ctx = handle.await.unwrap();
    assert_eq!(ctx.state("A").unwrap().status, "online");
    assert_eq!(p.log.records().unwrap().len(), 1);
}
