// src/runtime/mod.rs

//! Live runs: owns the engines, turns their timer requests into tokio tasks
//! and hands finished runs to the session recorder.

pub mod recorder;

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
    time::Instant,
};
use uuid::Uuid;

use crate::{
    activities,
    engine::{Engine, EngineError, Event, Presentation, TimerRequest},
    error::AppError,
    scoring::RunSummary,
};
use recorder::{RecordStatus, SessionRecorder};

const SAVE_FAILED_MESSAGE: &str =
    "Could not save this session. Your result is kept, please try again.";

pub struct Run {
    id: Uuid,
    user_id: i64,
    demo: bool,
    engine: Engine,
    started: Instant,
    /// Last client request touching this run.
    last_active: Instant,
    timer: Option<JoinHandle<()>>,
    summary: Option<RunSummary>,
    completed_at: Option<DateTime<Utc>>,
    record: RecordStatus,
}

impl Run {
    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            id: self.id,
            demo: self.demo,
            elapsed_ms: self.elapsed_ms(),
            state: self.engine.presentation(),
            record: self.record.clone(),
            summary: self.summary.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub id: Uuid,
    pub demo: bool,
    pub elapsed_ms: u64,
    pub state: Presentation,
    pub record: RecordStatus,
    pub summary: Option<RunSummary>,
}

struct Entry {
    owner: i64,
    run: Arc<Mutex<Run>>,
}

/// All runs currently held in memory, keyed by run id.
#[derive(Clone)]
pub struct RunRegistry {
    runs: Arc<RwLock<HashMap<Uuid, Entry>>>,
    recorder: SessionRecorder,
}

impl RunRegistry {
    pub fn new(recorder: SessionRecorder) -> Self {
        Self {
            runs: Arc::new(RwLock::new(HashMap::new())),
            recorder,
        }
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    /// Starts a new run for `user_id`. The user's earlier runs are dropped, apart
    /// from finished ones whose save failed and may still be retried.
    pub async fn create(
        &self,
        user_id: i64,
        activity_key: &str,
        demo: bool,
    ) -> Result<RunSnapshot, AppError> {
        let activity = activities::find(activity_key)
            .ok_or_else(|| AppError::NotFound(format!("Unknown activity '{}'", activity_key)))?;

        let replaced = self
            .evict(|entry, run| {
                let retryable =
                    run.is_some_and(|run| matches!(run.record, RecordStatus::Failed { .. }));
                entry.owner == user_id && !retryable
            })
            .await;
        if replaced > 0 {
            tracing::debug!("User {} left {} earlier run(s) behind", user_id, replaced);
        }

        let id = Uuid::new_v4();
        let now = Instant::now();
        let run = Run {
            id,
            user_id,
            demo,
            engine: Engine::new(activity, rand::random()),
            started: now,
            last_active: now,
            timer: None,
            summary: None,
            completed_at: None,
            record: RecordStatus::Pending,
        };
        let snapshot = run.snapshot();

        self.runs.write().await.insert(
            id,
            Entry {
                owner: user_id,
                run: Arc::new(Mutex::new(run)),
            },
        );
        tracing::info!(
            "User {} started {} run {} (demo: {})",
            user_id,
            activity.key,
            id,
            demo
        );

        Ok(snapshot)
    }

    async fn get(&self, id: Uuid, user_id: i64) -> Result<Arc<Mutex<Run>>, AppError> {
        let runs = self.runs.read().await;
        match runs.get(&id) {
            Some(entry) if entry.owner == user_id => Ok(entry.run.clone()),
            _ => Err(AppError::NotFound("Run not found".to_string())),
        }
    }

    pub async fn snapshot(&self, id: Uuid, user_id: i64) -> Result<RunSnapshot, AppError> {
        let run = self.get(id, user_id).await?;
        let mut guard = run.lock().await;
        guard.last_active = Instant::now();
        Ok(guard.snapshot())
    }

    /// Delivers a client event (start, respond, pause, resume, reset).
    pub async fn dispatch(
        &self,
        id: Uuid,
        user_id: i64,
        event: Event,
    ) -> Result<RunSnapshot, AppError> {
        let handle = self.get(id, user_id).await?;
        let mut run = handle.lock().await;
        run.last_active = Instant::now();
        self.apply(&handle, &mut run, event)?;
        Ok(run.snapshot())
    }

    /// Drops a run, cancelling whatever timer it had pending.
    pub async fn abandon(&self, id: Uuid, user_id: i64) -> Result<(), AppError> {
        let handle = self.get(id, user_id).await?;
        self.runs.write().await.remove(&id);
        handle.lock().await.cancel_timer();
        tracing::info!("Run {} abandoned", id);
        Ok(())
    }

    /// Manual retry after a failed write. The run keeps its summary either way.
    pub async fn retry_record(&self, id: Uuid, user_id: i64) -> Result<RunSnapshot, AppError> {
        let handle = self.get(id, user_id).await?;
        let mut run = handle.lock().await;
        run.last_active = Instant::now();

        let (Some(summary), Some(completed_at)) = (run.summary.clone(), run.completed_at) else {
            return Err(AppError::Conflict("Run is not finished yet".to_string()));
        };
        match &run.record {
            RecordStatus::Failed { .. } => {}
            RecordStatus::Saved { .. } => {
                return Err(AppError::Conflict("Session already saved".to_string()));
            }
            RecordStatus::Skipped => {
                return Err(AppError::BadRequest("Demo runs are not saved".to_string()));
            }
            RecordStatus::Pending => {
                return Err(AppError::Conflict("Session is still being saved".to_string()));
            }
        }

        match self.recorder.record(run.user_id, &summary, completed_at).await {
            Ok(saved) => {
                run.record = RecordStatus::Saved { record_id: saved.id };
                Ok(run.snapshot())
            }
            Err(e) => {
                tracing::error!("Retrying save of run {} failed: {}", id, e);
                run.record = RecordStatus::Failed {
                    message: SAVE_FAILED_MESSAGE.to_string(),
                };
                Err(AppError::ServiceUnavailable(SAVE_FAILED_MESSAGE.to_string()))
            }
        }
    }

    fn apply(
        &self,
        handle: &Arc<Mutex<Run>>,
        run: &mut Run,
        event: Event,
    ) -> Result<(), EngineError> {
        let before = run.engine.generation();
        let now = run.elapsed_ms();
        let step = run.engine.handle(event, now)?;

        if run.engine.generation() != before {
            run.cancel_timer();
        }
        if let Some(request) = step.timer {
            run.timer = Some(self.schedule(Arc::downgrade(handle), request));
        }
        if step.finished {
            self.finish(handle, run);
        }
        Ok(())
    }

    fn schedule(&self, run: Weak<Mutex<Run>>, request: TimerRequest) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(request.after).await;
            let Some(handle) = run.upgrade() else {
                return;
            };
            let mut guard = handle.lock().await;
            if guard.engine.generation() == request.generation {
                // this task is the pending timer; detach it instead of aborting itself
                guard.timer = None;
            }
            let event = Event::TimerFired {
                generation: request.generation,
                timer: request.timer,
            };
            if let Err(e) = registry.apply(&handle, &mut guard, event) {
                tracing::warn!("Run {} rejected {:?} timer: {}", guard.id, request.timer, e);
            }
        })
    }

    fn finish(&self, handle: &Arc<Mutex<Run>>, run: &mut Run) {
        let summary = run.engine.summary();
        let completed_at = Utc::now();
        run.summary = Some(summary.clone());
        run.completed_at = Some(completed_at);
        run.cancel_timer();

        if run.demo {
            run.record = RecordStatus::Skipped;
            tracing::info!("Demo run {} finished with score {}", run.id, summary.final_score);
            return;
        }

        run.record = RecordStatus::Pending;
        let recorder = self.recorder.clone();
        let handle = handle.clone();
        let (id, user_id) = (run.id, run.user_id);
        tokio::spawn(async move {
            let status = match recorder.record(user_id, &summary, completed_at).await {
                Ok(saved) => RecordStatus::Saved { record_id: saved.id },
                Err(e) => {
                    tracing::error!("Failed to save run {}: {}", id, e);
                    RecordStatus::Failed {
                        message: SAVE_FAILED_MESSAGE.to_string(),
                    }
                }
            };
            handle.lock().await.record = status;
        });
    }

    /// Drops every run nobody has touched for `max_idle`, cancelling its timer.
    pub async fn expire_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let expired = self
            .evict(|_, run| run.is_some_and(|run| now.duration_since(run.last_active) >= max_idle))
            .await;
        if expired > 0 {
            tracing::info!("Expired {} idle run(s)", expired);
        }
        expired
    }

    /// Background task calling `expire_idle` at a fraction of `max_idle`.
    pub fn spawn_sweeper(&self, max_idle: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        let every = (max_idle / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                registry.expire_idle(max_idle).await;
            }
        })
    }

    /// Removes the entries matching `doomed`. The predicate sees `None` for a
    /// run locked by an in-flight request or timer.
    async fn evict<F>(&self, doomed: F) -> usize
    where
        F: Fn(&Entry, Option<&Run>) -> bool,
    {
        let removed: Vec<Arc<Mutex<Run>>> = {
            let mut runs = self.runs.write().await;
            let ids: Vec<Uuid> = runs
                .iter()
                .filter(|(_, entry)| match entry.run.try_lock() {
                    Ok(run) => doomed(entry, Some(&*run)),
                    Err(_) => doomed(entry, None),
                })
                .map(|(id, _)| *id)
                .collect();
            ids.iter()
                .filter_map(|id| runs.remove(id))
                .map(|entry| entry.run)
                .collect()
        };
        for run in &removed {
            run.lock().await.cancel_timer();
        }
        removed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::{Phase, trial::Answer},
        models::session_record::{NewSessionRecord, SessionRecord},
        store::{LocalSessionStore, SessionStore, StoreError},
    };
    use async_trait::async_trait;
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    /// Store that fails until told otherwise.
    struct FlakyStore {
        healthy: AtomicBool,
        inner: LocalSessionStore,
    }

    #[async_trait]
    impl SessionStore for FlakyStore {
        async fn insert(&self, record: NewSessionRecord) -> Result<SessionRecord, StoreError> {
            if !self.healthy.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("store offline")));
            }
            self.inner.insert(record).await
        }

        async fn list(
            &self,
            user_id: i64,
            since: Option<DateTime<Utc>>,
        ) -> Result<Vec<SessionRecord>, StoreError> {
            self.inner.list(user_id, since).await
        }
    }

    fn registry_with(store: Arc<dyn SessionStore>) -> RunRegistry {
        RunRegistry::new(SessionRecorder::new(store))
    }

    /// Lets spawned tasks run without moving the paused clock.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    /// Waits until the background save of a finished run has completed.
    async fn saved_snapshot(registry: &RunRegistry, id: Uuid, user_id: i64) -> RunSnapshot {
        for _ in 0..500 {
            let snapshot = registry.snapshot(id, user_id).await.unwrap();
            if snapshot.summary.is_some() && snapshot.record != RecordStatus::Pending {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run {} never settled", id);
    }

    #[tokio::test(start_paused = true)]
    async fn timers_drive_the_run_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalSessionStore::new(dir.path()));
        let registry = registry_with(store.clone());

        let run = registry.create(1, "feeling_faces", false).await.unwrap();
        registry.dispatch(run.id, 1, Event::Start).await.unwrap();

        // every trial times out; 5 trials of 6s + 4s + 2s fail level one
        tokio::time::sleep(Duration::from_secs(61)).await;

        let snapshot = saved_snapshot(&registry, run.id, 1).await;
        assert_eq!(snapshot.state.phase, Phase::Finished);
        let summary = snapshot.summary.unwrap();
        assert_eq!(summary.omission_errors, 5);
        assert!(matches!(snapshot.record, RecordStatus::Saved { .. }));
        assert_eq!(store.list(1, None).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn response_cancels_pending_timer() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with(Arc::new(LocalSessionStore::new(dir.path())));

        let run = registry.create(1, "balloon_breathing", true).await.unwrap();
        registry.dispatch(run.id, 1, Event::Start).await.unwrap();
        tokio::time::sleep(Duration::from_millis(6100)).await;
        settle().await;
        assert_eq!(
            registry.snapshot(run.id, 1).await.unwrap().state.phase,
            Phase::Input { trial: 0 }
        );

        let snapshot = registry
            .dispatch(run.id, 1, Event::Respond(Answer::Press))
            .await
            .unwrap();
        assert!(matches!(snapshot.state.phase, Phase::Feedback { .. }));
        assert_eq!(snapshot.state.score, 8);

        // the window timer would have fired here; the trial must stay correct
        tokio::time::sleep(Duration::from_millis(2500)).await;
        settle().await;
        let snapshot = registry.snapshot(run.id, 1).await.unwrap();
        assert_eq!(snapshot.state.score, 8);
        assert_eq!(snapshot.state.streak, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_run_does_not_advance() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with(Arc::new(LocalSessionStore::new(dir.path())));

        let run = registry.create(1, "number_echo", true).await.unwrap();
        registry.dispatch(run.id, 1, Event::Start).await.unwrap();
        registry.dispatch(run.id, 1, Event::Pause).await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        settle().await;
        assert_eq!(
            registry.snapshot(run.id, 1).await.unwrap().state.phase,
            Phase::Paused { trial: 0 }
        );

        let snapshot = registry.dispatch(run.id, 1, Event::Resume).await.unwrap();
        assert_eq!(snapshot.state.phase, Phase::Showing { trial: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FlakyStore {
            healthy: AtomicBool::new(false),
            inner: LocalSessionStore::new(dir.path()),
        });
        let registry = registry_with(store.clone());

        let run = registry.create(7, "feeling_faces", false).await.unwrap();
        registry.dispatch(run.id, 7, Event::Start).await.unwrap();
        tokio::time::sleep(Duration::from_secs(61)).await;

        let snapshot = saved_snapshot(&registry, run.id, 7).await;
        assert!(matches!(snapshot.record, RecordStatus::Failed { .. }));
        assert!(snapshot.summary.is_some());

        assert!(matches!(
            registry.retry_record(run.id, 7).await,
            Err(AppError::ServiceUnavailable(_))
        ));

        // starting something else keeps the unsaved result around
        registry.create(7, "star_watch", true).await.unwrap();

        store.healthy.store(true, Ordering::SeqCst);
        let snapshot = registry.retry_record(run.id, 7).await.unwrap();
        assert!(matches!(snapshot.record, RecordStatus::Saved { .. }));
        assert!(matches!(
            registry.retry_record(run.id, 7).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn new_run_replaces_the_users_earlier_runs() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with(Arc::new(LocalSessionStore::new(dir.path())));

        let mut earlier = Vec::new();
        for _ in 0..100 {
            earlier.push(registry.create(1, "star_watch", true).await.unwrap().id);
        }
        let paused = registry.create(1, "number_echo", true).await.unwrap();
        registry.dispatch(paused.id, 1, Event::Start).await.unwrap();
        registry.dispatch(paused.id, 1, Event::Pause).await.unwrap();
        let other = registry.create(2, "star_watch", true).await.unwrap();

        let latest = registry.create(1, "feeling_faces", true).await.unwrap();

        assert_eq!(registry.runs.read().await.len(), 2);
        assert!(registry.snapshot(latest.id, 1).await.is_ok());
        assert!(registry.snapshot(other.id, 2).await.is_ok());
        assert!(matches!(
            registry.snapshot(paused.id, 1).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            registry.snapshot(earlier[0], 1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_runs_expire() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with(Arc::new(LocalSessionStore::new(dir.path())));
        let max_idle = Duration::from_secs(30 * 60);

        let left = registry.create(1, "number_echo", true).await.unwrap();
        registry.dispatch(left.id, 1, Event::Start).await.unwrap();
        registry.dispatch(left.id, 1, Event::Pause).await.unwrap();
        let watched = registry.create(2, "star_watch", true).await.unwrap();

        tokio::time::sleep(Duration::from_secs(20 * 60)).await;
        registry.snapshot(watched.id, 2).await.unwrap();
        tokio::time::sleep(Duration::from_secs(15 * 60)).await;

        assert_eq!(registry.expire_idle(max_idle).await, 1);
        assert!(matches!(
            registry.snapshot(left.id, 1).await,
            Err(AppError::NotFound(_))
        ));
        assert!(registry.snapshot(watched.id, 2).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_drops_abandoned_runs() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with(Arc::new(LocalSessionStore::new(dir.path())));
        let sweeper = registry.spawn_sweeper(Duration::from_secs(60));

        let run = registry.create(3, "feeling_faces", true).await.unwrap();
        registry.dispatch(run.id, 3, Event::Start).await.unwrap();

        // the run finishes on its own timers, then sits untouched
        tokio::time::sleep(Duration::from_secs(120)).await;
        settle().await;

        assert!(matches!(
            registry.snapshot(run.id, 3).await,
            Err(AppError::NotFound(_))
        ));
        assert!(registry.runs.read().await.is_empty());
        sweeper.abort();
    }

    #[tokio::test]
    async fn runs_are_private_to_their_owner() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with(Arc::new(LocalSessionStore::new(dir.path())));
        let run = registry.create(1, "star_watch", true).await.unwrap();

        assert!(matches!(
            registry.snapshot(run.id, 2).await,
            Err(AppError::NotFound(_))
        ));
        registry.abandon(run.id, 1).await.unwrap();
        assert!(registry.snapshot(run.id, 1).await.is_err());
    }

    #[tokio::test]
    async fn unknown_activity_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with(Arc::new(LocalSessionStore::new(dir.path())));
        assert!(matches!(
            registry.create(1, "nope", false).await,
            Err(AppError::NotFound(_))
        ));
    }
}
