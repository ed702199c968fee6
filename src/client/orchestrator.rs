//! Client-side upload queue.
//!
//! Each file runs validate -> strategies in order; the first strategy to
//! succeed completes the task, and if all fail the task carries the last
//! strategy's error. Files are processed with a bounded concurrency window.

use crate::client::{
    api::ProgressFn,
    error::UploadError,
    strategy::UploadStrategy,
    task::{LocalFile, TaskId, UploadOutcome, UploadState, UploadTask},
};
use futures::stream::{self, StreamExt};
use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

pub const DEFAULT_CONCURRENCY: usize = 3;
pub const DEFAULT_CATEGORY: &str = "uploads";

#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Started { id: TaskId },
    Progress { id: TaskId, sent: u64, total: u64 },
    /// `strategy` failed and the next one is about to run.
    Fallback { id: TaskId, strategy: &'static str, error: UploadError },
    Completed { id: TaskId, outcome: UploadOutcome },
    Failed { id: TaskId, error: UploadError },
}

type Tasks = Arc<Mutex<BTreeMap<TaskId, UploadTask>>>;

pub struct UploadOrchestrator {
    strategies: Vec<Arc<dyn UploadStrategy>>,
    concurrency: usize,
    category: String,
    tasks: Tasks,
    next_id: AtomicU64,
    events: Option<mpsc::UnboundedSender<UploadEvent>>,
}

fn lock(tasks: &Tasks) -> MutexGuard<'_, BTreeMap<TaskId, UploadTask>> {
    tasks.lock().unwrap_or_else(PoisonError::into_inner)
}

fn emit(events: &Option<mpsc::UnboundedSender<UploadEvent>>, event: UploadEvent) {
    if let Some(tx) = events {
        // A dropped receiver just means nobody is listening.
        let _ = tx.send(event);
    }
}

impl UploadOrchestrator {
    pub fn new(strategies: Vec<Arc<dyn UploadStrategy>>) -> Self {
        Self {
            strategies,
            concurrency: DEFAULT_CONCURRENCY,
            category: DEFAULT_CATEGORY.to_string(),
            tasks: Arc::default(),
            next_id: AtomicU64::new(1),
            events: None,
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Receive lifecycle and progress events. Replaces any earlier receiver.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<UploadEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub fn enqueue(&self, file: LocalFile) -> TaskId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.tasks).insert(id, UploadTask::new(id, file));
        id
    }

    pub fn task(&self, id: TaskId) -> Option<UploadTask> {
        lock(&self.tasks).get(&id).cloned()
    }

    pub fn tasks(&self) -> Vec<UploadTask> {
        lock(&self.tasks).values().cloned().collect()
    }

    /// Move a failed task back to pending. Returns false for any other state.
    pub fn retry(&self, id: TaskId) -> bool {
        lock(&self.tasks).get_mut(&id).is_some_and(UploadTask::retry)
    }

    /// Drop completed tasks; pending, running and failed ones stay.
    pub fn clear_completed(&self) {
        lock(&self.tasks).retain(|_, t| t.state != UploadState::Completed);
    }

    /// Run every pending task, at most `concurrency` at a time.
    #[instrument(skip(self), fields(concurrency = self.concurrency))]
    pub async fn run_pending(&self) -> Vec<(TaskId, Result<UploadOutcome, UploadError>)> {
        let pending: Vec<TaskId> = lock(&self.tasks)
            .values()
            .filter(|t| t.state == UploadState::Pending)
            .map(|t| t.id)
            .collect();

        stream::iter(pending)
            .map(|id| async move { (id, self.upload_one(id).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    /// Enqueue `files` and run them.
    pub async fn upload_all(
        &self,
        files: Vec<LocalFile>,
    ) -> Vec<(TaskId, Result<UploadOutcome, UploadError>)> {
        for file in files {
            self.enqueue(file);
        }
        self.run_pending().await
    }

    async fn upload_one(&self, id: TaskId) -> Result<UploadOutcome, UploadError> {
        let file = lock(&self.tasks)
            .get(&id)
            .map(|t| t.file.clone())
            .ok_or_else(|| UploadError::Unknown(format!("upload task {} vanished", id)))?;

        if let Err(err) = file.validate() {
            return Err(self.fail(id, err.into()));
        }

        if let Some(task) = lock(&self.tasks).get_mut(&id) {
            task.start();
        }
        emit(&self.events, UploadEvent::Started { id });

        let mut last_error = UploadError::Unknown("no upload strategy configured".into());
        for (idx, strategy) in self.strategies.iter().enumerate() {
            if let Some(task) = lock(&self.tasks).get_mut(&id) {
                task.set_progress(0);
            }

            match strategy
                .upload(&file, &self.category, self.progress_fn(id, file.size()))
                .await
            {
                Ok(outcome) => {
                    if let Some(task) = lock(&self.tasks).get_mut(&id) {
                        task.complete(outcome.clone());
                    }
                    info!(task = id, strategy = strategy.name(), key = %outcome.key, "upload completed");
                    emit(&self.events, UploadEvent::Completed { id, outcome: outcome.clone() });
                    return Ok(outcome);
                }
                Err(err) => {
                    warn!(task = id, strategy = strategy.name(), error = %err, "upload strategy failed");
                    if idx + 1 < self.strategies.len() {
                        emit(
                            &self.events,
                            UploadEvent::Fallback {
                                id,
                                strategy: strategy.name(),
                                error: err.clone(),
                            },
                        );
                    }
                    last_error = err;
                }
            }
        }

        Err(self.fail(id, last_error))
    }

    fn fail(&self, id: TaskId, error: UploadError) -> UploadError {
        if let Some(task) = lock(&self.tasks).get_mut(&id) {
            task.fail(error.clone());
        }
        emit(&self.events, UploadEvent::Failed { id, error: error.clone() });
        error
    }

    fn progress_fn(&self, id: TaskId, total: u64) -> ProgressFn {
        let tasks = self.tasks.clone();
        let events = self.events.clone();
        Arc::new(move |sent| {
            if let Some(task) = lock(&tasks).get_mut(&id) {
                task.set_progress(sent);
            }
            emit(&events, UploadEvent::Progress { id, sent, total });
        })
    }
}
