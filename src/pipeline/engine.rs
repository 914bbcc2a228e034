//! # Pipeline Engine
//!
//! Schedules and executes directed acyclic graphs of asynchronous tasks.
//! Tasks are arena-allocated records addressed by [`TaskId`]; combinators only
//! ever attach new tasks downstream of existing ones, so graphs are acyclic by
//! construction. No combinator blocks a worker thread: waiting is expressed as
//! continuations invoked when the upstream task settles.

use dashmap::DashMap;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::events::TaskEvent;
use super::retry::{invoke_with_retry, RetryPolicy};
use super::states::{self, TaskState};
use super::task::{Continuation, TaskFailure, TaskId, TaskOutcome, TaskRecord};

/// Sink receiving failures that no continuation, aggregator or joiner observed
pub type UnhandledFailureSink = dyn Fn(TaskId, &TaskFailure) + Send + Sync;

/// Composes asynchronous tasks into dependency graphs.
///
/// Cloning the engine is cheap and shares the underlying arena, so the same
/// engine can be handed to every request handler.
#[derive(Clone)]
pub struct PipelineEngine {
    inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    tasks: DashMap<TaskId, TaskRecord>,
    next_id: AtomicU64,
    /// Count of non-terminal tasks, used by `shutdown` to drain
    active: AtomicUsize,
    drained: Notify,
    closed: AtomicBool,
    sink: parking_lot::RwLock<Arc<UnhandledFailureSink>>,
}

/// Handle to a task registered with a [`PipelineEngine`].
///
/// Handles are cheap to clone. When the last handle for a failed task drops
/// without anyone having observed the failure, the failure is surfaced to the
/// engine's unhandled-failure sink.
#[derive(Clone)]
pub struct TaskHandle {
    core: Arc<HandleCore>,
}

struct HandleCore {
    id: TaskId,
    engine: Weak<EngineInner>,
}

impl Drop for HandleCore {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.upgrade() {
            engine.on_handle_dropped(self.id);
        }
    }
}

impl TaskHandle {
    fn new(id: TaskId, engine: &Arc<EngineInner>) -> Self {
        Self {
            core: Arc::new(HandleCore {
                id,
                engine: Arc::downgrade(engine),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.core.id
    }

    /// Current state of the task. Reports `Cancelled` once the engine is gone.
    pub fn state(&self) -> TaskState {
        self.core
            .engine
            .upgrade()
            .and_then(|engine| engine.tasks.get(&self.core.id).map(|rec| rec.state))
            .unwrap_or(TaskState::Cancelled)
    }

    /// Wait for the task to settle and return its outcome.
    ///
    /// Joining counts as observing the outcome for unhandled-failure
    /// accounting. Multiple joiners each receive the outcome.
    pub async fn join(&self) -> TaskOutcome {
        let engine = match self.core.engine.upgrade() {
            Some(engine) => engine,
            None => return Err(TaskFailure::Cancelled),
        };
        let (tx, rx) = oneshot::channel();
        engine.attach(
            self.core.id,
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        );
        rx.await.unwrap_or(Err(TaskFailure::Cancelled))
    }
}

impl Default for PipelineEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineEngine {
    pub fn new() -> Self {
        let sink: Arc<UnhandledFailureSink> = Arc::new(|id, failure| {
            error!(
                task_id = %id,
                kind = failure.kind(),
                cause = %failure,
                "unhandled task failure"
            );
        });
        Self {
            inner: Arc::new(EngineInner {
                tasks: DashMap::new(),
                next_id: AtomicU64::new(0),
                active: AtomicUsize::new(0),
                drained: Notify::new(),
                closed: AtomicBool::new(false),
                sink: parking_lot::RwLock::new(sink),
            }),
        }
    }

    /// Replace the process-wide unhandled-failure sink for this engine.
    pub fn set_unhandled_sink<F>(&self, sink: F)
    where
        F: Fn(TaskId, &TaskFailure) + Send + Sync + 'static,
    {
        *self.inner.sink.write() = Arc::new(sink);
    }

    /// Number of tasks not yet in a terminal state.
    pub fn active_tasks(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Downstream dependents recorded for a task.
    pub fn dependents_of(&self, task: &TaskHandle) -> Vec<TaskId> {
        self.inner
            .tasks
            .get(&task.id())
            .map(|rec| rec.dependents.clone())
            .unwrap_or_default()
    }

    /// Register and start a root task.
    ///
    /// Returns immediately with a handle in `Pending` state; the work is
    /// dispatched onto the runtime. There is no implicit retry.
    pub fn submit<F>(&self, work: F) -> TaskHandle
    where
        F: Future<Output = Result<Value, TaskFailure>> + Send + 'static,
    {
        let (handle, token) = self.register();
        let id = handle.id();
        if self.inner.closed.load(Ordering::SeqCst) {
            warn!(task_id = %id, "submit rejected: engine is shutting down");
            self.inner.apply(id, TaskEvent::Cancel);
            return handle;
        }
        let inner = self.inner.clone();
        inner.apply(id, TaskEvent::Start);
        tokio::spawn(async move {
            // Biased so a task cancelled before its first poll never starts.
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    inner.apply(id, TaskEvent::Cancel);
                }
                result = work => match result {
                    Ok(value) => inner.apply(id, TaskEvent::Complete(value)),
                    Err(cause) => inner.apply(id, TaskEvent::Fail(cause)),
                },
            }
        });
        handle
    }

    /// Register a CPU-bound task dispatched to the blocking thread pool.
    ///
    /// Blocking work cannot observe cancellation mid-flight; the result of a
    /// cancelled blocking task is discarded when it eventually returns.
    pub fn submit_blocking<F>(&self, work: F) -> TaskHandle
    where
        F: FnOnce() -> Result<Value, TaskFailure> + Send + 'static,
    {
        self.submit(async move {
            match tokio::task::spawn_blocking(work).await {
                Ok(result) => result,
                Err(join_error) => Err(TaskFailure::failed(format!(
                    "blocking task panicked: {join_error}"
                ))),
            }
        })
    }

    /// Register a root task that retries its supplier per `policy`.
    ///
    /// Per-attempt timeouts always retry; other failures consult `retryable`.
    /// Exhaustion settles the task with the last failure.
    pub fn submit_with_retry<F, Fut, P>(
        &self,
        supplier: F,
        policy: RetryPolicy,
        retryable: P,
    ) -> TaskHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, TaskFailure>> + Send + 'static,
        P: Fn(&TaskFailure) -> bool + Send + Sync + 'static,
    {
        self.submit(invoke_with_retry(supplier, policy, retryable))
    }

    /// Schedule `continuation` to run with the upstream's value once it
    /// completes.
    ///
    /// Upstream failure skips the continuation and settles the new task with
    /// the same cause; upstream cancellation cancels the new task. The
    /// continuation is invoked only after the upstream is terminal.
    pub fn chain<F, Fut>(&self, upstream: &TaskHandle, continuation: F) -> TaskHandle
    where
        F: FnOnce(Arc<Value>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, TaskFailure>> + Send + 'static,
    {
        let (handle, _token) = self.register();
        let down_id = handle.id();
        let inner = self.inner.clone();
        self.inner.add_dependent(upstream.id(), down_id);
        self.inner.attach(
            upstream.id(),
            Box::new(move |outcome| match outcome {
                Ok(value) => {
                    inner.apply(down_id, TaskEvent::Start);
                    let token = inner.cancel_token(down_id);
                    let driver = inner.clone();
                    tokio::spawn(async move {
                        // Biased so a continuation cancelled while waiting on
                        // its upstream is skipped, not raced.
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => {
                                driver.apply(down_id, TaskEvent::Cancel);
                            }
                            result = continuation(value) => match result {
                                Ok(value) => driver.apply(down_id, TaskEvent::Complete(value)),
                                Err(cause) => driver.apply(down_id, TaskEvent::Fail(cause)),
                            },
                        }
                    });
                }
                Err(TaskFailure::Cancelled) => inner.apply(down_id, TaskEvent::Cancel),
                Err(cause) => inner.apply(down_id, TaskEvent::Fail(cause)),
            }),
        );
        handle
    }

    /// Schedule a recovery continuation: runs with the failure cause when the
    /// upstream fails, passes upstream success values through untouched.
    ///
    /// Recovery does not rescue cancellation; a cancelled upstream cancels the
    /// new task as well.
    pub fn recover<F, Fut>(&self, upstream: &TaskHandle, handler: F) -> TaskHandle
    where
        F: FnOnce(TaskFailure) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, TaskFailure>> + Send + 'static,
    {
        let (handle, _token) = self.register();
        let down_id = handle.id();
        let inner = self.inner.clone();
        self.inner.add_dependent(upstream.id(), down_id);
        self.inner.attach(
            upstream.id(),
            Box::new(move |outcome| match outcome {
                Ok(value) => {
                    let value = Arc::try_unwrap(value).unwrap_or_else(|shared| (*shared).clone());
                    inner.apply(down_id, TaskEvent::Complete(value));
                }
                Err(TaskFailure::Cancelled) => inner.apply(down_id, TaskEvent::Cancel),
                Err(cause) => {
                    inner.apply(down_id, TaskEvent::Start);
                    let token = inner.cancel_token(down_id);
                    let driver = inner.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => {
                                driver.apply(down_id, TaskEvent::Cancel);
                            }
                            result = handler(cause) => match result {
                                Ok(value) => driver.apply(down_id, TaskEvent::Complete(value)),
                                Err(cause) => driver.apply(down_id, TaskEvent::Fail(cause)),
                            },
                        }
                    });
                }
            }),
        );
        handle
    }

    /// Wait for all member tasks and aggregate their outcomes.
    ///
    /// Every member runs to completion; there is no fail-fast. The combined
    /// task succeeds with the array of member results (in member order) only
    /// if every member succeeded, and otherwise fails with a composite cause
    /// enumerating every member failure. Cancelled members are enumerated as
    /// failures with a `Cancelled` cause.
    pub fn combine(&self, members: &[TaskHandle]) -> TaskHandle {
        let (handle, token) = self.register();
        let down_id = handle.id();
        let count = members.len();
        if count == 0 {
            self.inner
                .apply(down_id, TaskEvent::Complete(Value::Array(Vec::new())));
            return handle;
        }

        let member_ids: Vec<TaskId> = members.iter().map(TaskHandle::id).collect();
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, TaskOutcome)>();
        for (index, member) in members.iter().enumerate() {
            self.inner.add_dependent(member.id(), down_id);
            let tx = tx.clone();
            self.inner.attach(
                member.id(),
                Box::new(move |outcome| {
                    let _ = tx.send((index, outcome));
                }),
            );
        }
        drop(tx);

        let inner = self.inner.clone();
        inner.apply(down_id, TaskEvent::Start);
        tokio::spawn(async move {
            let mut slots: Vec<Option<TaskOutcome>> = vec![None; count];
            let mut received = 0;
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        inner.apply(down_id, TaskEvent::Cancel);
                        return;
                    }
                    message = rx.recv() => match message {
                        Some((index, outcome)) => {
                            slots[index] = Some(outcome);
                            received += 1;
                            if received == count {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }

            let mut values = Vec::with_capacity(count);
            let mut failures = Vec::new();
            for (index, slot) in slots.into_iter().enumerate() {
                match slot {
                    Some(Ok(value)) => values.push((*value).clone()),
                    Some(Err(cause)) => failures.push((member_ids[index], cause)),
                    None => failures.push((member_ids[index], TaskFailure::Cancelled)),
                }
            }
            if failures.is_empty() {
                inner.apply(down_id, TaskEvent::Complete(Value::Array(values)));
            } else {
                inner.apply(down_id, TaskEvent::Fail(TaskFailure::Composite(failures)));
            }
        });
        handle
    }

    /// Bound the observation of `upstream` by `duration`.
    ///
    /// The new task mirrors the upstream outcome if it settles in time and
    /// fails with `Timeout` otherwise. The upstream keeps running either way;
    /// a late outcome is discarded by the wrapper but remains visible to other
    /// observers. No cancellation is propagated to the upstream.
    pub fn with_timeout(&self, upstream: &TaskHandle, duration: Duration) -> TaskHandle {
        let (handle, token) = self.register();
        let down_id = handle.id();
        self.inner.add_dependent(upstream.id(), down_id);

        let (tx, rx) = oneshot::channel::<TaskOutcome>();
        self.inner.attach(
            upstream.id(),
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        );

        let inner = self.inner.clone();
        inner.apply(down_id, TaskEvent::Start);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    inner.apply(down_id, TaskEvent::Cancel);
                }
                _ = tokio::time::sleep(duration) => {
                    debug!(task_id = %down_id, timeout_ms = duration.as_millis() as u64, "timeout elapsed before upstream settled");
                    inner.apply(
                        down_id,
                        TaskEvent::Fail(TaskFailure::Timeout {
                            elapsed_ms: duration.as_millis() as u64,
                        }),
                    );
                }
                outcome = rx => match outcome {
                    Ok(Ok(value)) => {
                        let value = Arc::try_unwrap(value).unwrap_or_else(|shared| (*shared).clone());
                        inner.apply(down_id, TaskEvent::Complete(value));
                    }
                    Ok(Err(TaskFailure::Cancelled)) => inner.apply(down_id, TaskEvent::Cancel),
                    Ok(Err(cause)) => inner.apply(down_id, TaskEvent::Fail(cause)),
                    Err(_) => inner.apply(down_id, TaskEvent::Cancel),
                },
            }
        });
        handle
    }

    /// Cancel a task if it has not settled yet.
    ///
    /// Cancellation is cooperative: the task's cancellation token is
    /// signalled, work already dispatched cannot be forcibly interrupted, and
    /// the cancellation propagates to downstream dependents, never upstream.
    pub fn cancel(&self, task: &TaskHandle) {
        self.inner.cancel_by_id(task.id());
    }

    /// Stop accepting submissions, wait up to `grace` for in-flight tasks,
    /// cancel the stragglers, and sweep unobserved failures into the sink.
    pub async fn shutdown(&self, grace: Duration) {
        self.inner.closed.store(true, Ordering::SeqCst);
        info!(
            active = self.active_tasks(),
            grace_ms = grace.as_millis() as u64,
            "pipeline engine draining"
        );

        let deadline = tokio::time::sleep(grace);
        tokio::pin!(deadline);
        loop {
            if self.inner.active.load(Ordering::SeqCst) == 0 {
                break;
            }
            tokio::select! {
                _ = self.inner.drained.notified() => {}
                _ = &mut deadline => break,
            }
        }

        let stragglers: Vec<TaskId> = self
            .inner
            .tasks
            .iter()
            .filter(|entry| !entry.value().state.is_terminal())
            .map(|entry| *entry.key())
            .collect();
        if !stragglers.is_empty() {
            warn!(count = stragglers.len(), "cancelling tasks that outlived the grace period");
        }
        for id in stragglers {
            self.inner.cancel_by_id(id);
        }

        let remaining: Vec<TaskId> = self.inner.tasks.iter().map(|entry| *entry.key()).collect();
        for id in remaining {
            self.inner.report_if_unobserved(id);
        }
        info!("pipeline engine drained");
    }

    fn register(&self) -> (TaskHandle, CancellationToken) {
        let id = TaskId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();
        self.inner.tasks.insert(id, TaskRecord::new(token.clone()));
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        (TaskHandle::new(id, &self.inner), token)
    }
}

impl EngineInner {
    /// Apply an event to a task. Terminal events settle the task exactly
    /// once; later terminal events are ignored (first terminal event wins).
    fn apply(self: &Arc<Self>, id: TaskId, event: TaskEvent) {
        if !event.is_terminal() {
            if let Some(mut entry) = self.tasks.get_mut(&id) {
                let record = entry.value_mut();
                if let Ok(next) = states::transition(record.state, &event) {
                    record.state = next;
                }
            }
            return;
        }

        let (outcome, continuations) = {
            let mut entry = match self.tasks.get_mut(&id) {
                Some(entry) => entry,
                None => return,
            };
            let record = entry.value_mut();
            let next = match states::transition(record.state, &event) {
                Ok(next) => next,
                Err(_) => return,
            };
            record.state = next;
            let outcome: TaskOutcome = match event {
                TaskEvent::Complete(value) => Ok(Arc::new(value)),
                TaskEvent::Fail(cause) => Err(cause),
                TaskEvent::Cancel => {
                    record.cancel.cancel();
                    Err(TaskFailure::Cancelled)
                }
                TaskEvent::Start => unreachable!("start is not a terminal event"),
            };
            record.outcome = Some(outcome.clone());
            (outcome, std::mem::take(record.continuations.get_mut()))
        };

        debug!(task_id = %id, kind = match &outcome {
            Ok(_) => "complete",
            Err(cause) => cause.kind(),
        }, "task settled");

        for continuation in continuations {
            continuation(outcome.clone());
        }

        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_one();
        }
        self.sweep(id);
    }

    /// Attach a continuation, invoking it immediately if the task already
    /// settled. Attachment counts as observation of the outcome.
    fn attach(self: &Arc<Self>, id: TaskId, continuation: Continuation) {
        let mut continuation = Some(continuation);
        let ready = match self.tasks.get_mut(&id) {
            Some(mut entry) => {
                let record = entry.value_mut();
                record.observers += 1;
                match &record.outcome {
                    Some(outcome) => Some(outcome.clone()),
                    None => {
                        if let Some(continuation) = continuation.take() {
                            record.continuations.get_mut().push(continuation);
                        }
                        None
                    }
                }
            }
            // Record already reclaimed; treat as cancelled.
            None => Some(Err(TaskFailure::Cancelled)),
        };
        if let Some(outcome) = ready {
            if let Some(continuation) = continuation {
                continuation(outcome);
            }
        }
    }

    fn add_dependent(&self, upstream: TaskId, downstream: TaskId) {
        if let Some(mut entry) = self.tasks.get_mut(&upstream) {
            entry.value_mut().dependents.push(downstream);
        }
    }

    fn cancel_token(&self, id: TaskId) -> CancellationToken {
        self.tasks
            .get(&id)
            .map(|record| record.cancel.clone())
            .unwrap_or_default()
    }

    fn cancel_by_id(self: &Arc<Self>, id: TaskId) {
        let token = self.cancel_token(id);
        token.cancel();
        self.apply(id, TaskEvent::Cancel);
    }

    fn on_handle_dropped(self: &Arc<Self>, id: TaskId) {
        if let Some(mut entry) = self.tasks.get_mut(&id) {
            entry.value_mut().detached = true;
        }
        self.sweep(id);
    }

    /// Reclaim the arena slot once the task is terminal and unreferenced,
    /// surfacing an unobserved failure to the sink first.
    fn sweep(self: &Arc<Self>, id: TaskId) {
        let failure = {
            let mut entry = match self.tasks.get_mut(&id) {
                Some(entry) => entry,
                None => return,
            };
            let record = entry.value_mut();
            if !(record.state.is_terminal() && record.detached) {
                return;
            }
            match &record.outcome {
                Some(Err(cause))
                    if record.observers == 0
                        && !record.reported
                        && !matches!(cause, TaskFailure::Cancelled) =>
                {
                    record.reported = true;
                    Some(cause.clone())
                }
                _ => None,
            }
        };
        if let Some(cause) = failure {
            let sink = self.sink.read().clone();
            sink(id, &cause);
        }
        self.tasks.remove(&id);
    }

    /// Shutdown-time sweep: surface any settled failure that was never
    /// observed, whether or not handles are still alive.
    fn report_if_unobserved(self: &Arc<Self>, id: TaskId) {
        let failure = {
            let mut entry = match self.tasks.get_mut(&id) {
                Some(entry) => entry,
                None => return,
            };
            let record = entry.value_mut();
            match &record.outcome {
                Some(Err(cause))
                    if record.observers == 0
                        && !record.reported
                        && !matches!(cause, TaskFailure::Cancelled) =>
                {
                    record.reported = true;
                    Some(cause.clone())
                }
                _ => None,
            }
        };
        if let Some(cause) = failure {
            let sink = self.sink.read().clone();
            sink(id, &cause);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_submit_completes_with_value() {
        let engine = PipelineEngine::new();
        let task = engine.submit(async { Ok(json!(41)) });
        let outcome = task.join().await.unwrap();
        assert_eq!(*outcome, json!(41));
        assert_eq!(task.state(), TaskState::Complete);
    }

    #[tokio::test]
    async fn test_submit_blocking_runs_off_the_event_loop() {
        let engine = PipelineEngine::new();
        let task = engine.submit_blocking(|| Ok(json!("done")));
        let outcome = task.join().await.unwrap();
        assert_eq!(*outcome, json!("done"));
    }

    #[tokio::test]
    async fn test_chain_propagates_failure_without_running_continuation() {
        let engine = PipelineEngine::new();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        let root = engine.submit(async { Err(TaskFailure::failed("boom")) });
        let chained = engine.chain(&root, move |_| async move {
            ran_clone.store(true, Ordering::SeqCst);
            Ok(Value::Null)
        });
        let outcome = chained.join().await;
        assert!(matches!(outcome, Err(TaskFailure::Failed(msg)) if msg == "boom"));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_recover_passes_success_through() {
        let engine = PipelineEngine::new();
        let root = engine.submit(async { Ok(json!("fine")) });
        let recovered = engine.recover(&root, |_| async { Ok(json!("rescued")) });
        let outcome = recovered.join().await.unwrap();
        assert_eq!(*outcome, json!("fine"));
    }

    #[tokio::test]
    async fn test_recover_handles_failure() {
        let engine = PipelineEngine::new();
        let root = engine.submit(async { Err(TaskFailure::failed("boom")) });
        let recovered = engine.recover(&root, |cause| async move {
            Ok(json!({ "rescued_from": cause.to_string() }))
        });
        let outcome = recovered.join().await.unwrap();
        assert_eq!(*outcome, json!({ "rescued_from": "task failed: boom" }));
    }

    #[tokio::test]
    async fn test_unhandled_failure_reaches_sink() {
        let engine = PipelineEngine::new();
        let reported: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let reported_clone = reported.clone();
        engine.set_unhandled_sink(move |_, cause| {
            reported_clone.lock().unwrap().push(cause.to_string());
        });

        let task = engine.submit(async { Err(TaskFailure::failed("dropped on the floor")) });
        // Wait for the task to settle, then drop the only handle unobserved.
        while !task.state().is_terminal() {
            tokio::task::yield_now().await;
        }
        drop(task);
        tokio::task::yield_now().await;

        let seen = reported.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("dropped on the floor"));
    }

    #[tokio::test]
    async fn test_observed_failure_is_not_reported() {
        let engine = PipelineEngine::new();
        let reported = Arc::new(AtomicUsize::new(0));
        let reported_clone = reported.clone();
        engine.set_unhandled_sink(move |_, _| {
            reported_clone.fetch_add(1, Ordering::SeqCst);
        });

        let task = engine.submit(async { Err(TaskFailure::failed("seen")) });
        let _ = task.join().await;
        drop(task);
        tokio::task::yield_now().await;
        assert_eq!(reported.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_cancelled() {
        let engine = PipelineEngine::new();
        engine.shutdown(Duration::from_millis(10)).await;
        let task = engine.submit(async { Ok(Value::Null) });
        let outcome = task.join().await;
        assert!(matches!(outcome, Err(TaskFailure::Cancelled)));
    }
}
