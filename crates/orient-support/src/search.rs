//! Orientation search.
//!
//! [`run_search`] is the synchronous evaluation loop. [`OrientationSearch`]
//! runs the same loop on a dedicated worker thread and streams
//! [`ProgressEvent`]s to the caller over a FIFO channel, so neither side
//! waits on the other.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use orient_math::Rotation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{OrientError, Result};
use crate::mesh::Mesh;
use crate::rotate::{rotate, seat_on_platform};
use crate::sample::Candidate;
use crate::support::estimate_support;
use crate::OrientSettings;

/// Cooperative cancellation flag shared between a search and its owner.
///
/// Checked once at the top of every iteration; an evaluation in progress
/// always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Lifecycle of an [`OrientationSearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SearchState {
    /// No search has been started.
    Idle = 0,
    /// A worker is evaluating candidates.
    Running = 1,
    /// All samples were evaluated.
    Completed = 2,
    /// Stopped early, by request or by an in-search error.
    Cancelled = 3,
}

impl SearchState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Cancelled,
            _ => Self::Idle,
        }
    }
}

/// One evaluated candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// The candidate as sampled.
    pub candidate: Candidate,
    /// Its canonical rotation.
    pub rotation: Rotation,
    /// Support metric in this orientation.
    pub metric: f64,
    /// 1-based evaluation index.
    pub iteration: usize,
}

/// Emitted after every evaluation, in iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The candidate as sampled.
    pub candidate: Candidate,
    /// Its canonical rotation.
    pub rotation: Rotation,
    /// Support metric in this orientation.
    pub metric: f64,
    /// 1-based evaluation index.
    pub iteration: usize,
    /// Lowest metric seen so far, this evaluation included.
    pub best_metric: f64,
}

/// Outcome of one search run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// First evaluation achieving the lowest metric.
    pub best: Option<Evaluation>,
    /// Number of candidates evaluated.
    pub iterations_run: usize,
    /// True when the run stopped before evaluating every sample.
    pub was_cancelled: bool,
    /// Every evaluation, in order.
    pub history: Vec<Evaluation>,
    /// Set when the run stopped because of an in-search error.
    pub error: Option<String>,
}

impl SearchResult {
    /// The best metric found, if anything was evaluated.
    pub fn best_metric(&self) -> Option<f64> {
        self.best.map(|b| b.metric)
    }

    /// The best rotation found, if anything was evaluated.
    pub fn best_rotation(&self) -> Option<Rotation> {
        self.best.map(|b| b.rotation)
    }
}

/// Evaluate up to `settings.n_samples` candidates from `candidates`,
/// keeping the first one with the lowest metric.
///
/// `on_progress` is called after each evaluation. The input mesh is never
/// modified; every candidate is measured on a freshly rotated copy.
pub fn run_search<I, F>(
    mesh: &Mesh,
    candidates: I,
    settings: &OrientSettings,
    cancel: &CancelToken,
    on_progress: F,
) -> Result<SearchResult>
where
    I: IntoIterator<Item = Candidate>,
    F: FnMut(ProgressEvent),
{
    settings.validate()?;
    if mesh.is_empty() {
        return Err(OrientError::EmptyMesh);
    }
    Ok(evaluate(mesh, candidates, settings, cancel, on_progress))
}

fn evaluate<I, F>(
    mesh: &Mesh,
    candidates: I,
    settings: &OrientSettings,
    cancel: &CancelToken,
    mut on_progress: F,
) -> SearchResult
where
    I: IntoIterator<Item = Candidate>,
    F: FnMut(ProgressEvent),
{
    let start = Instant::now();
    let support = settings.support_settings();
    let mut candidates = candidates.into_iter();
    let mut result = SearchResult {
        history: Vec::with_capacity(settings.n_samples),
        ..Default::default()
    };

    info!(
        triangles = mesh.len(),
        samples = settings.n_samples,
        mode = ?settings.sampling_mode,
        objective = ?settings.objective,
        "orientation search started"
    );

    for i in 0..settings.n_samples {
        if cancel.is_cancelled() {
            info!(iterations = i, "orientation search cancelled");
            result.was_cancelled = true;
            break;
        }

        let Some(candidate) = candidates.next() else {
            let msg = format!(
                "sampler exhausted after {i} of {} candidates",
                settings.n_samples
            );
            warn!("{msg}");
            result.was_cancelled = true;
            result.error = Some(msg);
            break;
        };

        let rotation = candidate.rotation();
        let mut oriented = rotate(mesh, &rotation);
        if settings.seat_on_platform {
            oriented = seat_on_platform(&oriented);
        }
        let metric = estimate_support(&oriented, &support).metric(settings.objective);

        let evaluation = Evaluation {
            candidate,
            rotation,
            metric,
            iteration: i + 1,
        };
        // Strict less-than keeps the first of equal metrics
        if result.best.map_or(true, |best| metric < best.metric) {
            debug!(iteration = i + 1, metric, "new best orientation");
            result.best = Some(evaluation);
        }
        result.history.push(evaluation);
        result.iterations_run = i + 1;

        on_progress(ProgressEvent {
            candidate,
            rotation,
            metric,
            iteration: i + 1,
            best_metric: result.best_metric().unwrap_or(metric),
        });
    }

    info!(
        iterations = result.iterations_run,
        cancelled = result.was_cancelled,
        best = ?result.best_metric(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "orientation search finished"
    );
    result
}

/// Runs one orientation search at a time on a worker thread.
///
/// `Idle -> Running -> {Completed | Cancelled}`. Progress is read only from
/// the channel returned by [`start`](Self::start) and the final result only
/// from [`wait`](Self::wait).
#[derive(Debug)]
pub struct OrientationSearch {
    state: Arc<AtomicU8>,
    cancel: CancelToken,
    worker: Option<JoinHandle<SearchResult>>,
}

impl Default for OrientationSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl OrientationSearch {
    /// An idle controller.
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(SearchState::Idle as u8)),
            cancel: CancelToken::new(),
            worker: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SearchState {
        SearchState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Spawn a worker evaluating `candidates` against `mesh`.
    ///
    /// Returns the receiving end of the progress stream. Events arrive in
    /// iteration order and are never dropped; the channel closes when the
    /// worker finishes.
    pub fn start<I>(
        &mut self,
        mesh: Arc<Mesh>,
        candidates: I,
        settings: OrientSettings,
    ) -> Result<Receiver<ProgressEvent>>
    where
        I: IntoIterator<Item = Candidate>,
        I::IntoIter: Send + 'static,
    {
        if self.state() == SearchState::Running {
            return Err(OrientError::AlreadyRunning);
        }
        settings.validate()?;
        if mesh.is_empty() {
            return Err(OrientError::EmptyMesh);
        }
        if self.worker.take().is_some() {
            debug!("discarding uncollected result of previous search");
        }

        let cancel = CancelToken::new();
        let state = Arc::clone(&self.state);
        let worker_cancel = cancel.clone();
        let candidates = candidates.into_iter();
        let (tx, rx) = mpsc::channel();

        state.store(SearchState::Running as u8, Ordering::Release);
        let spawned = thread::Builder::new()
            .name("orient-search".into())
            .spawn(move || {
                // `tx` outlives the state update so a closed stream implies a final state
                let run = panic::catch_unwind(AssertUnwindSafe(|| {
                    evaluate(&mesh, candidates, &settings, &worker_cancel, |event| {
                        // A consumer that hung up does not stop the search
                        let _ = tx.send(event);
                    })
                }));
                let result = run.unwrap_or_else(|payload| {
                    let msg = format!("search worker panicked: {}", panic_message(&*payload));
                    warn!("{msg}");
                    SearchResult {
                        was_cancelled: true,
                        error: Some(msg),
                        ..Default::default()
                    }
                });
                let done = if result.was_cancelled {
                    SearchState::Cancelled
                } else {
                    SearchState::Completed
                };
                state.store(done as u8, Ordering::Release);
                drop(tx);
                result
            });

        match spawned {
            Ok(handle) => {
                self.cancel = cancel;
                self.worker = Some(handle);
                Ok(rx)
            }
            Err(e) => {
                self.state.store(SearchState::Idle as u8, Ordering::Release);
                Err(OrientError::SearchFailed(format!(
                    "failed to spawn search worker: {e}"
                )))
            }
        }
    }

    /// Ask the running search to stop before its next iteration.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that cancels the current run from elsewhere.
    pub fn cancel_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Block until the worker finishes and take its result.
    ///
    /// A run that panicked yields a cancelled result carrying the error.
    pub fn wait(&mut self) -> Result<SearchResult> {
        let handle = self
            .worker
            .take()
            .ok_or_else(|| OrientError::SearchFailed("no search to wait for".into()))?;

        match handle.join() {
            Ok(result) => Ok(result),
            Err(_) => {
                warn!("orientation search worker panicked");
                self.state
                    .store(SearchState::Cancelled as u8, Ordering::Release);
                Ok(SearchResult {
                    was_cancelled: true,
                    error: Some("search worker panicked".into()),
                    ..Default::default()
                })
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

impl Drop for OrientationSearch {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.cancel.cancel();
        }
    }
}
