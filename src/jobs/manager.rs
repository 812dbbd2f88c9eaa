use crate::compile::program::{CompiledProgram, SceneBlock};
use crate::foundation::error::{SceneCraftError, SceneCraftResult};
use crate::foundation::ids::JobId;
use crate::jobs::channel::{Subscription, UpdateChannel};
use crate::jobs::job::{JobState, RenderJob};
use crate::render::backend::{
    AbortSignal, BackendError, JobContext, ProgressReporter, RenderBackend, RenderOptions,
    SceneContext,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

/// How long a timed-out backend call gets to observe its abort signal before it is detached.
const ABORT_GRACE: Duration = Duration::from_secs(2);

/// Job manager configuration.
#[derive(Clone, Debug)]
pub struct JobManagerOpts {
    /// Size of the worker pool; jobs beyond this queue.
    pub max_concurrent_jobs: usize,
    /// Options used by [`JobManager::submit`].
    pub render: RenderOptions,
}

impl Default for JobManagerOpts {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            render: RenderOptions::default(),
        }
    }
}

/// Runs compiled programs against a [`RenderBackend`] on a bounded worker pool and tracks each
/// job's lifecycle.
pub struct JobManager {
    inner: Arc<Inner>,
    pool: rayon::ThreadPool,
}

struct Inner {
    backend: Arc<dyn RenderBackend>,
    defaults: RenderOptions,
    jobs: RwLock<HashMap<JobId, Arc<JobRecord>>>,
    channel: UpdateChannel,
    next_seq: AtomicU64,
}

struct JobRecord {
    id: JobId,
    seq: u64,
    job: Mutex<RenderJob>,
    cancel_requested: AtomicBool,
}

enum Stop {
    Cancelled,
    Failed(String),
}

impl JobManager {
    /// Create a manager whose workers render with `backend`.
    pub fn new(backend: Arc<dyn RenderBackend>, opts: JobManagerOpts) -> SceneCraftResult<Self> {
        if opts.max_concurrent_jobs == 0 {
            return Err(SceneCraftError::Other(anyhow::anyhow!(
                "max_concurrent_jobs must be >= 1"
            )));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.max_concurrent_jobs)
            .thread_name(|i| format!("scenecraft-job-{i}"))
            .panic_handler(|_| tracing::error!("job worker panicked"))
            .build()
            .map_err(|e| {
                SceneCraftError::Other(anyhow::anyhow!("failed to build job worker pool: {e}"))
            })?;
        Ok(Self {
            inner: Arc::new(Inner {
                backend,
                defaults: opts.render,
                jobs: RwLock::new(HashMap::new()),
                channel: UpdateChannel::default(),
                next_seq: AtomicU64::new(0),
            }),
            pool,
        })
    }

    /// Queue `program` with the manager's default render options.
    pub fn submit(&self, program: CompiledProgram) -> JobId {
        let options = self.inner.defaults.clone();
        self.submit_with(program, options)
    }

    /// Queue `program` for rendering and return its id immediately.
    pub fn submit_with(&self, program: CompiledProgram, options: RenderOptions) -> JobId {
        let id = JobId::new();
        let record = Arc::new(JobRecord {
            id,
            seq: self.inner.next_seq.fetch_add(1, Ordering::Relaxed),
            job: Mutex::new(RenderJob::queued(id)),
            cancel_requested: AtomicBool::new(false),
        });
        self.inner.jobs.write().insert(id, record.clone());
        tracing::info!(
            job = %id,
            title = program.title(),
            scenes = program.blocks().len(),
            "job queued"
        );

        let inner = self.inner.clone();
        self.pool.spawn(move || inner.run_job(&record, program, options));
        id
    }

    /// Current snapshot of a job.
    pub fn status(&self, id: JobId) -> SceneCraftResult<RenderJob> {
        Ok(self.inner.record(id)?.job.lock().clone())
    }

    /// Request cancellation.
    ///
    /// A queued job is cancelled at once. A running job stops at its next scene boundary, or
    /// finishes normally if it has none left.
    pub fn cancel(&self, id: JobId) -> SceneCraftResult<()> {
        let record = self.inner.record(id)?;
        let mut job = record.job.lock();
        match job.state {
            JobState::Queued => {
                job.transition(JobState::Cancelled);
                self.inner.channel.publish(id, &job);
                tracing::info!(job = %id, "job cancelled before start");
                Ok(())
            }
            JobState::Running => {
                record.cancel_requested.store(true, Ordering::SeqCst);
                tracing::info!(job = %id, "cancellation requested");
                Ok(())
            }
            state => Err(SceneCraftError::AlreadyTerminal { id, state }),
        }
    }

    /// Follow a job's snapshots, starting with the current one.
    pub fn subscribe(&self, id: JobId) -> SceneCraftResult<Subscription> {
        let record = self.inner.record(id)?;
        let job = record.job.lock();
        Ok(self.inner.channel.subscribe(id, &job))
    }

    /// Block until the job is terminal or `timeout` elapses, returning the latest snapshot.
    pub fn wait(&self, id: JobId, timeout: Option<Duration>) -> SceneCraftResult<RenderJob> {
        let sub = self.subscribe(id)?;
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut latest = None;
        loop {
            let next = match deadline {
                Some(d) => sub.recv_timeout(d.saturating_duration_since(Instant::now())),
                None => sub.recv_timeout(Duration::from_secs(3600)),
            };
            match next {
                Ok(job) if job.is_terminal() => return Ok(job),
                Ok(job) => latest = Some(job),
                Err(RecvTimeoutError::Timeout) if deadline.is_none() => {}
                Err(_) => break,
            }
        }
        match latest {
            Some(job) => Ok(job),
            None => self.status(id),
        }
    }

    /// Snapshots of every job, in submission order.
    pub fn jobs(&self) -> Vec<RenderJob> {
        let mut records: Vec<_> = self.inner.jobs.read().values().cloned().collect();
        records.sort_by_key(|r| r.seq);
        records.iter().map(|r| r.job.lock().clone()).collect()
    }
}

impl Inner {
    fn record(&self, id: JobId) -> SceneCraftResult<Arc<JobRecord>> {
        self.jobs
            .read()
            .get(&id)
            .cloned()
            .ok_or(SceneCraftError::NotFound(id))
    }

    /// Apply `f` under the record lock and publish the snapshot if it changed.
    fn update(&self, record: &JobRecord, f: impl FnOnce(&mut RenderJob) -> bool) -> bool {
        let mut job = record.job.lock();
        let changed = f(&mut job);
        if changed {
            self.channel.publish(record.id, &job);
        }
        changed
    }

    #[tracing::instrument(skip_all, fields(job = %record.id))]
    fn run_job(
        self: &Arc<Self>,
        record: &Arc<JobRecord>,
        program: CompiledProgram,
        options: RenderOptions,
    ) {
        if !self.update(record, |job| job.transition(JobState::Running)) {
            tracing::debug!("job no longer queued; skipping");
            return;
        }
        tracing::info!(backend = self.backend.name(), "job running");

        let job_ctx = Arc::new(JobContext {
            job_id: record.id,
            title: program.title().to_owned(),
            options,
            scene_count: program.blocks().len(),
            abort: AbortSignal::default(),
        });
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.execute(record, &program, &job_ctx)
        }))
        .unwrap_or_else(|_| Err(Stop::Failed("job worker panicked".to_owned())));

        let released = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.backend.release(&job_ctx);
        }));
        if released.is_err() {
            tracing::warn!("backend panicked while releasing job resources");
        }

        match outcome {
            Ok(path) => {
                self.update(record, |job| job.complete(path.clone()));
                tracing::info!(output = %path.display(), "job completed");
            }
            Err(Stop::Cancelled) => {
                self.update(record, |job| job.transition(JobState::Cancelled));
                tracing::info!("job cancelled");
            }
            Err(Stop::Failed(msg)) => {
                tracing::info!(error = %msg, "job failed");
                self.update(record, |job| job.fail(msg));
            }
        }
    }

    fn execute(
        self: &Arc<Self>,
        record: &Arc<JobRecord>,
        program: &CompiledProgram,
        job_ctx: &Arc<JobContext>,
    ) -> Result<PathBuf, Stop> {
        let timeout = job_ctx.options.timeout;
        let abort = &job_ctx.abort;

        let backend = self.backend.clone();
        let caps = call_backend(timeout, abort, "probe".to_owned(), move || backend.probe())
            .map_err(|e| Stop::Failed(e.to_string()))?;
        let plain_text = !caps.typesetting && program.has_equations();
        if plain_text {
            tracing::warn!("backend cannot typeset; rendering equations as plain text");
        }

        let n = program.blocks().len();
        let steps = (n + 1) as f64;
        let mut clips = Vec::with_capacity(n);
        for (i, block) in program.blocks().iter().enumerate() {
            if i > 0 && record.cancel_requested.load(Ordering::SeqCst) {
                return Err(Stop::Cancelled);
            }

            let block: SceneBlock = if plain_text {
                block.with_plain_text_equations()
            } else {
                block.clone()
            };
            let scene = SceneContext {
                index: i,
                progress: self.scene_reporter(record, i, steps),
            };
            let scene_id = block.scene_id;
            tracing::debug!(scene_id, index = i, "rendering scene");

            let backend = self.backend.clone();
            let ctx = job_ctx.clone();
            let clip = call_backend(timeout, abort, format!("scene {scene_id}"), move || {
                backend.render_scene(&ctx, &scene, &block)
            })
            .map_err(|e| Stop::Failed(format!("scene {scene_id}: {e}")))?;
            clips.push(clip);
            self.update(record, |job| job.advance((i + 1) as f64 / steps));
        }

        let backend = self.backend.clone();
        let ctx = job_ctx.clone();
        call_backend(timeout, abort, "finalize".to_owned(), move || {
            backend.finalize(&ctx, &clips)
        })
        .map_err(|e| Stop::Failed(e.to_string()))
    }

    /// Map scene-local fractions of scene `index` onto job progress.
    fn scene_reporter(
        self: &Arc<Self>,
        record: &Arc<JobRecord>,
        index: usize,
        steps: f64,
    ) -> ProgressReporter {
        let inner = Arc::downgrade(self);
        let record = Arc::downgrade(record);
        ProgressReporter::new(move |f| {
            if let (Some(inner), Some(record)) = (inner.upgrade(), record.upgrade()) {
                inner.update(&record, |job| job.advance((index as f64 + f) / steps));
            }
        })
    }
}

/// Run one backend call on a helper thread, bounded by `timeout`.
///
/// On timeout `abort` is raised and the call gets [`ABORT_GRACE`] to wind down before it is
/// detached. A panicking call becomes [`BackendError::Panicked`].
fn call_backend<T: Send + 'static>(
    timeout: Option<Duration>,
    abort: &AbortSignal,
    during: String,
    f: impl FnOnce() -> Result<T, BackendError> + Send + 'static,
) -> Result<T, BackendError> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("scenecraft-backend".to_owned())
        .spawn(move || {
            let _ = tx.send(std::panic::catch_unwind(AssertUnwindSafe(f)));
        })
        .map_err(|e| BackendError::failed(format!("failed to spawn backend thread: {e}")))?;

    let received = match timeout {
        Some(after) => match rx.recv_timeout(after) {
            Ok(received) => received,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(during = %during, secs = after.as_secs_f64(), "backend call timed out");
                abort.raise();
                if rx.recv_timeout(ABORT_GRACE).is_err() {
                    tracing::warn!(during = %during, "backend call ignored abort; detaching it");
                }
                return Err(BackendError::Timeout { after, during });
            }
            Err(RecvTimeoutError::Disconnected) => return Err(BackendError::Panicked(during)),
        },
        None => rx
            .recv()
            .map_err(|_| BackendError::Panicked(during.clone()))?,
    };
    received.unwrap_or_else(|_| Err(BackendError::Panicked(during)))
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/manager.rs"]
mod tests;
