use super::*;
use crate::compile::compiler::compile;
use crate::compile::program::Instruction;
use crate::render::backend::BackendCaps;
use crate::scene::model::ElementKind;
use crate::schema::validate::validate;
use serde_json::json;
use std::sync::mpsc::{Receiver, Sender};

const LONG: Option<Duration> = Some(Duration::from_secs(10));

fn program(scenes: u64) -> CompiledProgram {
    let scenes: Vec<_> = (1..=scenes)
        .map(|id| {
            json!({
                "scene_id": id,
                "duration": 2,
                "elements": [{ "type": "equation", "content": "x^2" }]
            })
        })
        .collect();
    compile(&validate(&json!({ "title": "T", "scenes": scenes })).unwrap())
}

#[derive(Default)]
struct FakeBackend {
    typesetting: bool,
    probe_error: Option<BackendError>,
    fail_scene: Option<u64>,
    panic_scene: Option<u64>,
    delay: Option<Duration>,
    /// Each scene waits for one token before returning.
    gate: Option<Mutex<Receiver<()>>>,
    /// Receives the scene id when a scene starts.
    started: Option<Mutex<Sender<u64>>>,
    seen: Mutex<Vec<SceneBlock>>,
    /// Set when a delayed scene noticed the abort signal.
    aborted: AtomicBool,
    released: Mutex<Vec<JobId>>,
}

impl RenderBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn probe(&self) -> Result<BackendCaps, BackendError> {
        match &self.probe_error {
            Some(e) => Err(e.clone()),
            None => Ok(BackendCaps {
                typesetting: self.typesetting,
            }),
        }
    }

    fn render_scene(
        &self,
        job: &JobContext,
        scene: &SceneContext,
        block: &SceneBlock,
    ) -> Result<PathBuf, BackendError> {
        if let Some(tx) = &self.started {
            let _ = tx.lock().send(block.scene_id);
        }
        self.seen.lock().push(block.clone());
        scene.progress.report(0.5);
        if let Some(gate) = &self.gate {
            let _ = gate.lock().recv();
        }
        if let Some(d) = self.delay {
            let until = Instant::now() + d;
            while Instant::now() < until {
                if job.abort.is_raised() {
                    self.aborted.store(true, Ordering::SeqCst);
                    return Err(BackendError::failed("aborted"));
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        if self.panic_scene == Some(block.scene_id) {
            panic!("scene {} exploded", block.scene_id);
        }
        if self.fail_scene == Some(block.scene_id) {
            return Err(BackendError::failed("renderer crashed"));
        }
        Ok(PathBuf::from(format!("clip_{}.mp4", block.scene_id)))
    }

    fn finalize(&self, job: &JobContext, clips: &[PathBuf]) -> Result<PathBuf, BackendError> {
        assert_eq!(clips.len(), job.scene_count);
        Ok(job.options.output_dir.join(format!("{}.mp4", job.job_id)))
    }

    fn release(&self, job: &JobContext) {
        self.released.lock().push(job.job_id);
    }
}

fn manager(backend: FakeBackend, workers: usize) -> (JobManager, Arc<FakeBackend>) {
    let backend = Arc::new(backend);
    let mgr = JobManager::new(
        backend.clone(),
        JobManagerOpts {
            max_concurrent_jobs: workers,
            render: RenderOptions {
                output_dir: PathBuf::from("out"),
                ..RenderOptions::default()
            },
        },
    )
    .unwrap();
    (mgr, backend)
}

fn gated() -> (FakeBackend, Sender<()>, Receiver<u64>) {
    let (gate_tx, gate_rx) = mpsc::channel();
    let (start_tx, start_rx) = mpsc::channel();
    let backend = FakeBackend {
        gate: Some(Mutex::new(gate_rx)),
        started: Some(Mutex::new(start_tx)),
        ..FakeBackend::default()
    };
    (backend, gate_tx, start_rx)
}

#[test]
fn completed_job_reports_output_and_monotonic_progress() {
    let (mgr, _) = manager(FakeBackend::default(), 1);
    let id = mgr.submit(program(3));
    let seen: Vec<_> = mgr.subscribe(id).unwrap().collect();

    let last = seen.last().unwrap();
    assert_eq!(last.state, JobState::Completed);
    assert_eq!(last.progress, 1.0);
    assert_eq!(last.output_path, Some(PathBuf::from(format!("out/{id}.mp4"))));
    assert!(seen.windows(2).all(|w| w[0].progress <= w[1].progress));
    assert_eq!(mgr.status(id).unwrap(), *last);
}

#[test]
fn probe_failure_fails_the_job_with_its_message() {
    let (mgr, backend) = manager(
        FakeBackend {
            probe_error: Some(BackendError::missing("manim not found")),
            ..FakeBackend::default()
        },
        1,
    );
    let id = mgr.submit(program(1));
    let job = mgr.wait(id, LONG).unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert!(job.error.unwrap().contains("manim not found"));
    assert!(backend.seen.lock().is_empty());
}

#[test]
fn scene_failure_names_the_scene() {
    let (mgr, _) = manager(
        FakeBackend {
            fail_scene: Some(2),
            ..FakeBackend::default()
        },
        1,
    );
    let job = mgr.wait(mgr.submit(program(3)), LONG).unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.error.as_deref(), Some("scene 2: renderer crashed"));
    assert!(job.output_path.is_none());
}

#[test]
fn backend_panic_fails_only_that_job() {
    let (mgr, _) = manager(
        FakeBackend {
            panic_scene: Some(2),
            ..FakeBackend::default()
        },
        1,
    );
    let job = mgr.wait(mgr.submit(program(2)), LONG).unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert!(job.error.unwrap().contains("panicked"));

    let ok = mgr.wait(mgr.submit(program(1)), LONG).unwrap();
    assert_eq!(ok.state, JobState::Completed);
}

#[test]
fn slow_backend_call_times_out_and_is_aborted() {
    let (mgr, backend) = manager(
        FakeBackend {
            delay: Some(Duration::from_secs(5)),
            ..FakeBackend::default()
        },
        1,
    );
    let id = mgr.submit_with(
        program(1),
        RenderOptions {
            timeout: Some(Duration::from_millis(50)),
            ..RenderOptions::default()
        },
    );
    let job = mgr.wait(id, LONG).unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(
        job.error.as_deref(),
        Some("scene 1: timed out after 0.05s during scene 1")
    );
    assert!(backend.aborted.load(Ordering::SeqCst));
    assert_eq!(*backend.released.lock(), vec![id]);
}

#[test]
fn resources_are_released_on_every_outcome() {
    let (mgr, backend) = manager(
        FakeBackend {
            fail_scene: Some(2),
            ..FakeBackend::default()
        },
        1,
    );
    let failed = mgr.submit(program(2));
    assert_eq!(mgr.wait(failed, LONG).unwrap().state, JobState::Failed);
    let completed = mgr.submit(program(1));
    mgr.wait(completed, LONG).unwrap();
    assert_eq!(*backend.released.lock(), vec![failed, completed]);
}

#[test]
fn jobs_beyond_the_pool_size_wait_in_queue() {
    let (backend, gate, started) = gated();
    let (mgr, backend) = manager(backend, 1);
    let first = mgr.submit(program(1));
    assert_eq!(started.recv().unwrap(), 1);

    let second = mgr.submit(program(1));
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(mgr.status(first).unwrap().state, JobState::Running);
    assert_eq!(mgr.status(second).unwrap().state, JobState::Queued);
    assert!(started.try_recv().is_err());
    assert_eq!(backend.seen.lock().len(), 1);

    gate.send(()).unwrap();
    assert_eq!(started.recv_timeout(Duration::from_secs(10)).unwrap(), 1);
    gate.send(()).unwrap();
    assert_eq!(mgr.wait(first, LONG).unwrap().state, JobState::Completed);
    assert_eq!(mgr.wait(second, LONG).unwrap().state, JobState::Completed);
    assert_eq!(backend.seen.lock().len(), 2);
}

#[test]
fn equations_fall_back_to_text_without_typesetting() {
    let (mgr, backend) = manager(FakeBackend::default(), 1);
    mgr.wait(mgr.submit(program(1)), LONG).unwrap();
    let seen = backend.seen.lock();
    let Instruction::Construct { element, .. } = &seen[0].instructions[0] else {
        panic!("expected construct");
    };
    assert_eq!(
        element.kind,
        ElementKind::Text {
            content: "x^2".to_owned()
        }
    );
}

#[test]
fn equations_are_kept_when_backend_typesets() {
    let (mgr, backend) = manager(
        FakeBackend {
            typesetting: true,
            ..FakeBackend::default()
        },
        1,
    );
    mgr.wait(mgr.submit(program(1)), LONG).unwrap();
    let seen = backend.seen.lock();
    assert_eq!(seen[0].instructions, program(1).blocks()[0].instructions);
}

#[test]
fn cancel_queued_job_never_runs_it() {
    let (backend, gate, started) = gated();
    let (mgr, backend) = manager(backend, 1);
    let first = mgr.submit(program(1));
    assert_eq!(started.recv().unwrap(), 1);

    let second = mgr.submit(program(1));
    mgr.cancel(second).unwrap();
    assert_eq!(mgr.status(second).unwrap().state, JobState::Cancelled);

    gate.send(()).unwrap();
    assert_eq!(mgr.wait(first, LONG).unwrap().state, JobState::Completed);
    assert_eq!(mgr.wait(second, LONG).unwrap().state, JobState::Cancelled);
    assert_eq!(backend.seen.lock().len(), 1);
}

#[test]
fn cancel_during_only_scene_still_completes() {
    let (backend, gate, started) = gated();
    let (mgr, _) = manager(backend, 1);
    let id = mgr.submit(program(1));
    started.recv().unwrap();
    mgr.cancel(id).unwrap();
    gate.send(()).unwrap();
    assert_eq!(mgr.wait(id, LONG).unwrap().state, JobState::Completed);
}

#[test]
fn cancel_stops_at_next_scene_boundary() {
    let (backend, gate, started) = gated();
    let (mgr, backend) = manager(backend, 1);
    let id = mgr.submit(program(3));
    started.recv().unwrap();
    mgr.cancel(id).unwrap();
    gate.send(()).unwrap();

    let job = mgr.wait(id, LONG).unwrap();
    assert_eq!(job.state, JobState::Cancelled);
    assert!(job.output_path.is_none());
    assert_eq!(backend.seen.lock().len(), 1);
}

#[test]
fn unknown_and_terminal_jobs_are_rejected() {
    let (mgr, _) = manager(FakeBackend::default(), 1);
    let ghost = JobId::new();
    assert!(matches!(mgr.status(ghost), Err(SceneCraftError::NotFound(id)) if id == ghost));
    assert!(matches!(mgr.cancel(ghost), Err(SceneCraftError::NotFound(_))));
    assert!(matches!(mgr.subscribe(ghost), Err(SceneCraftError::NotFound(_))));

    let id = mgr.submit(program(1));
    mgr.wait(id, LONG).unwrap();
    assert!(matches!(
        mgr.cancel(id),
        Err(SceneCraftError::AlreadyTerminal {
            state: JobState::Completed,
            ..
        })
    ));
}

#[test]
fn wait_returns_latest_snapshot_on_timeout() {
    let (backend, gate, started) = gated();
    let (mgr, _) = manager(backend, 1);
    let id = mgr.submit(program(2));
    started.recv().unwrap();

    let job = mgr.wait(id, Some(Duration::from_millis(20))).unwrap();
    assert_eq!(job.state, JobState::Running);
    gate.send(()).unwrap();
    gate.send(()).unwrap();
    assert_eq!(mgr.wait(id, LONG).unwrap().state, JobState::Completed);
}

#[test]
fn jobs_are_listed_in_submission_order() {
    let (mgr, _) = manager(FakeBackend::default(), 2);
    let ids: Vec<_> = (0..4).map(|_| mgr.submit(program(1))).collect();
    for id in &ids {
        mgr.wait(*id, LONG).unwrap();
    }
    let listed: Vec<_> = mgr.jobs().into_iter().map(|j| j.job_id).collect();
    assert_eq!(listed, ids);
}

#[test]
fn zero_workers_is_rejected() {
    let backend: Arc<dyn RenderBackend> = Arc::new(FakeBackend::default());
    let opts = JobManagerOpts {
        max_concurrent_jobs: 0,
        ..JobManagerOpts::default()
    };
    assert!(JobManager::new(backend, opts).is_err());
}
