use crate::foundation::ids::JobId;
use crate::jobs::job::RenderJob;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Per-job fan-out of [`RenderJob`] snapshots.
///
/// Callers serialize `subscribe` and `publish` for the same job (the job manager does so under
/// the job record lock), which is what keeps a new subscriber from missing a transition.
#[derive(Default)]
pub(crate) struct UpdateChannel {
    topics: Mutex<HashMap<JobId, Arc<Topic>>>,
}

#[derive(Default)]
struct Topic {
    subscribers: Mutex<Vec<Sender<RenderJob>>>,
}

impl UpdateChannel {
    /// Register a subscriber that first receives `current`.
    ///
    /// When `current` is terminal the subscription yields it and then ends.
    pub(crate) fn subscribe(&self, job_id: JobId, current: &RenderJob) -> Subscription {
        let (tx, rx) = mpsc::channel();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(current.clone());
        if !current.is_terminal() {
            let topic = self.topics.lock().entry(job_id).or_default().clone();
            topic.subscribers.lock().push(tx);
        }
        Subscription { job_id, rx }
    }

    /// Deliver `snapshot` to every live subscriber of `job_id`.
    ///
    /// Dropped subscribers are pruned here. A terminal snapshot closes the topic.
    pub(crate) fn publish(&self, job_id: JobId, snapshot: &RenderJob) {
        let topic = {
            let mut topics = self.topics.lock();
            if snapshot.is_terminal() {
                topics.remove(&job_id)
            } else {
                topics.get(&job_id).cloned()
            }
        };
        let Some(topic) = topic else {
            return;
        };

        let mut subs = topic.subscribers.lock();
        subs.retain(|tx| tx.send(snapshot.clone()).is_ok());
        if snapshot.is_terminal() {
            subs.clear();
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self, job_id: JobId) -> usize {
        self.topics
            .lock()
            .get(&job_id)
            .map_or(0, |t| t.subscribers.lock().len())
    }
}

/// Stream of snapshots for one job, ending after the terminal snapshot.
///
/// Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    job_id: JobId,
    rx: Receiver<RenderJob>,
}

impl Subscription {
    /// Job this subscription follows.
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Wait up to `timeout` for the next snapshot.
    ///
    /// `Err(Disconnected)` means the stream has ended.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<RenderJob, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Next snapshot if one is already buffered.
    pub fn try_recv(&self) -> Option<RenderJob> {
        self.rx.try_recv().ok()
    }
}

impl Iterator for Subscription {
    type Item = RenderJob;

    fn next(&mut self) -> Option<RenderJob> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/channel.rs"]
mod tests;
