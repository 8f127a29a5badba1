//! Background job registry

use crate::packet::Packet;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::debug;

/// Maps a client-generated `Job-UUID` to the waiter that issued the
/// `bgapi`. An entry lives from dispatch until its result packet arrives;
/// resolving removes it, so each result is delivered at most once.
#[derive(Default)]
pub struct JobRegistry {
    jobs: HashMap<String, oneshot::Sender<Packet>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job_id: String, sender: oneshot::Sender<Packet>) {
        debug!(job_id = job_id.as_str(), "background job registered");
        self.jobs.insert(job_id, sender);
    }

    /// Remove and return the waiter for `job_id`, if any.
    pub fn resolve(&mut self, job_id: &str) -> Option<oneshot::Sender<Packet>> {
        self.jobs.remove(job_id)
    }

    /// Drop every waiter, e.g. when the session is lost. Returns how many
    /// jobs were abandoned.
    pub fn clear(&mut self) -> usize {
        let abandoned = self.jobs.len();
        self.jobs.clear();
        abandoned
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
