//! Unbounded job queue that remembers every path it has accepted.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;

use crate::error::WorkerError;
use crate::worker::job::Job;

/// Pushing never blocks. A path is accepted at most once per process, so a
/// repeated filesystem notification does not create a second job.
#[derive(Clone)]
pub struct FileQueue {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
    seen: Arc<Mutex<HashSet<PathBuf>>>,
}

impl Default for FileQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FileQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            seen: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Enqueues `path`. Returns `Ok(false)` for a path seen before.
    pub fn push(&self, path: PathBuf) -> Result<bool, WorkerError> {
        {
            let mut seen = self.seen.lock().map_err(|_| WorkerError::ChannelClosed)?;
            if !seen.insert(path.clone()) {
                debug!("Ignoring duplicate path {}", path.display());
                return Ok(false);
            }
        }
        self.sender
            .send(Job::new(path))
            .map_err(|_| WorkerError::ChannelClosed)?;
        Ok(true)
    }

    pub fn receiver(&self) -> Receiver<Job> {
        self.receiver.clone()
    }

    /// Jobs waiting for a worker.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }
}
