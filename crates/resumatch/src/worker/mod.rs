pub mod job;
pub mod pool;
pub mod queue;
pub mod scanner;

pub use job::{Job, JobResult};
pub use pool::WorkerPool;
pub use queue::FileQueue;
pub use scanner::DirectoryScanner;

// Re-export crossbeam_channel for use in the daemon
pub use crossbeam_channel;
