pub mod uploads;

pub use uploads::{error_log_path, DirectoryStats, UploadDirs};
