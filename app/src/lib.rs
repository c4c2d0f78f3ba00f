use thiserror::Error;

pub use leaderboard::*;
pub use session::*;
pub use stats::*;

mod leaderboard;
mod session;
mod stats;

/// Errors from the file-backed stores. Reads recover from these locally;
/// writes surface them so the session can log and drop the write.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed stats data: {0}")]
    Json(#[from] serde_json::Error),
}
