use std::path::PathBuf;

use crate::actors::supervisor::SupervisorHandle;

/// Shared state of the HTTP server.
pub struct AppState {
    pub supervisor: SupervisorHandle,
    /// Where lesson transcripts are listed from.
    pub transcripts_dir: PathBuf,
}

impl AppState {
    pub fn new(supervisor: SupervisorHandle, transcripts_dir: PathBuf) -> Self {
        Self {
            supervisor,
            transcripts_dir,
        }
    }
}
