//! Sync orchestration: refresh streams, pollers and debounced search.

mod generation;
mod orchestrator;
mod search_worker;
mod state;

pub use generation::{Generation, StreamGeneration};
pub use orchestrator::SyncOrchestrator;
pub use state::{DashboardState, StreamStatus};
