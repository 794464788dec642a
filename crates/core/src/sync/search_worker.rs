//! Debounced symbol search.
//!
//! Receives query commands from an mpsc channel and waits until the input has
//! been quiet for the debounce window before dispatching the latest query.
//! Every new command restarts the window.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::mpsc;

use super::orchestrator::Inner;

#[derive(Debug)]
pub(crate) enum SearchCommand {
    /// New search box text (non-blank)
    Query(String),
    /// Drop any query still waiting for the debounce window
    Cancel,
}

pub(crate) async fn search_worker(
    mut rx: mpsc::UnboundedReceiver<SearchCommand>,
    inner: Arc<Inner>,
    debounce: Duration,
) {
    info!("Search worker started ({:?} debounce)", debounce);

    let mut pending: Option<String> = None;

    loop {
        if pending.is_some() {
            tokio::select! {
                command = rx.recv() => {
                    match command {
                        Some(SearchCommand::Query(query)) => pending = Some(query),
                        Some(SearchCommand::Cancel) => {
                            debug!("Pending search cancelled");
                            pending = None;
                        }
                        None => break,
                    }
                }
                _ = tokio::time::sleep(debounce) => {
                    if let Some(query) = pending.take() {
                        inner.dispatch_search(query);
                    }
                }
            }
        } else {
            match rx.recv().await {
                Some(SearchCommand::Query(query)) => pending = Some(query),
                Some(SearchCommand::Cancel) => {}
                None => break,
            }
        }
    }

    info!("Search worker shutting down");
}
