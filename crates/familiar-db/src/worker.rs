//! Background load fetch.
//!
//! One worker thread receives [`FetchRequest`]s over a crossbeam channel,
//! reads the child rows from the shared [`Store`], and sends a
//! [`FetchCompletion`] back. The simulation thread drains completions with
//! [`AsyncFetch::ready`] and never blocks on the store.

use crate::error::{Error, Result};
use crate::store::Store;
use crossbeam_channel::{Receiver, Sender};
use familiar_core::{AsyncFetch, FetchCompletion, FetchRequest, PetStore};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Load fetch running on its own thread.
pub struct FetchWorker {
    request_tx: Option<Sender<FetchRequest>>,
    completion_rx: Receiver<FetchCompletion>,
    handle: Option<JoinHandle<()>>,
}

impl FetchWorker {
    /// Start the worker thread over a shared store.
    pub fn spawn(store: Arc<Store>) -> Result<Self> {
        let (request_tx, request_rx) = crossbeam_channel::unbounded();
        let (completion_tx, completion_rx) = crossbeam_channel::unbounded();
        let handle = thread::Builder::new()
            .name("familiar-fetch".into())
            .spawn(move || worker_loop(store, request_rx, completion_tx))?;
        Ok(Self {
            request_tx: Some(request_tx),
            completion_rx,
            handle: Some(handle),
        })
    }

    /// Block until at least one completion arrives or `timeout` passes,
    /// then drain whatever else is ready.
    pub fn wait_ready(&self, timeout: Duration) -> Vec<FetchCompletion> {
        let mut ready = Vec::new();
        if let Ok(first) = self.completion_rx.recv_timeout(timeout) {
            ready.push(first);
            ready.extend(self.completion_rx.try_iter());
        }
        ready
    }
}

impl AsyncFetch for FetchWorker {
    fn submit(&self, request: FetchRequest) -> familiar_core::Result<()> {
        let tx = self
            .request_tx
            .as_ref()
            .ok_or_else(|| Error::Worker("shut down".to_string()))?;
        tx.send(request)
            .map_err(|_| Error::Worker("request channel closed".to_string()))?;
        Ok(())
    }

    fn ready(&self) -> Vec<FetchCompletion> {
        self.completion_rx.try_iter().collect()
    }
}

impl Drop for FetchWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the loop.
        self.request_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Fetch worker panicked");
            }
        }
    }
}

fn worker_loop(
    store: Arc<Store>,
    requests: Receiver<FetchRequest>,
    completions: Sender<FetchCompletion>,
) {
    while let Ok(request) = requests.recv() {
        let ticket = request.ticket;
        let rows = store.fetch_children(ticket.pet);
        if let Err(err) = &rows {
            warn!(pet = %ticket.pet, error = %err, "Child fetch failed");
        }
        if completions.send(FetchCompletion { ticket, rows }).is_err() {
            break;
        }
    }
    debug!("Fetch worker exiting");
}
