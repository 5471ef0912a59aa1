use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::{self, Sender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::memory_registry::MemoryRegistry;
use crate::capabilities::{BatchOpts, CapabilityListener, PendingChange, Resolution};
use crate::error::DriverError;

pub type BatchOutcome = Result<Option<Resolution>, DriverError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebouncerError {
    #[error("Debouncer worker has stopped")]
    Stopped,
}

/// Commands sent to the worker task
#[derive(Debug)]
enum DebouncerCommand {
    /// A user or automation edited one or more capabilities
    Edit {
        change: PendingChange,
        opts: BatchOpts,
        reply: Option<oneshot::Sender<BatchOutcome>>,
    },

    /// Stop the worker, dropping any batch still being collected
    Shutdown,
}

/// Host-side debouncer: edits arriving within `window` of the first one are
/// folded into a single batch and handed to the device's listener. Batches
/// are processed one at a time.
#[derive(Clone)]
pub struct CapabilityDebouncer {
    command_sender: Sender<DebouncerCommand>,
}

impl CapabilityDebouncer {
    pub fn spawn<L: CapabilityListener + 'static>(
        listener: Arc<L>,
        registry: Arc<MemoryRegistry>,
        window: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (command_sender, receiver) = mpsc::channel(32);
        let worker = DebouncerWorker {
            listener,
            registry,
            window,
            pending: PendingChange::default(),
            opts: BatchOpts::default(),
            waiters: vec![],
            deadline: None,
        };
        let handle = tokio::spawn(worker.run(receiver));
        (Self { command_sender }, handle)
    }

    /// Queues an edit without waiting for the device.
    pub async fn submit(&self, change: PendingChange, opts: BatchOpts) -> Result<(), DebouncerError> {
        self.command_sender
            .send(DebouncerCommand::Edit {
                change,
                opts,
                reply: None,
            })
            .await
            .map_err(|_| DebouncerError::Stopped)
    }

    /// Queues an edit and waits for the outcome of the batch it ends up in.
    pub async fn submit_and_wait(
        &self,
        change: PendingChange,
        opts: BatchOpts,
    ) -> Result<BatchOutcome, DebouncerError> {
        let (tx, rx) = oneshot::channel();
        self.command_sender
            .send(DebouncerCommand::Edit {
                change,
                opts,
                reply: Some(tx),
            })
            .await
            .map_err(|_| DebouncerError::Stopped)?;
        rx.await.map_err(|_| DebouncerError::Stopped)
    }

    pub async fn shutdown(&self) {
        let _ = self.command_sender.send(DebouncerCommand::Shutdown).await;
    }
}

struct DebouncerWorker<L: CapabilityListener> {
    listener: Arc<L>,
    registry: Arc<MemoryRegistry>,
    window: Duration,
    pending: PendingChange,
    opts: BatchOpts,
    waiters: Vec<oneshot::Sender<BatchOutcome>>,
    deadline: Option<Instant>,
}

impl<L: CapabilityListener> DebouncerWorker<L> {
    async fn run(mut self, mut receiver: mpsc::Receiver<DebouncerCommand>) {
        loop {
            let deadline = self.deadline;
            tokio::select! {
                cmd = receiver.recv() => {
                    match cmd {
                        Some(DebouncerCommand::Edit { change, opts, reply }) => {
                            self.collect(change, opts, reply);
                        }
                        Some(DebouncerCommand::Shutdown) | None => {
                            info!("Capability debouncer shutting down");
                            break;
                        }
                    }
                }

                _ = wait_until(deadline) => {
                    self.flush().await;
                }
            }
        }
    }

    fn collect(
        &mut self,
        change: PendingChange,
        opts: BatchOpts,
        reply: Option<oneshot::Sender<BatchOutcome>>,
    ) {
        debug!(?change, "Collecting capability edit");
        self.pending.merge(change);
        self.opts.merge(opts);
        if let Some(reply) = reply {
            self.waiters.push(reply);
        }
        if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.window);
        }
    }

    async fn flush(&mut self) {
        self.deadline = None;
        let change = std::mem::take(&mut self.pending);
        let opts = std::mem::take(&mut self.opts);
        let waiters = std::mem::take(&mut self.waiters);

        let before = self.registry.snapshot();
        self.registry.commit(&change);
        let outcome = self.listener.on_capabilities_changed(change, opts).await;
        if let Err(e) = &outcome {
            warn!("Capability change rejected by device: {}", e);
            self.registry.restore(before);
        }

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
