//! Single-owner execution contexts.
//!
//! A [`Dispatcher`] owns one piece of mutable state on its own task and applies
//! queued closures to it one at a time. All mutation of an observable
//! collection goes through its dispatcher, so readers and writers on the same
//! context never race and no lock is needed around the collection itself.
//!
//! Background work (network fetches) runs elsewhere and marshals its result
//! back with [`Dispatcher::run`] before touching the state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::error::DispatchError;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

enum Command<S> {
    Run(Job<S>),
    Shutdown,
}

/// Identifies one execution context, for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Handle to a single-consumer command queue that owns state `S`.
///
/// Cloning the handle shares the same context.
pub struct Dispatcher<S> {
    id: ContextId,
    name: Arc<str>,
    tx: mpsc::UnboundedSender<Command<S>>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<S> std::fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<S: Send + 'static> Dispatcher<S> {
    /// Spawn a new context owning `state`. Must be called inside a tokio runtime.
    pub fn spawn(name: impl Into<String>, state: S) -> Self {
        let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        let name: Arc<str> = Arc::from(name.into());
        let (tx, mut rx) = mpsc::unbounded_channel::<Command<S>>();

        let task_name = name.clone();
        tokio::spawn(async move {
            let mut state = state;
            tracing::debug!(context = %id, name = %task_name, "Dispatcher started");
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Run(job) => job(&mut state),
                    Command::Shutdown => break,
                }
            }
            tracing::debug!(context = %id, name = %task_name, "Dispatcher stopped");
        });

        Self { id, name, tx }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Run `f` on the owning context and wait for its result.
    pub async fn run<R, F>(&self, f: F) -> Result<R, DispatchError>
    where
        R: Send + 'static,
        F: FnOnce(&mut S) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.post(move |state| {
            let _ = reply_tx.send(f(state));
        })?;
        reply_rx.await.map_err(|_| self.closed())
    }

    /// Queue `f` on the owning context without waiting for it.
    pub fn post<F>(&self, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.tx
            .send(Command::Run(Box::new(f)))
            .map_err(|_| self.closed())
    }

    /// Stop the context after already-queued jobs have run.
    ///
    /// Later calls to [`run`](Self::run) fail with [`DispatchError::Closed`].
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }

    fn closed(&self) -> DispatchError {
        DispatchError::Closed {
            context: self.name.to_string(),
        }
    }
}
