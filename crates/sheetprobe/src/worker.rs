//! A single dedicated thread that owns the workbook session.
//!
//! Spreadsheet applications expose apartment-threaded objects: the session must
//! be created and used on one thread only. [`SessionWorker`] builds the session
//! on its own thread and runs submitted closures against it one at a time,
//! replying to each caller through a oneshot channel.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use sheetprobe_core::{Error, Result, WorkbookSession};
use tokio::sync::{mpsc, oneshot};

type Job = Box<dyn FnOnce(&mut dyn WorkbookSession) + Send>;

enum Message {
    Run(Job),
    /// Close the session and leave the loop.
    Stop(oneshot::Sender<Result<()>>),
}

/// Settings for the worker thread.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// OS thread name, visible in debuggers and panics.
    pub thread_name: String,
    /// How many calls may wait behind the one being executed.
    pub queue_depth: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: "sheetprobe-session".to_string(),
            queue_depth: 32,
        }
    }
}

/// Handle to the session thread. Clones share the same thread and queue.
#[derive(Clone)]
pub struct SessionWorker {
    tx: mpsc::Sender<Message>,
    thread: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionWorker {
    /// Start the thread and run `open` on it to build the session.
    ///
    /// Returns once the session exists; if `open` fails, so does `spawn`.
    pub fn spawn<S, F>(config: WorkerConfig, open: F) -> Result<Self>
    where
        S: WorkbookSession + 'static,
        F: FnOnce() -> Result<S> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Result<()>>(1);

        let thread = std::thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || {
                let mut session = match open() {
                    Ok(session) => session,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                drain(&mut session, rx);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!(thread = %config.thread_name, "session worker started");
                Ok(Self {
                    tx,
                    thread: Arc::new(Mutex::new(Some(thread))),
                })
            }
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err)
            }
            // `open` panicked
            Err(_) => {
                let _ = thread.join();
                Err(Error::WorkerStopped)
            }
        }
    }

    /// Run `f` against the session on the worker thread and await its result.
    pub async fn call<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn WorkbookSession) -> Result<T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Message::Run(job(f, reply_tx)))
            .await
            .map_err(|_| Error::WorkerStopped)?;
        reply_rx.await.map_err(|_| Error::WorkerStopped)?
    }

    /// Blocking form of [`call`](Self::call), for callers outside an async runtime.
    ///
    /// Panics if invoked from within an async context, as tokio's blocking
    /// channel operations do.
    pub fn call_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn WorkbookSession) -> Result<T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .blocking_send(Message::Run(job(f, reply_tx)))
            .map_err(|_| Error::WorkerStopped)?;
        reply_rx.blocking_recv().map_err(|_| Error::WorkerStopped)?
    }

    /// Close the session on the worker and join the thread.
    ///
    /// Calls queued ahead of the shutdown still run; later calls on any clone
    /// fail with [`Error::WorkerStopped`].
    pub async fn shutdown(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Message::Stop(reply_tx))
            .await
            .map_err(|_| Error::WorkerStopped)?;
        let closed = reply_rx.await.map_err(|_| Error::WorkerStopped)?;
        self.join();
        closed
    }

    /// Blocking form of [`shutdown`](Self::shutdown).
    pub fn shutdown_blocking(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .blocking_send(Message::Stop(reply_tx))
            .map_err(|_| Error::WorkerStopped)?;
        let closed = reply_rx.blocking_recv().map_err(|_| Error::WorkerStopped)?;
        self.join();
        closed
    }

    /// True while the worker still accepts calls.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    fn join(&self) {
        let handle = match self.thread.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::warn!("session worker panicked");
            }
        }
    }
}

fn job<T, F>(f: F, reply: oneshot::Sender<Result<T>>) -> Job
where
    T: Send + 'static,
    F: FnOnce(&mut dyn WorkbookSession) -> Result<T> + Send + 'static,
{
    Box::new(move |session| {
        // The caller may have given up waiting; nothing to do then.
        let _ = reply.send(f(session));
    })
}

fn drain<S: WorkbookSession>(session: &mut S, mut rx: mpsc::Receiver<Message>) {
    let mut served = 0u64;
    while let Some(message) = rx.blocking_recv() {
        match message {
            Message::Run(job) => {
                job(session);
                served += 1;
            }
            Message::Stop(reply) => {
                rx.close();
                // Run whatever was queued before the stop request.
                while let Ok(Message::Run(job)) = rx.try_recv() {
                    job(session);
                    served += 1;
                }
                let closed = session.close();
                tracing::info!(served, "session worker stopped");
                let _ = reply.send(closed);
                return;
            }
        }
    }

    // Every handle dropped without an explicit shutdown.
    if let Err(err) = session.close() {
        tracing::warn!("closing abandoned session failed: {err}");
    }
    tracing::debug!(served, "session worker exited");
}
