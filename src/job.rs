//! Asynchronous image load and save jobs.
//!
//! Each submission spawns a worker that does the file and codec work and
//! sends the finished result back over a bounded channel. Nothing is
//! delivered until the owner calls [`JobQueue::dispatch`], which runs every
//! completed callback on the calling thread. That keeps callbacks on the
//! thread that owns the renderers even though decoding happens elsewhere.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, RwLock};
use std::thread;

use log::debug;

use crate::error::Result;
use crate::provider::{Options, ProviderRegistry};
use crate::surface::Surface;

pub type LoadCallback = Box<dyn FnOnce(Result<Surface>) + Send + 'static>;
pub type SaveCallback = Box<dyn FnOnce(Result<()>) + Send + 'static>;

enum Finished {
    Load(LoadCallback, Result<Surface>),
    Save(SaveCallback, Result<()>),
}

/// Completion queue for background image work.
///
/// The queue itself stays on one thread; only the workers and the channel
/// sender cross threads.
pub struct JobQueue {
    tx: SyncSender<Finished>,
    rx: Receiver<Finished>,
    pending: Arc<AtomicUsize>,
}

// Workers block on send once this many results sit undelivered.
const QUEUE_DEPTH: usize = 64;

impl JobQueue {
    pub fn new() -> JobQueue {
        let (tx, rx) = sync_channel(QUEUE_DEPTH);
        JobQueue {
            tx,
            rx,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Decode `path` on a worker thread. The callback fires from
    /// [`JobQueue::dispatch`] with the decoded surface or the error.
    pub fn load(
        &self,
        registry: Arc<RwLock<ProviderRegistry>>,
        path: PathBuf,
        options: Options,
        callback: LoadCallback,
    ) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let tx = self.tx.clone();
        thread::spawn(move || {
            debug!("loading {} in background", path.display());
            let result = read_guard(&registry).load_file(&path, &options);
            // The owner dropping the queue cancels delivery, not the work.
            let _ = tx.send(Finished::Load(callback, result));
        });
    }

    /// Encode `surface` to `path` on a worker thread. The surface moves to
    /// the worker for the duration of the job.
    pub fn save(
        &self,
        registry: Arc<RwLock<ProviderRegistry>>,
        path: PathBuf,
        surface: Surface,
        options: Options,
        callback: SaveCallback,
    ) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let tx = self.tx.clone();
        thread::spawn(move || {
            debug!("saving {} in background", path.display());
            let result = read_guard(&registry).save_file(&surface, &path, &options);
            let _ = tx.send(Finished::Save(callback, result));
        });
    }

    /// Run the callbacks of every finished job on the calling thread.
    /// Returns how many fired. Never blocks on unfinished work.
    pub fn dispatch(&self) -> usize {
        let mut fired = 0;
        while let Ok(finished) = self.rx.try_recv() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            match finished {
                Finished::Load(callback, result) => callback(result),
                Finished::Save(callback, result) => callback(result),
            }
            fired += 1;
        }
        fired
    }

    /// Jobs submitted but not yet delivered through [`JobQueue::dispatch`].
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        JobQueue::new()
    }
}

fn read_guard(
    registry: &Arc<RwLock<ProviderRegistry>>,
) -> std::sync::RwLockReadGuard<'_, ProviderRegistry> {
    // Workers only ever read the registry; a poisoned lock still holds
    // valid data.
    match registry.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
