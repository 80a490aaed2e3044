//! Engine context shared by every renderer.
//!
//! One [`Context`] owns the compositor kernel table, the image provider
//! registry and the background job queue. Renderers borrow it during setup
//! to resolve the kernels they will run per span, so building a context up
//! front is what makes draws allocation-free afterwards.

use std::path::Path as FsPath;
use std::sync::{Arc, RwLock};

use crate::compositor::Compositor;
use crate::error::Result;
use crate::job::{JobQueue, LoadCallback, SaveCallback};
use crate::provider::{Options, Provider, ProviderRegistry};
use crate::surface::Surface;

pub struct Context {
    compositor: Compositor,
    providers: Arc<RwLock<ProviderRegistry>>,
    jobs: JobQueue,
}

impl Context {
    /// A context with the default kernel table and every built-in codec.
    pub fn new() -> Context {
        Context {
            compositor: Compositor::new(),
            providers: Arc::new(RwLock::new(ProviderRegistry::with_defaults())),
            jobs: JobQueue::new(),
        }
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn register_provider(&self, provider: Box<dyn Provider + Send + Sync>) {
        write_guard(&self.providers).register(provider);
    }

    /// Decode a file on the calling thread.
    pub fn load_image(&self, path: &FsPath, options: &Options) -> Result<Surface> {
        read_guard(&self.providers).load_file(path, options)
    }

    /// Encode a surface on the calling thread, codec picked from the path.
    pub fn save_image(&self, surface: &Surface, path: &FsPath, options: &Options) -> Result<()> {
        read_guard(&self.providers).save_file(surface, path, options)
    }

    /// Decode on a worker; the callback fires from [`Context::dispatch`].
    pub fn load_image_async(&self, path: &FsPath, options: Options, callback: LoadCallback) {
        self.jobs
            .load(self.providers.clone(), path.to_path_buf(), options, callback);
    }

    /// Encode on a worker; the callback fires from [`Context::dispatch`].
    pub fn save_image_async(
        &self,
        surface: Surface,
        path: &FsPath,
        options: Options,
        callback: SaveCallback,
    ) {
        self.jobs.save(
            self.providers.clone(),
            path.to_path_buf(),
            surface,
            options,
            callback,
        );
    }

    /// Deliver finished background jobs. Returns how many callbacks ran.
    pub fn dispatch(&self) -> usize {
        self.jobs.dispatch()
    }

    /// Background jobs not yet delivered.
    pub fn pending_jobs(&self) -> usize {
        self.jobs.pending()
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

fn read_guard(
    registry: &Arc<RwLock<ProviderRegistry>>,
) -> std::sync::RwLockReadGuard<'_, ProviderRegistry> {
    match registry.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_guard(
    registry: &Arc<RwLock<ProviderRegistry>>,
) -> std::sync::RwLockWriteGuard<'_, ProviderRegistry> {
    match registry.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
