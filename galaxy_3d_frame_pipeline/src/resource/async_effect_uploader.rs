/// Background compilation of effects on a secondary device context.
///
/// The render thread never waits for the worker: `submit` and `sync` only
/// take the queue lock long enough to append or swap vectors. The worker
/// compiles one effect at a time, oldest first, and publishes each result
/// into the completed queue where the next `sync` picks it up.

use std::collections::VecDeque;
use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use crossbeam_channel::Sender;
use crate::error::{Error, Result};
use crate::graphics_device::{CompiledShader, GraphicsDevice, UploadContext};
use crate::{engine_bail, engine_debug, engine_error, engine_info};
use super::content_hash::ResourceContentHash;
use super::resource_data::EffectResource;

const SOURCE: &str = "galaxy3d::AsyncEffectUploader";

/// Outcome of one background compile
#[derive(Debug)]
pub struct CompiledEffect {
    pub hash: ResourceContentHash,
    /// `None` when the compile failed
    pub shader: Option<Box<dyn CompiledShader>>,
}

// ===== SHARED QUEUES =====

#[derive(Default)]
struct UploaderQueues {
    pending: VecDeque<Arc<EffectResource>>,
    completed: Vec<CompiledEffect>,
    quit: bool,
}

#[derive(Default)]
struct SharedQueues {
    queues: Mutex<UploaderQueues>,
    work_available: Condvar,
}

impl SharedQueues {
    fn lock(&self) -> MutexGuard<'_, UploaderQueues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ===== UPLOADER =====

pub struct AsyncEffectUploader {
    shared: Arc<SharedQueues>,
    thread: Option<JoinHandle<()>>,
}

impl AsyncEffectUploader {
    /// Stopped uploader; call `start` before submitting work
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SharedQueues::default()),
            thread: None,
        }
    }

    /// Create the upload context and start the worker thread
    ///
    /// Returns once the context has been enabled on the worker thread.
    ///
    /// # Errors
    ///
    /// Fails if the device cannot create an upload context, the thread
    /// cannot be spawned, or the context cannot be enabled.
    pub fn start(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if self.thread.is_some() {
            engine_bail!(SOURCE, "effect upload thread is already running");
        }
        let Some(context) = device.create_upload_context() else {
            engine_bail!(SOURCE, "device could not create an upload context");
        };

        self.shared.lock().quit = false;
        let shared = self.shared.clone();
        let (enabled_tx, enabled_rx) = crossbeam_channel::bounded(1);
        let thread = thread::Builder::new()
            .name("galaxy3d-effect-uploader".to_string())
            .spawn(move || run_worker(context, shared, enabled_tx))
            .map_err(|e| Error::InitializationFailed(format!("effect upload thread: {}", e)))?;

        if enabled_rx.recv().unwrap_or(false) {
            engine_info!(SOURCE, "effect upload thread started");
            self.thread = Some(thread);
            Ok(())
        } else {
            let _ = thread.join();
            engine_error!(SOURCE, "upload context could not be enabled");
            Err(Error::InitializationFailed("upload context could not be enabled".to_string()))
        }
    }

    /// True between a successful `start` and `stop`
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Queue effects for compilation without waiting for the worker
    pub fn submit(&self, effects: Vec<Arc<EffectResource>>) {
        debug_assert!(self.is_running(), "submit on a stopped effect uploader");
        if effects.is_empty() {
            return;
        }
        self.shared.lock().pending.extend(effects);
        self.shared.work_available.notify_one();
    }

    /// Hand over `new_work` and collect every result completed so far
    pub fn sync(&self, new_work: Vec<Arc<EffectResource>>, results: &mut Vec<CompiledEffect>) {
        let has_new_work = !new_work.is_empty();
        let completed = {
            let mut queues = self.shared.lock();
            queues.pending.extend(new_work);
            mem::take(&mut queues.completed)
        };
        if has_new_work {
            self.shared.work_available.notify_one();
        }
        results.extend(completed);
    }

    /// Number of effects not compiled yet (diagnostics)
    pub fn pending_count(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Stop the worker after its current compile and join it
    ///
    /// Effects still queued are dropped.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        {
            let mut queues = self.shared.lock();
            queues.quit = true;
            queues.pending.clear();
        }
        self.shared.work_available.notify_all();
        if thread.join().is_err() {
            engine_error!(SOURCE, "effect upload thread panicked");
        }
        engine_info!(SOURCE, "effect upload thread stopped");
    }
}

impl Default for AsyncEffectUploader {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AsyncEffectUploader {
    fn drop(&mut self) {
        self.stop();
    }
}

// ===== WORKER THREAD =====

fn run_worker(
    mut context: Box<dyn UploadContext>,
    shared: Arc<SharedQueues>,
    enabled_tx: Sender<bool>,
) {
    if !context.enable() {
        let _ = enabled_tx.send(false);
        return;
    }
    let _ = enabled_tx.send(true);

    while let Some(effect) = next_effect(&shared) {
        engine_debug!(SOURCE, "compiling effect '{}'", effect.name);
        let shader = context.upload_shader(&effect);
        if shader.is_none() {
            engine_error!(SOURCE, "effect '{}' failed to compile", effect.name);
        }
        shared.lock().completed.push(CompiledEffect { hash: effect.hash, shader });
    }

    if !context.disable() {
        engine_error!(SOURCE, "upload context could not be disabled");
    }
}

/// Block until work is available; `None` once asked to quit
fn next_effect(shared: &SharedQueues) -> Option<Arc<EffectResource>> {
    let mut queues = shared.lock();
    loop {
        if queues.quit {
            return None;
        }
        if let Some(effect) = queues.pending.pop_front() {
            return Some(effect);
        }
        queues = shared
            .work_available
            .wait(queues)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

#[cfg(test)]
#[path = "async_effect_uploader_tests.rs"]
mod tests;
