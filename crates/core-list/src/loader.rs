//! Demand loading and the preload window around the viewing position.
//!
//! The loader owns the two caches: `history` receives entries the viewer
//! leaves, `preload` receives entries decoded ahead of the cursor by pool
//! workers. Cache capacities bound decoded memory; entries evicted from
//! either cache lose frames and thumbnail but stay in the list.
//!
//! Preload workers check the cancel token at image boundaries only; `reset`
//! raises it, drains the pool, and lowers it again before new work is
//! scheduled (mode switch, list reset).

use crate::cache::Cache;
use crate::list::{ImageList, Pos};
use core_decode::{DecodeError, DecoderRegistry};
use core_image::Image;
use core_pool::{CancelToken, ThreadPool};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Invoked on a pool thread when a preload finishes; implementations
/// forward into the runtime's event channel.
pub type LoadCallback = Box<dyn Fn(Arc<Image>) + Send + Sync>;

pub struct Loader {
    list: Arc<ImageList>,
    registry: Arc<DecoderRegistry>,
    pool: Arc<ThreadPool>,
    cancel: CancelToken,
    history: Cache,
    preload: Cache,
    on_loaded: LoadCallback,
}

impl Loader {
    pub fn new(
        list: Arc<ImageList>,
        registry: Arc<DecoderRegistry>,
        pool: Arc<ThreadPool>,
        history_capacity: usize,
        preload_capacity: usize,
        on_loaded: LoadCallback,
    ) -> Arc<Loader> {
        Arc::new(Loader {
            list,
            registry,
            pool,
            cancel: CancelToken::new(),
            history: Cache::new(history_capacity),
            preload: Cache::new(preload_capacity),
            on_loaded,
        })
    }

    pub fn history(&self) -> &Cache {
        &self.history
    }

    pub fn preload(&self) -> &Cache {
        &self.preload
    }

    /// Decode `image` on the calling thread unless already decoded. Failures
    /// are recorded on the entry so traversal can start skipping it.
    pub fn ensure_loaded(&self, image: &Arc<Image>) -> Result<(), DecodeError> {
        if image.has_frames() {
            return Ok(());
        }
        match self.registry.load(image) {
            Ok(()) => Ok(()),
            Err(e) => {
                image.record_failure();
                Err(e)
            }
        }
    }

    /// The next entries the preloader will decode, nearest first: up to the
    /// preload capacity of forward neighbors of `index`.
    pub fn preload_targets(&self, index: usize) -> Vec<Arc<Image>> {
        let mut targets = Vec::new();
        let mut seen: HashSet<usize> = HashSet::from([index]);
        let mut at = index;
        while targets.len() < self.preload.capacity() {
            let Some(next) = self.list.get(at, Pos::Next) else {
                break;
            };
            if !seen.insert(next.index()) {
                break; // wrapped all the way around
            }
            at = next.index();
            targets.push(next);
        }
        targets
    }

    /// Queue background decodes for the preload window around `index`.
    pub fn schedule_preload(self: &Arc<Self>, index: usize) {
        for image in self.preload_targets(index) {
            if image.has_frames() {
                // Already decoded: refresh its cache position.
                self.preload.put(image);
                continue;
            }
            let this = Arc::clone(self);
            self.pool.add(move || {
                if this.cancel.is_cancelled() {
                    return;
                }
                match this.registry.load(&image) {
                    Ok(()) => {
                        debug!(target: "list.preload", source = image.source(), "preloaded");
                        this.preload.put(Arc::clone(&image));
                        (this.on_loaded)(image);
                    }
                    Err(e) => {
                        image.record_failure();
                        warn!(target: "list.preload", source = image.source(), error = %e, "preload failed");
                    }
                }
            });
        }
    }

    /// The viewer takes ownership of this entry's decoded data: drop it from
    /// both caches so no eviction can free what is on screen. Ownership
    /// returns to the history cache via [`Loader::note_viewed`].
    pub fn claim(&self, source: &str) {
        self.preload.take(source);
        self.history.take(source);
    }

    /// The viewer moved off `image`: it leaves the preload window and enters
    /// history.
    pub fn note_viewed(&self, image: Arc<Image>) {
        self.preload.take(image.source());
        self.history.put(image);
    }

    /// The list told us an entry is gone; neither cache may resurrect it.
    pub fn evict(&self, source: &str) {
        self.preload.take(source);
        self.history.take(source);
    }

    /// Cancel outstanding preloads and drain the pool. Blocks until every
    /// in-flight job has finished.
    pub fn reset(&self) {
        self.cancel.cancel();
        self.pool.wait_all();
        self.cancel.reset();
        self.preload.clear();
    }
}
