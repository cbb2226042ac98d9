//! Bounded queue of loaded images.
//!
//! FIFO with move-to-tail on re-put, which makes it an LRU over decoded
//! entries. Two instances coexist at runtime: `history` (recently viewed)
//! and `preload` (ahead of the cursor). Evicting the head releases that
//! entry's decoded frames and thumbnail; the entry itself stays in the list.

use core_image::{Image, Parts};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::trace;

pub struct Cache {
    queue: Mutex<VecDeque<Arc<Image>>>,
    capacity: usize,
}

impl Cache {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.queue.lock().expect("cache lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append to the tail. Re-putting a cached source moves it to the tail
    /// instead of duplicating. A full cache evicts its head, releasing the
    /// evicted entry's decoded data. Zero-capacity caches discard the put.
    pub fn put(&self, image: Arc<Image>) {
        if self.capacity == 0 {
            return;
        }
        let mut queue = self.queue.lock().expect("cache lock");
        if let Some(at) = queue.iter().position(|e| e.source() == image.source()) {
            let entry = queue.remove(at).expect("present");
            queue.push_back(entry);
            return;
        }
        if queue.len() == self.capacity
            && let Some(evicted) = queue.pop_front()
        {
            trace!(target: "cache", source = evicted.source(), "evicting head");
            evicted.clear(Parts::FRAMES | Parts::THUMBNAIL);
        }
        queue.push_back(image);
    }

    /// Remove and return the entry for `source`, if cached. The data is not
    /// released; ownership moves to the caller.
    pub fn take(&self, source: &str) -> Option<Arc<Image>> {
        let mut queue = self.queue.lock().expect("cache lock");
        let at = queue.iter().position(|e| e.source() == source)?;
        queue.remove(at)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.queue
            .lock()
            .expect("cache lock")
            .iter()
            .any(|e| e.source() == source)
    }

    /// Sources currently cached, head first.
    pub fn sources(&self) -> Vec<String> {
        self.queue
            .lock()
            .expect("cache lock")
            .iter()
            .map(|e| e.source().to_string())
            .collect()
    }

    /// Drop everything, releasing decoded data (list reset, mode change).
    pub fn clear(&self) {
        let mut queue = self.queue.lock().expect("cache lock");
        for entry in queue.drain(..) {
            entry.clear(Parts::FRAMES | Parts::THUMBNAIL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_image::{Frame, ImageData};
    use core_pixmap::{Color, PixelFormat, Pixmap};

    fn loaded_image(source: &str) -> Arc<Image> {
        let image = Image::new(source);
        let mut data = ImageData::default();
        data.frames.push(Frame::new(
            Pixmap::from_vec(PixelFormat::Xrgb, 1, 1, vec![Color(0xff00_0000)]).unwrap(),
        ));
        image.attach(data);
        image
    }

    #[test]
    fn overflow_evicts_exactly_the_first() {
        let cache = Cache::new(2);
        let a = loaded_image("a");
        cache.put(Arc::clone(&a));
        cache.put(loaded_image("b"));
        cache.put(loaded_image("c"));
        assert_eq!(cache.sources(), ["b", "c"]);
        // The evicted entry lost its decoded data.
        assert!(!a.has_frames());
    }

    #[test]
    fn take_then_put_restores_contents() {
        let cache = Cache::new(3);
        for s in ["a", "b", "c"] {
            cache.put(loaded_image(s));
        }
        let b = cache.take("b").unwrap();
        assert!(b.has_frames());
        assert_eq!(cache.sources(), ["a", "c"]);
        cache.put(b);
        assert_eq!(cache.sources(), ["a", "c", "b"]);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn reput_moves_to_tail_without_duplicate() {
        let cache = Cache::new(3);
        for s in ["a", "b", "c"] {
            cache.put(loaded_image(s));
        }
        let a = cache.take("a").unwrap();
        cache.put(Arc::clone(&a));
        cache.put(a);
        assert_eq!(cache.sources(), ["b", "c", "a"]);
    }

    #[test]
    fn zero_capacity_discards() {
        let cache = Cache::new(0);
        let a = loaded_image("a");
        cache.put(Arc::clone(&a));
        assert!(cache.is_empty());
        // Discarded, not freed: the caller still owns live data.
        assert!(a.has_frames());
        assert!(cache.take("a").is_none());
    }

    #[test]
    fn missing_take_returns_none() {
        let cache = Cache::new(2);
        cache.put(loaded_image("a"));
        assert!(cache.take("zzz").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_releases_all() {
        let cache = Cache::new(4);
        let a = loaded_image("a");
        let b = loaded_image("b");
        cache.put(Arc::clone(&a));
        cache.put(Arc::clone(&b));
        cache.clear();
        assert!(cache.is_empty());
        assert!(!a.has_frames());
        assert!(!b.has_frames());
    }
}
