//! The ordered image list.
//!
//! Entries are `Arc<Image>` handles unique by source. Orderings: insertion
//! (`none`), lexicographic (`alpha`), digit-run aware (`numeric`),
//! modification time, file size, or a once-seeded shuffle (`random`); any
//! ordering can be reversed. Traversal wraps at the ends when `loop` is set
//! (parent-directory adjacency always wraps once), and entries marked
//! skipped after repeated decode failures are passed over.
//!
//! The filesystem monitor feeds [`ImageList::handle_fs_change`]; the bound
//! event handler runs with the list lock still held and must only forward
//! the event (re-entering the list from the handler deadlocks).

use core_image::{FileStat, Image};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Entry ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    None,
    #[default]
    Alpha,
    Numeric,
    Mtime,
    Size,
    Random,
}

impl Order {
    pub const ALL: [Order; 6] = [
        Order::None,
        Order::Alpha,
        Order::Numeric,
        Order::Mtime,
        Order::Size,
        Order::Random,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Order::None => "none",
            Order::Alpha => "alpha",
            Order::Numeric => "numeric",
            Order::Mtime => "mtime",
            Order::Size => "size",
            Order::Random => "random",
        }
    }
}

impl std::str::FromStr for Order {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Order::ALL
            .into_iter()
            .find(|o| o.name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Traversal positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pos {
    First,
    Last,
    Next,
    Prev,
    NextParent,
    PrevParent,
    Random,
}

/// Filesystem change classes the monitor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsChange {
    Created,
    Removed,
    Modified,
}

/// Event forwarded to the bound handler after the list applied a change.
#[derive(Debug, Clone)]
pub enum FsEvent {
    Added(Arc<Image>),
    Removed { source: String },
    Modified(Arc<Image>),
}

pub type FsEventHandler = Box<dyn Fn(FsEvent) + Send + Sync>;

/// Construction-time options (from config/CLI).
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub order: Order,
    pub reverse: bool,
    pub recursive: bool,
    pub wrap: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            order: Order::Alpha,
            reverse: false,
            recursive: false,
            wrap: true,
        }
    }
}

struct ListInner {
    entries: Vec<Arc<Image>>,
    seen: HashSet<String>,
    order: Order,
    reverse: bool,
}

pub struct ImageList {
    inner: RwLock<ListInner>,
    handler: Mutex<Option<FsEventHandler>>,
    recursive: bool,
    wrap: bool,
}

/// Digit-run aware comparison: maximal decimal runs compare as integers
/// ("img2" < "img10"), everything else bytewise; ties (zero padding) fall
/// back to the plain string order.
pub fn numeric_cmp(a: &str, b: &str) -> CmpOrdering {
    let (ab, bb) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0usize, 0usize);
    while i < ab.len() && j < bb.len() {
        if ab[i].is_ascii_digit() && bb[j].is_ascii_digit() {
            let si = i;
            while i < ab.len() && ab[i].is_ascii_digit() {
                i += 1;
            }
            let sj = j;
            while j < bb.len() && bb[j].is_ascii_digit() {
                j += 1;
            }
            let ra = a[si..i].trim_start_matches('0');
            let rb = b[sj..j].trim_start_matches('0');
            let ord = ra.len().cmp(&rb.len()).then_with(|| ra.cmp(rb));
            if ord != CmpOrdering::Equal {
                return ord;
            }
        } else {
            let ord = ab[i].cmp(&bb[j]);
            if ord != CmpOrdering::Equal {
                return ord;
            }
            i += 1;
            j += 1;
        }
    }
    (ab.len() - i).cmp(&(bb.len() - j)).then_with(|| a.cmp(b))
}

fn compare(order: Order, reverse: bool, a: &Arc<Image>, b: &Arc<Image>) -> CmpOrdering {
    let ord = match order {
        Order::None | Order::Random => CmpOrdering::Equal,
        Order::Alpha => a.source().cmp(b.source()),
        Order::Numeric => numeric_cmp(a.source(), b.source()),
        Order::Mtime => a
            .stat()
            .mtime_ns
            .cmp(&b.stat().mtime_ns)
            .then_with(|| a.source().cmp(b.source())),
        Order::Size => a
            .stat()
            .size
            .cmp(&b.stat().size)
            .then_with(|| a.source().cmp(b.source())),
    };
    if reverse { ord.reverse() } else { ord }
}

impl ImageList {
    pub fn new(options: ListOptions) -> Arc<ImageList> {
        Arc::new(ImageList {
            inner: RwLock::new(ListInner {
                entries: Vec::new(),
                seen: HashSet::new(),
                order: options.order,
                reverse: options.reverse,
            }),
            handler: Mutex::new(None),
            recursive: options.recursive,
            wrap: options.wrap,
        })
    }

    /// Bind the callback invoked for monitor-applied changes. The callback
    /// runs under the exclusive lock; it must only forward the event.
    pub fn initialize(&self, handler: FsEventHandler) {
        *self.handler.lock().expect("handler lock") = Some(handler);
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("list lock").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn order(&self) -> Order {
        self.inner.read().expect("list lock").order
    }

    pub fn wraps(&self) -> bool {
        self.wrap
    }

    /// Append files and directories, then apply the current ordering.
    /// Directories recurse depth-first in lexicographic order when the list
    /// was built recursive. Returns the number of entries added.
    pub fn load(&self, sources: &[String]) -> usize {
        let mut inner = self.inner.write().expect("list lock");
        let before = inner.entries.len();
        for source in sources {
            let path = Path::new(source);
            if path.is_dir() {
                self.append_dir(&mut inner, path, true);
            } else {
                Self::append_file(&mut inner, source.clone());
            }
        }
        let added = inner.entries.len() - before;
        Self::reorder_locked(&mut inner);
        info!(target: "list", added, total = inner.entries.len(), "sources loaded");
        added
    }

    fn append_dir(&self, inner: &mut ListInner, dir: &Path, top: bool) {
        if !top && !self.recursive {
            return;
        }
        let Ok(read) = std::fs::read_dir(dir) else {
            warn!(target: "list", dir = %dir.display(), "unreadable directory skipped");
            return;
        };
        let mut children: Vec<_> = read
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.starts_with('.'))
            })
            .collect();
        children.sort();
        for child in children {
            if child.is_dir() {
                self.append_dir(inner, &child, false);
            } else if child.is_file() {
                Self::append_file(inner, child.to_string_lossy().into_owned());
            }
        }
    }

    /// Insert a shell entry unless the source is already present.
    fn append_file(inner: &mut ListInner, source: String) -> Option<Arc<Image>> {
        if !inner.seen.insert(source.clone()) {
            return None;
        }
        let image = Image::new(source);
        image.refresh_stat();
        inner.entries.push(Arc::clone(&image));
        Some(image)
    }

    /// Insert one path, either at its ordering position or at the end.
    pub fn add(&self, source: &str, ordered: bool) -> Option<Arc<Image>> {
        let mut inner = self.inner.write().expect("list lock");
        let image = Self::append_file(&mut inner, source.to_string())?;
        if ordered && !matches!(inner.order, Order::None | Order::Random) {
            let last = inner.entries.pop().expect("just pushed");
            let (order, reverse) = (inner.order, inner.reverse);
            let at = inner
                .entries
                .partition_point(|e| compare(order, reverse, e, &last) != CmpOrdering::Greater);
            inner.entries.insert(at, last);
        }
        Self::reindex(&mut inner);
        Some(image)
    }

    /// Unlink the entry and return its neighbor in the given direction, or
    /// `None` once the list is empty.
    pub fn remove(&self, source: &str, forward: bool) -> Option<Arc<Image>> {
        let mut inner = self.inner.write().expect("list lock");
        let at = inner.entries.iter().position(|e| e.source() == source)?;
        inner.entries.remove(at);
        inner.seen.remove(source);
        Self::reindex(&mut inner);
        if inner.entries.is_empty() {
            return None;
        }
        let neighbor = if forward {
            at.min(inner.entries.len() - 1)
        } else {
            at.checked_sub(1).unwrap_or(0)
        };
        Some(Arc::clone(&inner.entries[neighbor]))
    }

    /// Re-sort according to the current order and reindex.
    pub fn reorder(&self) {
        let mut inner = self.inner.write().expect("list lock");
        Self::reorder_locked(&mut inner);
    }

    pub fn set_order(&self, order: Order, reverse: bool) {
        let mut inner = self.inner.write().expect("list lock");
        inner.order = order;
        inner.reverse = reverse;
        Self::reorder_locked(&mut inner);
    }

    fn reorder_locked(inner: &mut ListInner) {
        match inner.order {
            Order::None => {
                if inner.reverse {
                    inner.entries.reverse();
                }
            }
            Order::Random => {
                // Seeded once per shuffle from the clock; within one process
                // run each reorder produces a fresh permutation.
                let seed = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos() as u64)
                    .unwrap_or(0x5eed);
                let mut rng = SmallRng::seed_from_u64(seed);
                inner.entries.shuffle(&mut rng);
            }
            order => {
                let reverse = inner.reverse;
                inner
                    .entries
                    .sort_by(|a, b| compare(order, reverse, a, b));
            }
        }
        Self::reindex(inner);
    }

    fn reindex(inner: &mut ListInner) {
        for (i, entry) in inner.entries.iter().enumerate() {
            entry.set_index(i);
        }
    }

    pub fn get_index(&self, index: usize) -> Option<Arc<Image>> {
        self.inner
            .read()
            .expect("list lock")
            .entries
            .get(index)
            .cloned()
    }

    pub fn find(&self, source: &str) -> Option<Arc<Image>> {
        let inner = self.inner.read().expect("list lock");
        inner
            .entries
            .iter()
            .find(|e| e.source() == source)
            .cloned()
    }

    /// First non-skipped entry, scanning forward.
    pub fn first(&self) -> Option<Arc<Image>> {
        self.get(0, Pos::First)
    }

    /// Traversal relative to the entry at `from`.
    pub fn get(&self, from: usize, pos: Pos) -> Option<Arc<Image>> {
        let inner = self.inner.read().expect("list lock");
        let entries = &inner.entries;
        let len = entries.len();
        if len == 0 {
            return None;
        }
        match pos {
            Pos::First => entries.iter().find(|e| !e.is_skipped()).cloned(),
            Pos::Last => entries.iter().rev().find(|e| !e.is_skipped()).cloned(),
            Pos::Next => self.walk(entries, from, 1, self.wrap),
            Pos::Prev => self.walk(entries, from, -1, self.wrap),
            Pos::NextParent => self.walk_parent(entries, from, 1),
            Pos::PrevParent => self.walk_parent(entries, from, -1),
            Pos::Random => {
                let mut rng = rand::rng();
                for _ in 0..8 {
                    let idx = rng.random_range(0..len);
                    if idx != from && !entries[idx].is_skipped() {
                        return Some(Arc::clone(&entries[idx]));
                    }
                }
                // Dense skip marks or a tiny list: fall back to a scan.
                self.walk(entries, from, 1, true)
            }
        }
    }

    /// Absolute jump by a signed number of steps, wrapping when `loop` is
    /// set and clamping to the ends otherwise.
    pub fn get_distance(&self, from: usize, distance: isize) -> Option<Arc<Image>> {
        let inner = self.inner.read().expect("list lock");
        let entries = &inner.entries;
        let len = entries.len() as isize;
        if len == 0 {
            return None;
        }
        let target = if self.wrap {
            (from as isize + distance).rem_euclid(len)
        } else {
            (from as isize + distance).clamp(0, len - 1)
        } as usize;
        if !entries[target].is_skipped() {
            return Some(Arc::clone(&entries[target]));
        }
        let dir = if distance < 0 { -1 } else { 1 };
        self.walk(entries, target, dir, self.wrap)
    }

    /// Signed step count from `a` to `b` under the current ordering.
    pub fn distance(&self, a: &Image, b: &Image) -> isize {
        b.index() as isize - a.index() as isize
    }

    fn walk(
        &self,
        entries: &[Arc<Image>],
        from: usize,
        dir: isize,
        wrap: bool,
    ) -> Option<Arc<Image>> {
        let len = entries.len() as isize;
        let mut idx = from as isize;
        for _ in 0..len {
            idx += dir;
            if wrap {
                idx = idx.rem_euclid(len);
            } else if idx < 0 || idx >= len {
                return None;
            }
            let entry = &entries[idx as usize];
            if !entry.is_skipped() {
                return Some(Arc::clone(entry));
            }
        }
        None
    }

    /// First entry whose parent directory differs from the starting one,
    /// scanning in `dir` and wrapping around the end once.
    fn walk_parent(
        &self,
        entries: &[Arc<Image>],
        from: usize,
        dir: isize,
    ) -> Option<Arc<Image>> {
        let len = entries.len() as isize;
        let start = entries.get(from)?;
        let parent = start.parent_dir().to_string();
        let mut idx = from as isize;
        for _ in 0..len {
            idx = (idx + dir).rem_euclid(len);
            let entry = &entries[idx as usize];
            if !entry.is_skipped() && entry.parent_dir() != parent {
                return Some(Arc::clone(entry));
            }
        }
        None
    }

    /// Apply a filesystem change reported by the monitor, then forward it to
    /// the bound handler while the lock is still held.
    pub fn handle_fs_change(&self, change: FsChange, path: &Path) {
        let source = path.to_string_lossy().into_owned();
        match change {
            FsChange::Created => {
                if !path.is_file() {
                    return;
                }
                let mut inner = self.inner.write().expect("list lock");
                let Some(image) = Self::append_file(&mut inner, source.clone()) else {
                    return;
                };
                Self::reorder_locked(&mut inner);
                debug!(target: "list.monitor", source = source.as_str(), "file added");
                self.emit(FsEvent::Added(image));
            }
            FsChange::Removed => {
                let mut inner = self.inner.write().expect("list lock");
                let Some(at) = inner.entries.iter().position(|e| e.source() == source) else {
                    return;
                };
                inner.entries.remove(at);
                inner.seen.remove(&source);
                Self::reindex(&mut inner);
                debug!(target: "list.monitor", source = source.as_str(), "file removed");
                self.emit(FsEvent::Removed { source });
            }
            FsChange::Modified => {
                let inner = self.inner.read().expect("list lock");
                let Some(entry) = inner.entries.iter().find(|e| e.source() == source) else {
                    return;
                };
                entry.refresh_stat();
                entry.reset_failures();
                debug!(target: "list.monitor", source = source.as_str(), "file modified");
                self.emit(FsEvent::Modified(Arc::clone(entry)));
            }
        }
    }

    fn emit(&self, event: FsEvent) {
        if let Some(handler) = self.handler.lock().expect("handler lock").as_ref() {
            handler(event);
        }
    }

    /// Parent directories of all current entries (monitor watch set).
    pub fn parent_dirs(&self) -> Vec<String> {
        let inner = self.inner.read().expect("list lock");
        let mut dirs: Vec<String> = inner
            .entries
            .iter()
            .map(|e| e.parent_dir().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        dirs.sort();
        dirs.dedup();
        dirs
    }

    /// Snapshot of the current entries, in order.
    pub fn snapshot(&self) -> Vec<Arc<Image>> {
        self.inner.read().expect("list lock").entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_with(sources: &[&str], options: ListOptions) -> Arc<ImageList> {
        let list = ImageList::new(options);
        {
            let mut inner = list.inner.write().unwrap();
            for s in sources {
                ImageList::append_file(&mut inner, s.to_string());
            }
            ImageList::reorder_locked(&mut inner);
        }
        list
    }

    #[test]
    fn numeric_compare_digit_runs() {
        assert_eq!(numeric_cmp("img2.png", "img10.png"), CmpOrdering::Less);
        assert_eq!(numeric_cmp("img10.png", "img2.png"), CmpOrdering::Greater);
        assert_eq!(numeric_cmp("a1b2", "a1b2"), CmpOrdering::Equal);
        assert_eq!(numeric_cmp("v1.2", "v1.10"), CmpOrdering::Less);
        // Equal values, different padding: stable tie-break on the string.
        assert_ne!(numeric_cmp("img01", "img1"), CmpOrdering::Equal);
        // Plain text falls back to byte order.
        assert_eq!(numeric_cmp("apple", "banana"), CmpOrdering::Less);
    }

    #[test]
    fn numeric_order_sorts_naturally() {
        let list = list_with(
            &["d/img10.png", "d/img2.png", "d/img1.png"],
            ListOptions {
                order: Order::Numeric,
                ..Default::default()
            },
        );
        let sources: Vec<_> = list.snapshot().iter().map(|e| e.source().to_string()).collect();
        assert_eq!(sources, ["d/img1.png", "d/img2.png", "d/img10.png"]);
    }

    #[test]
    fn alpha_reverse_flips() {
        let list = list_with(
            &["b", "a", "c"],
            ListOptions {
                order: Order::Alpha,
                reverse: true,
                ..Default::default()
            },
        );
        let sources: Vec<_> = list.snapshot().iter().map(|e| e.source().to_string()).collect();
        assert_eq!(sources, ["c", "b", "a"]);
    }

    #[test]
    fn duplicate_add_keeps_size() {
        let list = list_with(&["a", "b"], ListOptions::default());
        assert_eq!(list.len(), 2);
        assert!(list.add("a", true).is_none());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn ordered_add_lands_in_position() {
        let list = list_with(&["a", "c"], ListOptions::default());
        list.add("b", true).unwrap();
        let sources: Vec<_> = list.snapshot().iter().map(|e| e.source().to_string()).collect();
        assert_eq!(sources, ["a", "b", "c"]);
        // Indices follow the insertion.
        assert_eq!(list.find("b").unwrap().index(), 1);
        assert_eq!(list.find("c").unwrap().index(), 2);
    }

    #[test]
    fn unordered_add_appends() {
        let list = list_with(&["a", "c"], ListOptions::default());
        list.add("b", false).unwrap();
        let sources: Vec<_> = list.snapshot().iter().map(|e| e.source().to_string()).collect();
        assert_eq!(sources, ["a", "c", "b"]);
    }

    #[test]
    fn next_prev_round_trip_with_wrap() {
        let list = list_with(&["a", "b", "c"], ListOptions::default());
        let b = list.get(0, Pos::Next).unwrap();
        assert_eq!(b.source(), "b");
        let a = list.get(b.index(), Pos::Prev).unwrap();
        assert_eq!(a.source(), "a");
        // Wrap both ways.
        assert_eq!(list.get(2, Pos::Next).unwrap().source(), "a");
        assert_eq!(list.get(0, Pos::Prev).unwrap().source(), "c");
    }

    #[test]
    fn no_wrap_stops_at_ends() {
        let list = list_with(
            &["a", "b"],
            ListOptions {
                wrap: false,
                ..Default::default()
            },
        );
        assert!(list.get(1, Pos::Next).is_none());
        assert!(list.get(0, Pos::Prev).is_none());
    }

    #[test]
    fn traversal_skips_failed_entries() {
        let list = list_with(&["a", "b", "c"], ListOptions::default());
        let b = list.find("b").unwrap();
        b.record_failure();
        b.record_failure();
        assert!(b.is_skipped());
        assert_eq!(list.get(0, Pos::Next).unwrap().source(), "c");
        assert_eq!(list.get(2, Pos::Prev).unwrap().source(), "a");
        assert_eq!(list.get(2, Pos::First).unwrap().source(), "a");
    }

    #[test]
    fn parent_adjacency_wraps_once() {
        let list = list_with(
            &["x/1", "x/2", "y/1", "y/2", "z/1"],
            ListOptions {
                order: Order::None,
                ..Default::default()
            },
        );
        assert_eq!(list.get(0, Pos::NextParent).unwrap().source(), "y/1");
        assert_eq!(list.get(2, Pos::NextParent).unwrap().source(), "z/1");
        // Wraps past the end back to the first directory.
        assert_eq!(list.get(4, Pos::NextParent).unwrap().source(), "x/1");
        assert_eq!(list.get(0, Pos::PrevParent).unwrap().source(), "z/1");
        // Single-directory list has no adjacent parent.
        let single = list_with(&["x/1", "x/2"], ListOptions::default());
        assert!(single.get(0, Pos::NextParent).is_none());
    }

    #[test]
    fn remove_returns_directional_neighbor_and_renumbers() {
        let list = list_with(&["a", "b", "c"], ListOptions::default());
        let next = list.remove("b", true).unwrap();
        assert_eq!(next.source(), "c");
        assert_eq!(list.len(), 2);
        assert_eq!(list.find("c").unwrap().index(), 1);
        let prev = list.remove("c", false).unwrap();
        assert_eq!(prev.source(), "a");
        assert!(list.remove("a", true).is_none());
        assert!(list.is_empty());
    }

    #[test]
    fn distance_and_jumps() {
        let list = list_with(&["a", "b", "c", "d"], ListOptions::default());
        let a = list.find("a").unwrap();
        let d = list.find("d").unwrap();
        assert_eq!(list.distance(&a, &d), 3);
        assert_eq!(list.distance(&d, &a), -3);
        assert_eq!(list.get_distance(0, 2).unwrap().source(), "c");
        // Wrapping jump.
        assert_eq!(list.get_distance(3, 2).unwrap().source(), "b");
        assert_eq!(list.get_distance(0, -1).unwrap().source(), "d");
    }

    #[test]
    fn random_order_keeps_every_entry() {
        let sources: Vec<String> = (0..32).map(|i| format!("f{i:02}")).collect();
        let refs: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
        let list = list_with(
            &refs,
            ListOptions {
                order: Order::Random,
                ..Default::default()
            },
        );
        let mut got: Vec<_> = list.snapshot().iter().map(|e| e.source().to_string()).collect();
        got.sort();
        let mut expect = sources.clone();
        expect.sort();
        assert_eq!(got, expect);
    }

    #[test]
    fn mtime_and_size_orders_use_stats() {
        let list = list_with(&["a", "b", "c"], ListOptions::default());
        for (source, size, mtime) in [("a", 30u64, 3u128), ("b", 10, 1), ("c", 20, 2)] {
            list.find(source)
                .unwrap()
                .set_stat(FileStat {
                    size,
                    mtime_ns: mtime,
                });
        }
        list.set_order(Order::Size, false);
        let by_size: Vec<_> = list.snapshot().iter().map(|e| e.source().to_string()).collect();
        assert_eq!(by_size, ["b", "c", "a"]);
        list.set_order(Order::Mtime, true);
        let by_mtime: Vec<_> = list.snapshot().iter().map(|e| e.source().to_string()).collect();
        assert_eq!(by_mtime, ["a", "c", "b"]);
    }

    #[test]
    fn fs_events_mutate_and_notify() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("new.png");
        std::fs::write(&file, b"x").unwrap();

        let list = list_with(&[], ListOptions::default());
        let added = Arc::new(AtomicUsize::new(0));
        let added2 = Arc::clone(&added);
        list.initialize(Box::new(move |event| {
            if matches!(event, FsEvent::Added(_)) {
                added2.fetch_add(1, Ordering::SeqCst);
            }
        }));

        list.handle_fs_change(FsChange::Created, &file);
        assert_eq!(list.len(), 1);
        assert_eq!(added.load(Ordering::SeqCst), 1);
        // Duplicate create is suppressed.
        list.handle_fs_change(FsChange::Created, &file);
        assert_eq!(list.len(), 1);
        assert_eq!(added.load(Ordering::SeqCst), 1);

        list.handle_fs_change(FsChange::Removed, &file);
        assert!(list.is_empty());
    }

    #[test]
    fn load_recurses_directories_lexicographically() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(dir.path().join("b.png"), b"x").unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::fs::write(sub.join("c.png"), b"x").unwrap();
        std::fs::write(dir.path().join(".hidden"), b"x").unwrap();

        let list = ImageList::new(ListOptions {
            order: Order::None,
            recursive: true,
            ..Default::default()
        });
        let added = list.load(&[dir.path().to_string_lossy().into_owned()]);
        assert_eq!(added, 3);
        let names: Vec<_> = list.snapshot().iter().map(|e| e.name().to_string()).collect();
        // Depth-first, lexicographic: a.png, b.png, then sub/c.png.
        assert_eq!(names, ["a.png", "b.png", "c.png"]);
    }
}
