//! Filesystem monitoring via `notify`.
//!
//! One non-recursive watch per parent directory of loaded entries. Raw
//! watcher events are folded into [`FsChange`] classes and applied through
//! [`ImageList::handle_fs_change`] on the watcher's callback thread; the
//! list does its own locking and forwards the digested event to the bound
//! handler.

use crate::list::{FsChange, ImageList};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, warn};

pub struct FsMonitor {
    watcher: Mutex<RecommendedWatcher>,
    watched: Mutex<HashSet<PathBuf>>,
}

impl FsMonitor {
    /// Start the OS watcher, delivering changes into `list`. The monitor
    /// holds only a weak handle, so it never keeps a dropped list alive.
    pub fn start(list: &Arc<ImageList>) -> notify::Result<FsMonitor> {
        let weak: Weak<ImageList> = Arc::downgrade(list);
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!(target: "list.monitor", error = %e, "watcher error");
                    return;
                }
            };
            let Some(list) = weak.upgrade() else {
                return;
            };
            let change = match event.kind {
                EventKind::Create(_) => FsChange::Created,
                EventKind::Remove(_) => FsChange::Removed,
                EventKind::Modify(ModifyKind::Name(RenameMode::From)) => FsChange::Removed,
                EventKind::Modify(ModifyKind::Name(RenameMode::To)) => FsChange::Created,
                EventKind::Modify(_) => FsChange::Modified,
                _ => return,
            };
            for path in &event.paths {
                list.handle_fs_change(change, path);
            }
        })?;
        Ok(FsMonitor {
            watcher: Mutex::new(watcher),
            watched: Mutex::new(HashSet::new()),
        })
    }

    /// Watch one directory (idempotent).
    pub fn watch_dir(&self, dir: &Path) -> notify::Result<()> {
        let mut watched = self.watched.lock().expect("monitor lock");
        if !watched.insert(dir.to_path_buf()) {
            return Ok(());
        }
        self.watcher
            .lock()
            .expect("monitor lock")
            .watch(dir, RecursiveMode::NonRecursive)?;
        debug!(target: "list.monitor", dir = %dir.display(), "watching");
        Ok(())
    }

    /// Watch the parent directory of every current entry. Unwatchable
    /// directories are skipped with a warning.
    pub fn watch_list(&self, list: &ImageList) -> usize {
        let mut ok = 0;
        for dir in list.parent_dirs() {
            match self.watch_dir(Path::new(&dir)) {
                Ok(()) => ok += 1,
                Err(e) => {
                    warn!(target: "list.monitor", dir = dir.as_str(), error = %e, "watch failed")
                }
            }
        }
        ok
    }
}
