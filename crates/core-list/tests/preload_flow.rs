//! End-to-end preload window behavior: opening an image queues its forward
//! neighbors, advancing shifts the window and moves the left-behind image
//! into history.

use core_decode::DecoderRegistry;
use core_list::{ImageList, ListOptions, Loader, Order, Pos};
use core_pool::ThreadPool;
use std::path::Path;
use std::sync::Arc;

fn write_png(path: &Path, gray: u8) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = png::Encoder::new(file, 1, 1);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&[gray, gray, gray, 255]).unwrap();
}

fn fixture(count: usize) -> (tempfile::TempDir, Arc<ImageList>) {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..count {
        write_png(&dir.path().join(format!("{i}.png")), (i * 20) as u8);
    }
    let list = ImageList::new(ListOptions {
        order: Order::Alpha,
        ..Default::default()
    });
    list.load(&[dir.path().to_string_lossy().into_owned()]);
    (dir, list)
}

fn loader_for(list: &Arc<ImageList>, preload: usize, history: usize) -> Arc<Loader> {
    Loader::new(
        Arc::clone(list),
        Arc::new(DecoderRegistry::with_defaults()),
        Arc::new(ThreadPool::new(2)),
        history,
        preload,
        Box::new(|_| {}),
    )
}

#[test]
fn preload_window_tracks_the_cursor() {
    let (_dir, list) = fixture(6);
    let loader = loader_for(&list, 2, 4);

    // Open image 1: the queue head holds its two forward neighbors.
    let current = list.get_index(1).unwrap();
    loader.ensure_loaded(&current).unwrap();
    let targets: Vec<String> = loader
        .preload_targets(1)
        .iter()
        .map(|e| e.name().to_string())
        .collect();
    assert_eq!(targets, ["2.png", "3.png"]);

    loader.schedule_preload(1);
    // Preloads run on the loader's dedicated pool; targets land decoded in
    // the preload cache once targets() observes them.
    for _ in 0..200 {
        if loader.preload().len() == 2 {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert!(loader.preload().contains(list.get_index(2).unwrap().source()));
    assert!(loader.preload().contains(list.get_index(3).unwrap().source()));

    // Advance: previous image enters history, the window shifts by one.
    let next = list.get(1, Pos::Next).unwrap();
    assert_eq!(next.name(), "2.png");
    loader.note_viewed(Arc::clone(&current));
    assert!(loader.history().contains(current.source()));

    let shifted: Vec<String> = loader
        .preload_targets(next.index())
        .iter()
        .map(|e| e.name().to_string())
        .collect();
    assert_eq!(shifted, ["3.png", "4.png"]);
}

#[test]
fn preloaded_entries_carry_decoded_frames() {
    let (_dir, list) = fixture(3);
    let loader = loader_for(&list, 2, 2);
    loader.schedule_preload(0);
    for _ in 0..200 {
        if loader.preload().len() == 2 {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    let one = list.get_index(1).unwrap();
    assert!(one.has_frames());
    assert_eq!(one.lock_data().format.as_deref(), Some("PNG"));
}

#[test]
fn removal_eviction_never_resurrects() {
    let (_dir, list) = fixture(3);
    let loader = loader_for(&list, 2, 2);
    let victim = list.get_index(1).unwrap();
    loader.ensure_loaded(&victim).unwrap();
    loader.note_viewed(Arc::clone(&victim));
    assert!(loader.history().contains(victim.source()));

    // The list drops the entry; caches are told to evict by source.
    let neighbor = list.remove(victim.source(), true).unwrap();
    loader.evict(victim.source());
    assert!(!loader.history().contains(victim.source()));
    assert_eq!(neighbor.name(), "2.png");
    assert_eq!(list.len(), 2);
}

#[test]
fn claimed_entries_survive_cache_clears() {
    let (_dir, list) = fixture(3);
    let loader = loader_for(&list, 2, 2);
    loader.schedule_preload(0);
    for _ in 0..200 {
        if loader.preload().len() == 2 {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    let b = list.get_index(1).unwrap();
    let c = list.get_index(2).unwrap();
    assert!(b.has_frames() && c.has_frames());

    // The viewer takes ownership of b; clearing the preload window must
    // free only what the caches still own.
    loader.claim(b.source());
    loader.reset();
    assert!(b.has_frames());
    assert!(!c.has_frames());
}

#[test]
fn reset_cancels_and_drains() {
    let (_dir, list) = fixture(6);
    let loader = loader_for(&list, 4, 2);
    loader.schedule_preload(0);
    loader.reset();
    // After the drain the preload cache is empty and scheduling works again.
    assert!(loader.preload().is_empty());
    loader.schedule_preload(0);
    for _ in 0..200 {
        if loader.preload().len() == 4 {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert_eq!(loader.preload().len(), 4);
}
