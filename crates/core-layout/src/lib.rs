//! Thumbnail grid geometry for the gallery mode.
//!
//! The layout tracks a window onto the image list: `top` is the list index
//! of the first visible cell and is always row-aligned (a multiple of
//! `columns`). Invariant after every `update`:
//! `current == top + current_row * columns + current_col`, with
//! `current_row < rows` and `current_col < columns`.
//!
//! The layout never touches images itself; it hands out list indices (load
//! queue, eviction set, cell rectangles) and the gallery mode applies them.

use tracing::trace;

/// Selection movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMove {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    First,
    Last,
}

/// Pixel rectangle of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub x: isize,
    pub y: isize,
    pub size: usize,
}

pub struct Layout {
    thumb_size: usize,
    padding: usize,
    width: usize,
    height: usize,
    columns: usize,
    rows: usize,
    /// Entries in the backing list.
    total: usize,
    /// Selected list index.
    current: usize,
    /// List index of the first visible cell; row-aligned.
    top: usize,
    entered: bool,
}

impl Layout {
    pub fn new(thumb_size: usize, padding: usize) -> Self {
        Self {
            thumb_size: thumb_size.max(1),
            padding,
            width: 0,
            height: 0,
            columns: 1,
            rows: 1,
            total: 0,
            current: 0,
            top: 0,
            entered: false,
        }
    }

    #[inline]
    fn cell(&self) -> usize {
        self.thumb_size + self.padding
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn thumb_size(&self) -> usize {
        self.thumb_size
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_cell(&self) -> (usize, usize) {
        let row = (self.current - self.top) / self.columns;
        let col = (self.current - self.top) % self.columns;
        (row, col)
    }

    /// Visible list range, half-open.
    pub fn visible(&self) -> std::ops::Range<usize> {
        self.top..(self.top + self.rows * self.columns).min(self.total)
    }

    /// Recompute the grid for a window size.
    pub fn resize(&mut self, width: usize, height: usize, total: usize) {
        self.width = width;
        self.height = height;
        self.columns = (width / self.cell()).max(1);
        self.rows = (height / self.cell()).max(1);
        trace!(target: "layout", columns = self.columns, rows = self.rows, "grid resized");
        self.update(total);
    }

    /// Select a specific list index (e.g. the image the viewer was on when
    /// switching modes).
    pub fn select_index(&mut self, index: usize, total: usize) {
        self.current = index;
        self.update(total);
    }

    /// Re-establish the layout invariants after any change of selection,
    /// list length, or grid size.
    pub fn update(&mut self, total: usize) {
        self.total = total;
        if total == 0 {
            self.current = 0;
            self.top = 0;
            return;
        }
        self.current = self.current.min(total - 1);

        let cur_row_abs = self.current / self.columns;
        let top_row = self.top / self.columns;
        let want_row = if !self.entered {
            // First entry: drop the selection near the middle row.
            self.entered = true;
            self.rows / 2
        } else if cur_row_abs < top_row {
            0
        } else if cur_row_abs >= top_row + self.rows {
            self.rows - 1
        } else {
            cur_row_abs - top_row
        };
        let mut top_row = cur_row_abs.saturating_sub(want_row);

        // Keep the last page fully populated where possible.
        let last_row = (total - 1) / self.columns;
        let max_top_row = (last_row + 1).saturating_sub(self.rows);
        top_row = top_row.min(max_top_row);

        self.top = top_row * self.columns;
    }

    /// Move the selection; clamped at the list ends. Returns true when the
    /// selection changed.
    pub fn select(&mut self, mv: SelectMove, total: usize) -> bool {
        if total == 0 {
            return false;
        }
        let last = total - 1;
        let page = self.columns * self.rows.saturating_sub(1).max(1);
        let target = match mv {
            SelectMove::Left => self.current.saturating_sub(1),
            SelectMove::Right => (self.current + 1).min(last),
            SelectMove::Up => self.current.checked_sub(self.columns).unwrap_or(self.current),
            SelectMove::Down => {
                if self.current + self.columns <= last {
                    self.current + self.columns
                } else if self.current == last {
                    self.current
                } else {
                    last
                }
            }
            SelectMove::PageUp => self.current.saturating_sub(page),
            SelectMove::PageDown => (self.current + page).min(last),
            SelectMove::First => 0,
            SelectMove::Last => last,
        };
        if target == self.current {
            self.update(total);
            return false;
        }
        self.current = target;
        self.update(total);
        true
    }

    /// Horizontal gutter centering the grid in the window.
    fn origin_x(&self) -> isize {
        let grid_w = self.columns * self.cell() - self.padding.min(self.cell() - 1);
        (self.width as isize - grid_w as isize) / 2
    }

    fn origin_y(&self) -> isize {
        let grid_h = self.rows * self.cell() - self.padding.min(self.cell() - 1);
        (self.height as isize - grid_h as isize) / 2
    }

    /// Pixel rectangle of the cell holding list index `index`, when visible.
    pub fn cell_rect(&self, index: usize) -> Option<CellRect> {
        if !self.visible().contains(&index) {
            return None;
        }
        let slot = index - self.top;
        let (row, col) = (slot / self.columns, slot % self.columns);
        Some(CellRect {
            x: self.origin_x() + (col * self.cell()) as isize,
            y: self.origin_y() + (row * self.cell()) as isize,
            size: self.thumb_size,
        })
    }

    /// Hit-test a window pixel; selects and returns the index under it.
    pub fn select_at(&mut self, x: isize, y: isize, total: usize) -> Option<usize> {
        let rel_x = x - self.origin_x();
        let rel_y = y - self.origin_y();
        if rel_x < 0 || rel_y < 0 {
            return None;
        }
        let (col, cx) = (
            rel_x as usize / self.cell(),
            rel_x as usize % self.cell(),
        );
        let (row, cy) = (
            rel_y as usize / self.cell(),
            rel_y as usize % self.cell(),
        );
        if col >= self.columns || row >= self.rows {
            return None;
        }
        if cx >= self.thumb_size || cy >= self.thumb_size {
            return None; // in the padding gutter
        }
        let index = self.top + row * self.columns + col;
        if index >= total {
            return None;
        }
        self.current = index;
        self.update(total);
        Some(index)
    }

    /// Thumbnails to produce next: visible missing entries first, walking
    /// outward from the selection alternately forward/backward, then up to
    /// `preload` off-screen entries in the same alternating order.
    pub fn load_queue(&self, preload: usize, has_thumb: impl Fn(usize) -> bool) -> Vec<usize> {
        let mut queue = Vec::new();
        if self.total == 0 {
            return queue;
        }
        let visible = self.visible();
        let mut push = |idx: usize, queue: &mut Vec<usize>| {
            if !has_thumb(idx) && !queue.contains(&idx) {
                queue.push(idx);
            }
        };

        // Outward walk over the visible window.
        let mut offset = 0isize;
        loop {
            let fwd = self.current as isize + offset;
            let back = self.current as isize - offset;
            if fwd >= visible.end as isize && back < visible.start as isize {
                break;
            }
            if (visible.start as isize..visible.end as isize).contains(&fwd) {
                push(fwd as usize, &mut queue);
            }
            if offset != 0 && (visible.start as isize..visible.end as isize).contains(&back) {
                push(back as usize, &mut queue);
            }
            offset += 1;
        }

        // Off-screen margin, same alternation.
        let mut extra = 0;
        let mut fwd = visible.end;
        let mut back = visible.start;
        while extra < preload && (fwd < self.total || back > 0) {
            if fwd < self.total {
                push(fwd, &mut queue);
                fwd += 1;
                extra += 1;
            }
            if extra < preload && back > 0 {
                back -= 1;
                push(back, &mut queue);
                extra += 1;
            }
        }
        queue
    }

    /// Indices whose thumbnails fall outside the preserved window
    /// (`preserve` entries on each side of the visible range) and should be
    /// freed.
    pub fn evictable(&self, preserve: usize) -> Vec<usize> {
        let visible = self.visible();
        let keep_start = visible.start.saturating_sub(preserve);
        let keep_end = (visible.end + preserve).min(self.total);
        (0..self.total)
            .filter(|i| !(keep_start..keep_end).contains(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4 columns x 3 rows: 50px thumbs, 10px padding, 240x180 window. The
    /// list is attached afterwards through select/update calls.
    fn grid_4x3(_total: usize) -> Layout {
        let mut layout = Layout::new(50, 10);
        layout.resize(240, 180, 0);
        layout
    }

    #[test]
    fn resize_computes_grid_dimensions() {
        let layout = grid_4x3(20);
        assert_eq!(layout.columns(), 4);
        assert_eq!(layout.rows(), 3);
        // Degenerate windows keep at least one cell.
        let mut tiny = Layout::new(50, 10);
        tiny.resize(10, 10, 5);
        assert_eq!((tiny.columns(), tiny.rows()), (1, 1));
    }

    #[test]
    fn selection_invariant_holds() {
        let mut layout = grid_4x3(40);
        layout.select_index(17, 40);
        let (row, col) = layout.current_cell();
        assert!(row < layout.rows() && col < layout.columns());
        assert_eq!(layout.current(), layout.visible().start + row * 4 + col);
        assert_eq!(col, 17 % 4);
    }

    #[test]
    fn first_entry_centers_selection_row() {
        let mut layout = grid_4x3(40);
        layout.select_index(20, 40);
        // rows/2 == 1: selected row sits one row below the top.
        let (row, _) = layout.current_cell();
        assert_eq!(row, 1);
    }

    #[test]
    fn arrow_moves_clamp_at_ends() {
        let mut layout = grid_4x3(10);
        layout.select_index(0, 10);
        assert!(!layout.select(SelectMove::Left, 10));
        assert!(!layout.select(SelectMove::Up, 10));
        assert!(layout.select(SelectMove::Right, 10));
        assert_eq!(layout.current(), 1);
        assert!(layout.select(SelectMove::Down, 10));
        assert_eq!(layout.current(), 5);
        layout.select(SelectMove::Last, 10);
        assert_eq!(layout.current(), 9);
        assert!(!layout.select(SelectMove::Right, 10));
        // Down from a partial last row clamps to the last entry.
        layout.select_index(7, 10);
        assert!(layout.select(SelectMove::Down, 10));
        assert_eq!(layout.current(), 9);
    }

    #[test]
    fn page_moves_by_rows_minus_one() {
        let mut layout = grid_4x3(100);
        layout.select_index(50, 100);
        let page = 4 * 2;
        assert!(layout.select(SelectMove::PageDown, 100));
        assert_eq!(layout.current(), 50 + page);
        assert!(layout.select(SelectMove::PageUp, 100));
        assert_eq!(layout.current(), 50);
    }

    #[test]
    fn scrolling_keeps_selection_visible() {
        let mut layout = grid_4x3(100);
        layout.select_index(0, 100);
        for _ in 0..10 {
            layout.select(SelectMove::Down, 100);
        }
        assert_eq!(layout.current(), 40);
        assert!(layout.visible().contains(&layout.current()));
        for _ in 0..10 {
            layout.select(SelectMove::Up, 100);
        }
        assert_eq!(layout.current(), 0);
        assert!(layout.visible().contains(&0));
    }

    #[test]
    fn tail_window_backfills_last_rows() {
        let mut layout = grid_4x3(24);
        layout.select_index(23, 24);
        // 24 entries = 6 rows; the window shows the last 3 full rows.
        assert_eq!(layout.visible(), 12..24);
    }

    #[test]
    fn cell_rect_and_hit_test_agree() {
        let mut layout = grid_4x3(24);
        layout.select_index(0, 24);
        for index in layout.visible() {
            let rect = layout.cell_rect(index).unwrap();
            let hit = layout.select_at(
                rect.x + rect.size as isize / 2,
                rect.y + rect.size as isize / 2,
                24,
            );
            assert_eq!(hit, Some(index));
        }
        // Padding gutters miss.
        let rect = layout.cell_rect(layout.visible().start).unwrap();
        assert_eq!(
            layout.select_at(rect.x + rect.size as isize + 1, rect.y, 24),
            None
        );
    }

    #[test]
    fn load_queue_walks_outward_then_margin() {
        let mut layout = grid_4x3(100);
        layout.select_index(20, 100);
        let visible = layout.visible();
        let queue = layout.load_queue(4, |_| false);
        // Head is the selection, then its alternating neighbors.
        assert_eq!(queue[0], 20);
        assert_eq!(queue[1], 21);
        assert_eq!(queue[2], 19);
        // Every visible entry precedes any off-screen entry.
        let visible_count = visible.len();
        assert!(queue[..visible_count].iter().all(|i| visible.contains(i)));
        assert_eq!(queue.len(), visible_count + 4);
        // Margin alternates beyond both window edges.
        assert_eq!(queue[visible_count], visible.end);
        assert_eq!(queue[visible_count + 1], visible.start - 1);
    }

    #[test]
    fn load_queue_skips_present_thumbnails() {
        let mut layout = grid_4x3(100);
        layout.select_index(20, 100);
        let queue = layout.load_queue(0, |i| i % 2 == 0);
        assert!(queue.iter().all(|i| i % 2 == 1));
    }

    #[test]
    fn evictable_preserves_margin_around_visible() {
        let mut layout = grid_4x3(100);
        layout.select_index(50, 100);
        let visible = layout.visible();
        let evict = layout.evictable(6);
        assert!(!evict.is_empty());
        for i in &evict {
            assert!(*i < visible.start.saturating_sub(6) || *i >= visible.end + 6);
        }
        // Nothing inside the visible range is ever evicted.
        assert!(visible.clone().all(|i| !evict.contains(&i)));
    }

    #[test]
    fn empty_list_is_inert() {
        let mut layout = grid_4x3(0);
        assert!(!layout.select(SelectMove::Down, 0));
        assert!(layout.load_queue(4, |_| false).is_empty());
        assert_eq!(layout.visible(), 0..0);
        assert_eq!(layout.select_at(30, 30, 0), None);
    }
}
