//! Fixed-size block windows
//!
//! Log queries against public nodes are range-limited, so every scan over a
//! block range (secret recovery, subscription catch-up, CLI backfill) walks it
//! in inclusive windows of at most `size` blocks.

/// Default window size in blocks
pub const DEFAULT_WINDOW: u64 = 500;

/// Iterator over inclusive `(from, to)` block windows covering `[from, to]`
#[derive(Debug, Clone)]
pub struct BlockWindows {
    next: u64,
    end: u64,
    size: u64,
    done: bool,
}

impl BlockWindows {
    /// Windows covering `[from, to]`; empty when `from > to`. A zero size is
    /// treated as one block per window.
    pub fn new(from: u64, to: u64, size: u64) -> Self {
        Self {
            next: from,
            end: to,
            size: size.max(1),
            done: from > to,
        }
    }
}

impl Iterator for BlockWindows {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let from = self.next;
        let to = from.saturating_add(self.size - 1).min(self.end);

        if to == self.end {
            self.done = true;
        } else {
            self.next = to + 1;
        }

        Some((from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_window_when_range_is_small() {
        let windows: Vec<_> = BlockWindows::new(50, 150, 500).collect();
        assert_eq!(windows, vec![(50, 150)]);
    }

    #[test]
    fn test_windows_cover_range_without_overlap() {
        let windows: Vec<_> = BlockWindows::new(0, 1_000, 500).collect();
        assert_eq!(windows, vec![(0, 499), (500, 999), (1_000, 1_000)]);
    }

    #[test]
    fn test_empty_and_degenerate_ranges() {
        assert_eq!(BlockWindows::new(10, 9, 500).count(), 0);
        assert_eq!(BlockWindows::new(7, 7, 500).collect::<Vec<_>>(), vec![(7, 7)]);
        assert_eq!(BlockWindows::new(1, 3, 0).count(), 3);
    }

    #[test]
    fn test_range_ending_at_u64_max() {
        let windows: Vec<_> = BlockWindows::new(u64::MAX - 1, u64::MAX, 500).collect();
        assert_eq!(windows, vec![(u64::MAX - 1, u64::MAX)]);
    }
}
