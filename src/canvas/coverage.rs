use super::region::ChunkGrid;

/// Pending-chunk map for one tile, indexed by grid-relative cell.
///
/// Cells start pending and are cleared exactly once; duplicate `mark_done`
/// calls are no-ops. Out-of-grid cells are a caller bug and panic — inbound
/// chunks must be filtered through `ChunkGrid::relative` first.
#[derive(Debug, Clone)]
pub struct CoverageMap {
    cols: usize,
    rows: usize,
    pending: Vec<bool>,
    remaining: usize,
}

impl CoverageMap {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            pending: vec![true; cols * rows],
            remaining: cols * rows,
        }
    }

    pub fn for_grid(grid: &ChunkGrid) -> Self {
        Self::new(grid.cols, grid.rows)
    }

    pub fn total(&self) -> usize {
        self.pending.len()
    }

    pub fn completed(&self) -> usize {
        self.total() - self.remaining
    }

    pub fn all_done(&self) -> bool {
        self.remaining == 0
    }

    pub fn is_pending(&self, cx_rel: usize, cy_rel: usize) -> bool {
        self.pending[self.index(cx_rel, cy_rel)]
    }

    pub fn mark_done(&mut self, cx_rel: usize, cy_rel: usize) {
        let idx = self.index(cx_rel, cy_rel);
        if self.pending[idx] {
            self.pending[idx] = false;
            self.remaining -= 1;
        }
    }

    fn index(&self, cx_rel: usize, cy_rel: usize) -> usize {
        assert!(
            cx_rel < self.cols && cy_rel < self.rows,
            "cell ({cx_rel},{cy_rel}) outside {}x{} coverage grid",
            self.cols,
            self.rows
        );
        cy_rel * self.cols + cx_rel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_done_requires_every_cell() {
        let mut map = CoverageMap::new(3, 2);
        assert_eq!(map.total(), 6);
        for cy in 0..2 {
            for cx in 0..3 {
                assert!(!map.all_done());
                assert!(map.is_pending(cx, cy));
                map.mark_done(cx, cy);
                assert!(!map.is_pending(cx, cy));
            }
        }
        assert!(map.all_done());
        assert_eq!(map.completed(), 6);
    }

    #[test]
    fn test_mark_done_idempotent() {
        let mut map = CoverageMap::new(2, 2);
        map.mark_done(1, 0);
        map.mark_done(1, 0);
        assert_eq!(map.completed(), 1);
        assert!(!map.all_done());
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_out_of_grid_panics() {
        let map = CoverageMap::new(2, 2);
        let _ = map.is_pending(2, 0);
    }

    #[test]
    fn test_empty_grid_is_done() {
        assert!(CoverageMap::new(0, 0).all_done());
    }
}
