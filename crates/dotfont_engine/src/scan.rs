use crate::{Position, Rectangle};

/// Whether a scan walks the region row by row or column by column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Columns,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HorizontalRun {
    LeftToRight,
    RightToLeft,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VerticalRun {
    TopToBottom,
    BottomToTop,
}

/// One of the eight directional orders a region can be scanned in:
/// {row-major, column-major} x {left-to-right, right-to-left} x
/// {top-to-bottom, bottom-to-top}.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScanOrder {
    pub axis: Axis,
    pub horizontal: HorizontalRun,
    pub vertical: VerticalRun,
}

impl ScanOrder {
    pub const fn new(axis: Axis, horizontal: HorizontalRun, vertical: VerticalRun) -> Self {
        Self { axis, horizontal, vertical }
    }

    /// Row-major, left to right, top to bottom. This is the serialization order.
    pub const TOP_LEFT_ROWS: ScanOrder = ScanOrder::new(Axis::Rows, HorizontalRun::LeftToRight, VerticalRun::TopToBottom);

    /// Column-major, left to right, top to bottom.
    pub const TOP_LEFT_COLUMNS: ScanOrder = ScanOrder::new(Axis::Columns, HorizontalRun::LeftToRight, VerticalRun::TopToBottom);

    /// Column-major, right to left, top to bottom.
    pub const TOP_RIGHT_COLUMNS: ScanOrder = ScanOrder::new(Axis::Columns, HorizontalRun::RightToLeft, VerticalRun::TopToBottom);

    /// Row-major, left to right, bottom to top.
    pub const BOTTOM_LEFT_ROWS: ScanOrder = ScanOrder::new(Axis::Rows, HorizontalRun::LeftToRight, VerticalRun::BottomToTop);
}

impl Default for ScanOrder {
    fn default() -> Self {
        ScanOrder::TOP_LEFT_ROWS
    }
}

/// Walks the cells of a rectangular region in a [`ScanOrder`].
///
/// The cursor is pure index arithmetic; it neither reads nor writes pixels.
/// The region is expected to be clamped by the caller and may be empty.
#[derive(Clone, Debug)]
pub struct ScanCursor {
    region: Rectangle,
    order: ScanOrder,
    index: usize,
    len: usize,
}

impl ScanCursor {
    pub fn new(region: Rectangle, order: ScanOrder) -> Self {
        let len = if region.is_empty() {
            0
        } else {
            region.size.width as usize * region.size.height as usize
        };
        Self { region, order, index: 0, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn remaining(&self) -> usize {
        self.len - self.index
    }

    pub fn has_next(&self) -> bool {
        self.index < self.len
    }

    /// Yields the next cell position, or `None` once the region is exhausted.
    pub fn advance(&mut self) -> Option<Position> {
        if self.index >= self.len {
            return None;
        }
        let pos = self.position_at(self.index);
        self.index += 1;
        Some(pos)
    }

    fn position_at(&self, index: usize) -> Position {
        let width = self.region.size.width as usize;
        let height = self.region.size.height as usize;

        // The major coordinate advances once per completed run, the minor
        // coordinate advances within a run.
        let (column, row) = match self.order.axis {
            Axis::Rows => (index % width, index / width),
            Axis::Columns => (index / height, index % height),
        };

        let x = match self.order.horizontal {
            HorizontalRun::LeftToRight => column as i32,
            HorizontalRun::RightToLeft => self.region.size.width - 1 - column as i32,
        };
        let y = match self.order.vertical {
            VerticalRun::TopToBottom => row as i32,
            VerticalRun::BottomToTop => self.region.size.height - 1 - row as i32,
        };

        Position::new(self.region.start.x + x, self.region.start.y + y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(region: Rectangle, order: ScanOrder) -> Vec<(i32, i32)> {
        let mut cursor = ScanCursor::new(region, order);
        let mut result = Vec::new();
        while let Some(pos) = cursor.advance() {
            result.push((pos.x, pos.y));
        }
        result
    }

    #[test]
    fn test_row_major_top_left() {
        let seq = collect(Rectangle::from(0, 0, 3, 2), ScanOrder::TOP_LEFT_ROWS);
        assert_eq!(seq, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn test_row_major_bottom_left() {
        let seq = collect(Rectangle::from(0, 0, 3, 2), ScanOrder::BOTTOM_LEFT_ROWS);
        assert_eq!(seq, vec![(0, 1), (1, 1), (2, 1), (0, 0), (1, 0), (2, 0)]);
    }

    #[test]
    fn test_row_major_right_to_left() {
        let order = ScanOrder::new(Axis::Rows, HorizontalRun::RightToLeft, VerticalRun::TopToBottom);
        let seq = collect(Rectangle::from(0, 0, 3, 2), order);
        assert_eq!(seq, vec![(2, 0), (1, 0), (0, 0), (2, 1), (1, 1), (0, 1)]);
    }

    #[test]
    fn test_column_major_top_left() {
        let seq = collect(Rectangle::from(0, 0, 3, 2), ScanOrder::TOP_LEFT_COLUMNS);
        assert_eq!(seq, vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]);
    }

    #[test]
    fn test_column_major_top_right() {
        let seq = collect(Rectangle::from(0, 0, 3, 2), ScanOrder::TOP_RIGHT_COLUMNS);
        assert_eq!(seq, vec![(2, 0), (2, 1), (1, 0), (1, 1), (0, 0), (0, 1)]);
    }

    #[test]
    fn test_column_major_bottom_right() {
        let order = ScanOrder::new(Axis::Columns, HorizontalRun::RightToLeft, VerticalRun::BottomToTop);
        let seq = collect(Rectangle::from(0, 0, 2, 2), order);
        assert_eq!(seq, vec![(1, 1), (1, 0), (0, 1), (0, 0)]);
    }

    #[test]
    fn test_offset_region() {
        let seq = collect(Rectangle::from(2, 3, 2, 2), ScanOrder::TOP_LEFT_ROWS);
        assert_eq!(seq, vec![(2, 3), (3, 3), (2, 4), (3, 4)]);
    }

    #[test]
    fn test_every_order_covers_region() {
        let region = Rectangle::from(1, 1, 3, 4);
        for axis in [Axis::Rows, Axis::Columns] {
            for horizontal in [HorizontalRun::LeftToRight, HorizontalRun::RightToLeft] {
                for vertical in [VerticalRun::TopToBottom, VerticalRun::BottomToTop] {
                    let mut seq = collect(region, ScanOrder::new(axis, horizontal, vertical));
                    assert_eq!(seq.len(), 12);
                    seq.sort_unstable();
                    seq.dedup();
                    assert_eq!(seq.len(), 12, "order must visit each cell exactly once");
                }
            }
        }
    }

    #[test]
    fn test_empty_region() {
        let mut cursor = ScanCursor::new(Rectangle::from(0, 0, 0, 5), ScanOrder::TOP_LEFT_ROWS);
        assert!(!cursor.has_next());
        assert_eq!(cursor.advance(), None);

        let mut negative = ScanCursor::new(Rectangle::from(0, 0, -2, 5), ScanOrder::TOP_LEFT_ROWS);
        assert_eq!(negative.len(), 0);
        assert_eq!(negative.advance(), None);
    }
}
