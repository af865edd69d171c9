use crate::{EngineError, EngineResult, Rectangle, ScanCursor, ScanOrder, Size};

/// Validity policy for grid resizes. Width and height are judged
/// independently, so a policy can pin one dimension and leave the other free.
pub trait SizeRule {
    fn accepts_width(&self, _width: i32) -> bool {
        true
    }

    fn accepts_height(&self, _height: i32) -> bool {
        true
    }
}

/// Accepts any non-negative size.
#[derive(Copy, Clone, Debug, Default)]
pub struct AnySize;

impl SizeRule for AnySize {}

/// Bounding box of all pixel flips since the last reset. Bounds are
/// inclusive and only meaningful while `dirty` is set.
#[derive(Copy, Clone, Debug)]
struct DirtyRegion {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    dirty: bool,
}

impl DirtyRegion {
    const CLEAN: DirtyRegion = DirtyRegion {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
        dirty: false,
    };

    fn mark(&mut self, x: i32, y: i32) {
        if self.dirty {
            self.left = self.left.min(x);
            self.top = self.top.min(y);
            self.right = self.right.max(x);
            self.bottom = self.bottom.max(y);
        } else {
            self.left = x;
            self.top = y;
            self.right = x;
            self.bottom = y;
            self.dirty = true;
        }
    }

    fn mark_rect(&mut self, rect: Rectangle) {
        if rect.is_empty() {
            return;
        }
        self.mark(rect.left(), rect.top());
        self.mark(rect.right() - 1, rect.bottom() - 1);
    }

    fn bounds(&self) -> Option<Rectangle> {
        if self.dirty {
            Some(Rectangle::from(self.left, self.top, self.right - self.left + 1, self.bottom - self.top + 1))
        } else {
            None
        }
    }
}

/// Bit-packed two-dimensional boolean storage.
///
/// Pixels are stored row-major with every row byte-aligned, least
/// significant bit first within a byte. Reads are total: any coordinate
/// outside the grid is unset. Writes are checked and feed the dirty region,
/// which callers reset before a logical operation and inspect afterwards to
/// learn what changed.
pub struct PixelGrid {
    width: i32,
    height: i32,
    data: Vec<u8>,
    dirty: DirtyRegion,
}

impl PixelGrid {
    pub fn new(size: impl Into<Size>) -> EngineResult<Self> {
        let size = size.into();
        if size.width < 0 || size.height < 0 {
            return Err(EngineError::NegativeSize {
                width: size.width,
                height: size.height,
            });
        }
        Ok(Self {
            width: size.width,
            height: size.height,
            data: vec![0; Self::stride(size.width) * size.height as usize],
            dirty: DirtyRegion::CLEAN,
        })
    }

    /// Deserialize a grid from its packed byte form. `bytes` may be longer
    /// than needed; excess bytes are ignored.
    pub fn from_bytes(size: impl Into<Size>, bytes: &[u8]) -> EngineResult<Self> {
        let mut grid = Self::new(size)?;
        let cells = grid.width as usize * grid.height as usize;
        let expected = cells.div_ceil(8);
        if bytes.len() < expected {
            return Err(EngineError::NotEnoughData {
                expected,
                actual: bytes.len(),
            });
        }
        let full = grid.rectangle();
        let mut scan = grid.scan_mut(full, ScanOrder::TOP_LEFT_ROWS);
        for i in 0..cells {
            scan.write_next(bytes[i / 8] & (1 << (i % 8)) != 0)?;
        }
        grid.dirty = DirtyRegion::CLEAN;
        Ok(grid)
    }

    /// Serialize via the row-major top-left scan, packing least significant
    /// bit first, eight pixels per byte, with no per-row padding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let cells = self.width as usize * self.height as usize;
        let mut out = vec![0; cells.div_ceil(8)];
        for (i, value) in self.scan(self.rectangle(), ScanOrder::TOP_LEFT_ROWS).enumerate() {
            if value {
                out[i / 8] |= 1 << (i % 8);
            }
        }
        out
    }

    fn stride(width: i32) -> usize {
        (width.max(0) as usize).div_ceil(8)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn rectangle(&self) -> Rectangle {
        Rectangle::from(0, 0, self.width, self.height)
    }

    /// Read one pixel. Out-of-range coordinates are unset, never an error.
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return false;
        }
        let index = y as usize * Self::stride(self.width) + x as usize / 8;
        self.data[index] & (1 << (x as usize % 8)) != 0
    }

    /// Write one pixel. The bit is flipped only when the value differs, and
    /// a flip grows the dirty region to include the pixel.
    pub fn set(&mut self, x: i32, y: i32, value: bool) -> EngineResult<()> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return Err(EngineError::PixelOutOfRange {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        self.store(x, y, value);
        Ok(())
    }

    /// In-range store. Returns whether the bit actually flipped.
    fn store(&mut self, x: i32, y: i32, value: bool) -> bool {
        let index = y as usize * Self::stride(self.width) + x as usize / 8;
        let mask = 1u8 << (x as usize % 8);
        let current = self.data[index] & mask != 0;
        if current == value {
            return false;
        }
        if value {
            self.data[index] |= mask;
        } else {
            self.data[index] &= !mask;
        }
        self.dirty.mark(x, y);
        true
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.dirty
    }

    /// Bounding rectangle of all flips since the last reset, or `None` when
    /// nothing changed.
    pub fn dirty_bounds(&self) -> Option<Rectangle> {
        self.dirty.bounds()
    }

    pub fn reset_dirty(&mut self) {
        self.dirty = DirtyRegion::CLEAN;
    }

    pub(crate) fn mark_all_dirty(&mut self) {
        self.dirty.mark_rect(self.rectangle());
    }

    /// Resize the grid, consulting `rule` for both dimensions. On success
    /// the overlapping sub-rectangle is copied bit for bit, the remainder is
    /// unset, and the whole new extent is marked dirty. On failure the grid
    /// is left untouched.
    pub fn resize(&mut self, size: impl Into<Size>, rule: &dyn SizeRule) -> EngineResult<()> {
        let size = size.into();
        if size.width < 0 || size.height < 0 {
            return Err(EngineError::NegativeSize {
                width: size.width,
                height: size.height,
            });
        }
        if !rule.accepts_width(size.width) {
            return Err(EngineError::WidthRejected { width: size.width });
        }
        if !rule.accepts_height(size.height) {
            return Err(EngineError::HeightRejected { height: size.height });
        }

        let stride = Self::stride(size.width);
        let mut data = vec![0u8; stride * size.height as usize];
        for y in 0..size.height.min(self.height) {
            for x in 0..size.width.min(self.width) {
                if self.get(x, y) {
                    data[y as usize * stride + x as usize / 8] |= 1 << (x as usize % 8);
                }
            }
        }

        self.width = size.width;
        self.height = size.height;
        self.data = data;
        self.mark_all_dirty();
        Ok(())
    }

    /// Read scan over `region` (clamped to the grid, possibly empty) in the
    /// given order.
    pub fn scan(&self, region: Rectangle, order: ScanOrder) -> GridScan<'_> {
        GridScan {
            cursor: ScanCursor::new(self.clamp(region), order),
            grid: self,
        }
    }

    /// Write scan over `region` (clamped to the grid, possibly empty) in the
    /// given order. Writes follow the same flip-only-on-change rule as
    /// [`PixelGrid::set`].
    pub fn scan_mut(&mut self, region: Rectangle, order: ScanOrder) -> GridScanMut<'_> {
        GridScanMut {
            cursor: ScanCursor::new(self.clamp(region), order),
            grid: self,
        }
    }

    fn clamp(&self, region: Rectangle) -> Rectangle {
        if region.is_empty() {
            return Rectangle::default();
        }
        self.rectangle().intersect(&region)
    }
}

impl PartialEq for PixelGrid {
    /// Two grids are equal iff width, height and the full bit pattern match.
    /// Dirty-region state does not participate.
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.data == other.data
    }
}

impl Eq for PixelGrid {}

impl Clone for PixelGrid {
    fn clone(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.clone(),
            dirty: self.dirty,
        }
    }
}

impl std::fmt::Debug for PixelGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PixelGrid({}x{})", self.width, self.height)
    }
}

impl std::fmt::Display for PixelGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = String::new();
        for y in 0..self.height {
            s.push_str(&format!("{y:2} "));
            for x in 0..self.width {
                s.push(if self.get(x, y) { '#' } else { '-' });
            }
            s.push('\n');
        }
        write!(f, "{s}---")
    }
}

/// Read cursor over a grid region.
pub struct GridScan<'a> {
    grid: &'a PixelGrid,
    cursor: ScanCursor,
}

impl GridScan<'_> {
    pub fn has_next(&self) -> bool {
        self.cursor.has_next()
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Read the next pixel and advance.
    ///
    /// # Errors
    ///
    /// Fails with `ScanExhausted` when invoked after the region ran out.
    pub fn next_value(&mut self) -> EngineResult<bool> {
        match self.cursor.advance() {
            Some(pos) => Ok(self.grid.get(pos.x, pos.y)),
            None => Err(EngineError::ScanExhausted),
        }
    }
}

impl Iterator for GridScan<'_> {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        self.cursor.advance().map(|pos| self.grid.get(pos.x, pos.y))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.cursor.remaining();
        (remaining, Some(remaining))
    }
}

/// Write cursor over a grid region.
pub struct GridScanMut<'a> {
    grid: &'a mut PixelGrid,
    cursor: ScanCursor,
}

impl GridScanMut<'_> {
    pub fn has_next(&self) -> bool {
        self.cursor.has_next()
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Write the next pixel and advance.
    ///
    /// # Errors
    ///
    /// Fails with `ScanExhausted` when invoked after the region ran out.
    pub fn write_next(&mut self, value: bool) -> EngineResult<()> {
        match self.cursor.advance() {
            Some(pos) => {
                self.grid.store(pos.x, pos.y, value);
                Ok(())
            }
            None => Err(EngineError::ScanExhausted),
        }
    }
}
