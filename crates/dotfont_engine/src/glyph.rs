use crate::{EngineError, EngineResult, FontId, GridScan, Listeners, PixelGrid, Rectangle, ScanOrder, Size, SizeRule};

/// What kind of change a glyph reported.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GlyphEventKind {
    /// A single pixel flipped.
    Pixel,
    /// The glyph's extent changed.
    Size,
    /// The whole content moved one step.
    Shift,
    /// Pixels were rewritten in place.
    Copy,
    /// The identifying code or unicode mapping changed.
    Index,
}

/// Structured mutation event, delivered synchronously to subscribers in
/// subscription order. `rect` is the affected region of the glyph.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GlyphEvent {
    pub kind: GlyphEventKind,
    pub rect: Rectangle,
}

/// Size constraints the owning font imposes on a member glyph.
///
/// This is the arena-side stand-in for a back-reference: the glyph only
/// keeps the owner's id plus the policy snapshot, and the font keeps it
/// current whenever its own policy changes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Membership {
    pub(crate) font: FontId,
    pub(crate) fixed_width: Option<i32>,
    pub(crate) height: i32,
}

impl SizeRule for Membership {
    fn accepts_width(&self, width: i32) -> bool {
        self.fixed_width.is_none_or(|fixed| fixed == width)
    }

    fn accepts_height(&self, height: i32) -> bool {
        height == self.height
    }
}

/// Compact value snapshot of one glyph, used by undo records and the
/// font-level snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphSnapshot {
    pub code: u32,
    pub unicode: Option<char>,
    pub size: Size,
    pub bits: Vec<u8>,
}

impl GlyphSnapshot {
    pub fn of(glyph: &Glyph) -> Self {
        Self {
            code: glyph.code,
            unicode: glyph.unicode,
            size: glyph.grid.size(),
            bits: glyph.grid.to_bytes(),
        }
    }

    /// Rebuild a detached glyph from this snapshot.
    pub fn to_glyph(&self) -> EngineResult<Glyph> {
        let mut glyph = Glyph::from_bytes(self.code, self.size, &self.bits)?;
        glyph.unicode = self.unicode;
        Ok(glyph)
    }
}

/// One bitmap character cell.
///
/// A glyph owns its [`PixelGrid`] and re-exposes its read side; every
/// successful mutation emits a [`GlyphEvent`]. While attached to a font the
/// font's size policy gates all structural changes.
pub struct Glyph {
    code: u32,
    unicode: Option<char>,
    grid: PixelGrid,
    owner: Option<Membership>,
    listeners: Listeners<GlyphEvent>,
}

impl Glyph {
    pub fn new(code: u32, size: impl Into<Size>) -> EngineResult<Self> {
        Ok(Self {
            code,
            unicode: None,
            grid: PixelGrid::new(size)?,
            owner: None,
            listeners: Listeners::new(),
        })
    }

    pub fn from_bytes(code: u32, size: impl Into<Size>, bytes: &[u8]) -> EngineResult<Self> {
        Ok(Self {
            code,
            unicode: None,
            grid: PixelGrid::from_bytes(size, bytes)?,
            owner: None,
            listeners: Listeners::new(),
        })
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn unicode(&self) -> Option<char> {
        self.unicode
    }

    pub fn width(&self) -> i32 {
        self.grid.width()
    }

    pub fn height(&self) -> i32 {
        self.grid.height()
    }

    pub fn size(&self) -> Size {
        self.grid.size()
    }

    pub fn rectangle(&self) -> Rectangle {
        self.grid.rectangle()
    }

    pub fn grid(&self) -> &PixelGrid {
        &self.grid
    }

    pub fn get(&self, x: i32, y: i32) -> bool {
        self.grid.get(x, y)
    }

    pub fn scan(&self, region: Rectangle, order: ScanOrder) -> GridScan<'_> {
        self.grid.scan(region, order)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.grid.to_bytes()
    }

    /// Id of the owning font, if any.
    pub fn font(&self) -> Option<FontId> {
        self.owner.map(|membership| membership.font)
    }

    pub fn is_attached(&self) -> bool {
        self.owner.is_some()
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&GlyphEvent) + Send + 'static) -> usize {
        self.listeners.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: usize) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn emit(&mut self, kind: GlyphEventKind, rect: Rectangle) {
        self.listeners.notify(&GlyphEvent { kind, rect });
    }

    /// Change the identifying code. Only possible while unattached; the
    /// order of an owning font's glyph sequence is keyed by code.
    ///
    /// # Errors
    ///
    /// `AttachedCodeChange` when the glyph belongs to a font.
    pub fn set_code(&mut self, code: u32) -> EngineResult<()> {
        if self.owner.is_some() {
            return Err(EngineError::AttachedCodeChange);
        }
        if code != self.code {
            self.code = code;
            self.emit(GlyphEventKind::Index, self.grid.rectangle());
        }
        Ok(())
    }

    pub fn set_unicode(&mut self, unicode: Option<char>) {
        if unicode != self.unicode {
            self.unicode = unicode;
            self.emit(GlyphEventKind::Index, self.grid.rectangle());
        }
    }

    /// Write one pixel. Emits `Pixel` over the cell when the value actually
    /// changed.
    pub fn set_pixel(&mut self, x: i32, y: i32, value: bool) -> EngineResult<()> {
        self.grid.reset_dirty();
        self.grid.set(x, y, value)?;
        if let Some(rect) = self.grid.dirty_bounds() {
            self.emit(GlyphEventKind::Pixel, rect);
        }
        Ok(())
    }

    /// Resize the glyph, consulting the owning font's size policy when
    /// attached. Emits `Size` over the new extent.
    pub fn resize(&mut self, size: impl Into<Size>) -> EngineResult<()> {
        let size = size.into();
        if size == self.grid.size() {
            return Ok(());
        }
        match self.owner {
            Some(rule) => self.grid.resize(size, &rule)?,
            None => self.grid.resize(size, &crate::AnySize)?,
        }
        self.emit(GlyphEventKind::Size, self.grid.rectangle());
        Ok(())
    }

    /// Font-side resize that bypasses the membership policy; used when the
    /// font itself forces a new width or height onto its members.
    pub(crate) fn force_size(&mut self, size: impl Into<Size>) -> EngineResult<()> {
        let size = size.into();
        if size == self.grid.size() {
            return Ok(());
        }
        self.grid.resize(size, &crate::AnySize)?;
        self.emit(GlyphEventKind::Size, self.grid.rectangle());
        Ok(())
    }

    pub(crate) fn set_owner(&mut self, owner: Option<Membership>) {
        self.owner = owner;
    }

    pub fn shift_left(&mut self) -> EngineResult<()> {
        let (w, h) = (self.grid.width(), self.grid.height());
        self.shift(ScanOrder::TOP_LEFT_COLUMNS, Rectangle::from(1, 0, w - 1, h))
    }

    pub fn shift_right(&mut self) -> EngineResult<()> {
        let (w, h) = (self.grid.width(), self.grid.height());
        self.shift(ScanOrder::TOP_RIGHT_COLUMNS, Rectangle::from(0, 0, w - 1, h))
    }

    pub fn shift_up(&mut self) -> EngineResult<()> {
        let (w, h) = (self.grid.width(), self.grid.height());
        self.shift(ScanOrder::TOP_LEFT_ROWS, Rectangle::from(0, 1, w, h - 1))
    }

    pub fn shift_down(&mut self) -> EngineResult<()> {
        let (w, h) = (self.grid.width(), self.grid.height());
        self.shift(ScanOrder::BOTTOM_LEFT_ROWS, Rectangle::from(0, 0, w, h - 1))
    }

    /// Move the whole content one step: the source region (offset one step
    /// in) streams into the full extent in `order`, and whatever the source
    /// does not cover is the vacated edge, which is cleared. No-op on an
    /// empty grid.
    fn shift(&mut self, order: ScanOrder, source: Rectangle) -> EngineResult<()> {
        let full = self.grid.rectangle();
        if full.is_empty() {
            return Ok(());
        }
        self.grid.reset_dirty();
        let moved: Vec<bool> = self.grid.scan(source, order).collect();
        let mut destination = self.grid.scan_mut(full, order);
        for value in moved {
            destination.write_next(value)?;
        }
        while destination.has_next() {
            destination.write_next(false)?;
        }
        self.emit(GlyphEventKind::Shift, full);
        Ok(())
    }

    /// Mirror left-right in place. Emits `Copy` over the changed region only
    /// when at least one pixel actually changed.
    pub fn reflect_horizontal(&mut self) -> EngineResult<()> {
        let (w, h) = (self.grid.width(), self.grid.height());
        self.grid.reset_dirty();
        for y in 0..h {
            for x in 0..w / 2 {
                let left = self.grid.get(x, y);
                let right = self.grid.get(w - 1 - x, y);
                if left != right {
                    self.grid.set(x, y, right)?;
                    self.grid.set(w - 1 - x, y, left)?;
                }
            }
        }
        if let Some(rect) = self.grid.dirty_bounds() {
            self.emit(GlyphEventKind::Copy, rect);
        }
        Ok(())
    }

    /// Mirror top-bottom in place. Emits `Copy` over the changed region only
    /// when at least one pixel actually changed.
    pub fn reflect_vertical(&mut self) -> EngineResult<()> {
        let (w, h) = (self.grid.width(), self.grid.height());
        self.grid.reset_dirty();
        for y in 0..h / 2 {
            for x in 0..w {
                let top = self.grid.get(x, y);
                let bottom = self.grid.get(x, h - 1 - y);
                if top != bottom {
                    self.grid.set(x, y, bottom)?;
                    self.grid.set(x, h - 1 - y, top)?;
                }
            }
        }
        if let Some(rect) = self.grid.dirty_bounds() {
            self.emit(GlyphEventKind::Copy, rect);
        }
        Ok(())
    }

    /// Remove one column. Gated by the owning font's width policy when
    /// attached (a fixed-width font forbids it); always allowed when
    /// unattached. Emits `Size`.
    pub fn remove_column(&mut self, pos: i32) -> EngineResult<()> {
        let (w, h) = (self.grid.width(), self.grid.height());
        if pos < 0 || pos >= w {
            return Err(EngineError::LineOutOfRange {
                what: "column",
                pos,
                width: w,
                height: h,
            });
        }
        if let Some(owner) = self.owner {
            if !owner.accepts_width(w - 1) {
                return Err(EngineError::WidthRejected { width: w - 1 });
            }
        }

        let mut next = PixelGrid::new((w - 1, h))?;
        blit(&self.grid, Rectangle::from(0, 0, pos, h), &mut next, Rectangle::from(0, 0, pos, h))?;
        blit(
            &self.grid,
            Rectangle::from(pos + 1, 0, w - pos - 1, h),
            &mut next,
            Rectangle::from(pos, 0, w - pos - 1, h),
        )?;
        next.mark_all_dirty();
        self.grid = next;
        self.emit(GlyphEventKind::Size, self.grid.rectangle());
        Ok(())
    }

    /// Remove one row. Gated by the owning font's height policy when
    /// attached (heights are font-wide, so any attachment forbids it);
    /// always allowed when unattached. Emits `Size`.
    pub fn remove_row(&mut self, pos: i32) -> EngineResult<()> {
        let (w, h) = (self.grid.width(), self.grid.height());
        if pos < 0 || pos >= h {
            return Err(EngineError::LineOutOfRange {
                what: "row",
                pos,
                width: w,
                height: h,
            });
        }
        if let Some(owner) = self.owner {
            if !owner.accepts_height(h - 1) {
                return Err(EngineError::HeightRejected { height: h - 1 });
            }
        }

        let mut next = PixelGrid::new((w, h - 1))?;
        blit(&self.grid, Rectangle::from(0, 0, w, pos), &mut next, Rectangle::from(0, 0, w, pos))?;
        blit(
            &self.grid,
            Rectangle::from(0, pos + 1, w, h - pos - 1),
            &mut next,
            Rectangle::from(0, pos, w, h - pos - 1),
        )?;
        next.mark_all_dirty();
        self.grid = next;
        self.emit(GlyphEventKind::Size, self.grid.rectangle());
        Ok(())
    }

    /// Overwrite this glyph's content from a snapshot taken earlier,
    /// bypassing the membership policy. Used by undo records, which only
    /// ever restore a previously valid state.
    pub(crate) fn apply_snapshot(&mut self, snapshot: &GlyphSnapshot) -> EngineResult<()> {
        let next = PixelGrid::from_bytes(snapshot.size, &snapshot.bits)?;
        if self.grid != next {
            let size_changed = next.size() != self.grid.size();
            self.grid = next;
            self.grid.mark_all_dirty();
            let kind = if size_changed { GlyphEventKind::Size } else { GlyphEventKind::Copy };
            self.emit(kind, self.grid.rectangle());
        }
        self.unicode = snapshot.unicode;
        Ok(())
    }
}

/// Copy `src_rect` of `src` onto `dst_rect` of `dst`, both walked in
/// serialization order. The regions are expected to have the same area.
fn blit(src: &PixelGrid, src_rect: Rectangle, dst: &mut PixelGrid, dst_rect: Rectangle) -> EngineResult<()> {
    let values: Vec<bool> = src.scan(src_rect, ScanOrder::TOP_LEFT_ROWS).collect();
    let mut out = dst.scan_mut(dst_rect, ScanOrder::TOP_LEFT_ROWS);
    for value in values {
        out.write_next(value)?;
    }
    Ok(())
}

impl Clone for Glyph {
    /// Clones the glyph's data, never its listeners.
    fn clone(&self) -> Self {
        Self {
            code: self.code,
            unicode: self.unicode,
            grid: self.grid.clone(),
            owner: self.owner,
            listeners: Listeners::new(),
        }
    }
}

impl PartialEq for Glyph {
    /// Code plus grid equality.
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.grid == other.grid
    }
}

impl Eq for Glyph {}

impl std::fmt::Debug for Glyph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Glyph")
            .field("code", &self.code)
            .field("unicode", &self.unicode)
            .field("size", &self.grid.size())
            .field("attached", &self.owner.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    fn events_of(glyph: &mut Glyph) -> Arc<Mutex<Vec<GlyphEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        glyph.subscribe(move |event: &GlyphEvent| sink.lock().unwrap().push(*event));
        events
    }

    fn glyph_from_rows(code: u32, rows: &[&[bool]]) -> Glyph {
        let height = rows.len() as i32;
        let width = rows.first().map_or(0, |row| row.len() as i32);
        let mut glyph = Glyph::new(code, (width, height)).unwrap();
        for (y, row) in rows.iter().enumerate() {
            for (x, value) in row.iter().enumerate() {
                glyph.set_pixel(x as i32, y as i32, *value).unwrap();
            }
        }
        glyph
    }

    fn row(glyph: &Glyph, y: i32) -> Vec<bool> {
        (0..glyph.width()).map(|x| glyph.get(x, y)).collect()
    }

    #[test]
    fn test_shift_left() {
        // Scenario: [T,F,T] becomes [F,T,F] and Shift covers the extent.
        let mut glyph = glyph_from_rows(65, &[&[true, false, true]]);
        let events = events_of(&mut glyph);

        glyph.shift_left().unwrap();

        assert_eq!(row(&glyph, 0), vec![false, true, false]);
        assert_eq!(
            *events.lock().unwrap(),
            vec![GlyphEvent {
                kind: GlyphEventKind::Shift,
                rect: Rectangle::from(0, 0, 3, 1),
            }]
        );
    }

    #[test]
    fn test_shift_right() {
        let mut glyph = glyph_from_rows(65, &[&[true, false, true]]);
        glyph.shift_right().unwrap();
        assert_eq!(row(&glyph, 0), vec![false, true, false]);
    }

    #[test]
    fn test_shift_up_down() {
        let mut glyph = glyph_from_rows(65, &[&[true, true], &[false, false], &[false, true]]);

        glyph.shift_up().unwrap();
        assert_eq!(row(&glyph, 0), vec![false, false]);
        assert_eq!(row(&glyph, 1), vec![false, true]);
        assert_eq!(row(&glyph, 2), vec![false, false]);

        glyph.shift_down().unwrap();
        assert_eq!(row(&glyph, 0), vec![false, false]);
        assert_eq!(row(&glyph, 1), vec![false, false]);
        assert_eq!(row(&glyph, 2), vec![false, true]);
    }

    #[test]
    fn test_shift_on_empty_grid_is_noop() {
        let mut glyph = Glyph::new(1, (0, 0)).unwrap();
        let events = events_of(&mut glyph);
        glyph.shift_left().unwrap();
        glyph.shift_down().unwrap();
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_reflect_horizontal() {
        let mut glyph = glyph_from_rows(65, &[&[true, true, false]]);
        let events = events_of(&mut glyph);

        glyph.reflect_horizontal().unwrap();

        assert_eq!(row(&glyph, 0), vec![false, true, true]);
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, GlyphEventKind::Copy);
    }

    #[test]
    fn test_reflect_of_symmetric_content_is_eventless() {
        let mut glyph = glyph_from_rows(65, &[&[true, false, true], &[false, true, false]]);
        let events = events_of(&mut glyph);
        glyph.reflect_horizontal().unwrap();
        assert!(events.lock().unwrap().is_empty());
        assert_eq!(row(&glyph, 0), vec![true, false, true]);
    }

    #[test]
    fn test_reflect_vertical() {
        let mut glyph = glyph_from_rows(65, &[&[true, true], &[false, false], &[false, true]]);
        glyph.reflect_vertical().unwrap();
        assert_eq!(row(&glyph, 0), vec![false, true]);
        assert_eq!(row(&glyph, 1), vec![false, false]);
        assert_eq!(row(&glyph, 2), vec![true, true]);
    }

    #[test]
    fn test_remove_column() {
        // Scenario: 3x2 rows [T,F,T] / [F,T,F]; dropping column 1 leaves
        // [T,T] / [F,F].
        let mut glyph = glyph_from_rows(65, &[&[true, false, true], &[false, true, false]]);
        let events = events_of(&mut glyph);

        glyph.remove_column(1).unwrap();

        assert_eq!(glyph.size(), Size::new(2, 2));
        assert_eq!(row(&glyph, 0), vec![true, true]);
        assert_eq!(row(&glyph, 1), vec![false, false]);
        assert_eq!(
            *events.lock().unwrap(),
            vec![GlyphEvent {
                kind: GlyphEventKind::Size,
                rect: Rectangle::from(0, 0, 2, 2),
            }]
        );
    }

    #[test]
    fn test_remove_row() {
        let mut glyph = glyph_from_rows(65, &[&[true, true], &[false, true], &[true, false]]);
        glyph.remove_row(0).unwrap();
        assert_eq!(glyph.size(), Size::new(2, 2));
        assert_eq!(row(&glyph, 0), vec![false, true]);
        assert_eq!(row(&glyph, 1), vec![true, false]);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut glyph = Glyph::new(65, (3, 2)).unwrap();
        assert!(matches!(glyph.remove_column(3), Err(EngineError::LineOutOfRange { .. })));
        assert!(matches!(glyph.remove_row(-1), Err(EngineError::LineOutOfRange { .. })));
    }

    #[test]
    fn test_set_pixel_events() {
        let mut glyph = Glyph::new(65, (4, 4)).unwrap();
        let events = events_of(&mut glyph);

        glyph.set_pixel(2, 1, true).unwrap();
        // Same value again: no flip, no event.
        glyph.set_pixel(2, 1, true).unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![GlyphEvent {
                kind: GlyphEventKind::Pixel,
                rect: Rectangle::from(2, 1, 1, 1),
            }]
        );
    }

    #[test]
    fn test_set_code_on_detached_glyph() {
        let mut glyph = Glyph::new(65, (2, 2)).unwrap();
        let events = events_of(&mut glyph);

        glyph.set_code(66).unwrap();
        glyph.set_code(66).unwrap(); // unchanged, no event

        assert_eq!(glyph.code(), 66);
        assert_eq!(events.lock().unwrap().len(), 1);
        assert_eq!(events.lock().unwrap()[0].kind, GlyphEventKind::Index);
    }

    #[test]
    fn test_set_code_on_attached_glyph_is_disallowed() {
        let mut glyph = Glyph::new(65, (2, 2)).unwrap();
        glyph.set_owner(Some(Membership {
            font: FontId::next(),
            fixed_width: None,
            height: 2,
        }));

        let err = glyph.set_code(66).unwrap_err();
        assert!(err.is_disallowed());
        assert_eq!(glyph.code(), 65);
    }

    #[test]
    fn test_membership_gates_structural_changes() {
        let mut glyph = Glyph::new(65, (4, 6)).unwrap();
        glyph.set_owner(Some(Membership {
            font: FontId::next(),
            fixed_width: Some(4),
            height: 6,
        }));

        assert!(matches!(glyph.remove_column(0), Err(EngineError::WidthRejected { width: 3 })));
        assert!(matches!(glyph.remove_row(0), Err(EngineError::HeightRejected { height: 5 })));
        assert!(matches!(glyph.resize((5, 6)), Err(EngineError::WidthRejected { width: 5 })));
        assert_eq!(glyph.size(), Size::new(4, 6));

        // Proportional membership only pins the height.
        glyph.set_owner(Some(Membership {
            font: FontId::next(),
            fixed_width: None,
            height: 6,
        }));
        glyph.remove_column(0).unwrap();
        assert_eq!(glyph.size(), Size::new(3, 6));
    }

    #[test]
    fn test_clone_drops_listeners_and_keeps_data() {
        let mut glyph = glyph_from_rows(65, &[&[true, false]]);
        let events = events_of(&mut glyph);

        let mut copy = glyph.clone();
        copy.set_pixel(1, 0, true).unwrap();

        assert!(events.lock().unwrap().is_empty());
        assert_eq!(glyph, glyph.clone());
        assert_ne!(glyph, copy);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let glyph = glyph_from_rows(65, &[&[true, false, true], &[false, true, false]]);
        let snapshot = GlyphSnapshot::of(&glyph);
        let restored = snapshot.to_glyph().unwrap();
        assert_eq!(restored, glyph);
    }
}
