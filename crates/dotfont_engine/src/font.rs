use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{EngineError, EngineResult, Glyph, GlyphSnapshot, Listeners, Membership, Size};

static NEXT_FONT_ID: AtomicUsize = AtomicUsize::new(1);

/// Process-unique identity of a [`Font`]. Glyph memberships carry this id
/// instead of a reference, so ownership never forms a cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FontId(usize);

impl FontId {
    pub(crate) fn next() -> Self {
        FontId(NEXT_FONT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which font-wide metric changed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FontMetric {
    Width,
    Height,
    Fixed,
    MinWidth,
    MaxWidth,
    MarginLeft,
    MarginRight,
    Baseline,
    Ascent,
    AscentCapital,
    Descent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FontEvent {
    GlyphAdded(u32),
    GlyphReplaced(u32),
    GlyphRemoved(u32),
    /// The glyph count changed; carries the new count.
    CountChanged(usize),
    MetricChanged(FontMetric),
    /// The whole font was rebuilt from a snapshot.
    Restored,
}

/// Font-wide metrics. Every field is constrained by others; the setters on
/// [`Font`] keep the whole block consistent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontMetrics {
    pub width: i32,
    pub height: i32,
    pub fixed: bool,
    pub min_width: i32,
    pub max_width: i32,
    /// Mean glyph width, informational only.
    pub average_width: i32,
    pub margin_left: i32,
    pub margin_right: i32,
    pub baseline: i32,
    pub ascent: i32,
    pub ascent_capital: i32,
    pub descent: i32,
}

/// Descriptive properties carried by the persistence format.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FontMeta {
    pub name: String,
    pub charset: String,
    pub prototype: String,
    /// `[AUTHOR]` section key/value pairs, kept in file order.
    pub author: Vec<(String, String)>,
}

/// Deep value snapshot of a font, sufficient to rebuild it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontSnapshot {
    pub metrics: FontMetrics,
    pub meta: FontMeta,
    pub glyphs: Vec<GlyphSnapshot>,
}

/// Ordered collection of glyphs sharing one set of font-wide metrics.
///
/// The font owns its glyphs (ascending by code) and is the only place the
/// metric cascade runs: every metric setter re-derives the metrics that
/// depend on the one it changed. In fixed mode every member glyph's width
/// equals the font's width; heights are font-wide in both modes.
pub struct Font {
    id: FontId,
    pub meta: FontMeta,
    metrics: FontMetrics,
    glyphs: Vec<Glyph>,
    listeners: Listeners<FontEvent>,
}

impl Font {
    pub fn new(size: impl Into<Size>) -> EngineResult<Self> {
        let size = size.into();
        if size.width < 0 || size.height < 0 {
            return Err(EngineError::NegativeSize {
                width: size.width,
                height: size.height,
            });
        }
        Ok(Self {
            id: FontId::next(),
            meta: FontMeta::default(),
            metrics: FontMetrics {
                width: size.width,
                height: size.height,
                fixed: false,
                min_width: size.width,
                max_width: size.width,
                average_width: 0,
                margin_left: 0,
                margin_right: 0,
                baseline: size.height,
                ascent: size.height,
                ascent_capital: size.height,
                descent: 0,
            },
            glyphs: Vec::new(),
            listeners: Listeners::new(),
        })
    }

    pub fn id(&self) -> FontId {
        self.id
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub fn width(&self) -> i32 {
        self.metrics.width
    }

    pub fn height(&self) -> i32 {
        self.metrics.height
    }

    pub fn is_fixed(&self) -> bool {
        self.metrics.fixed
    }

    pub fn min_width(&self) -> i32 {
        self.metrics.min_width
    }

    pub fn max_width(&self) -> i32 {
        self.metrics.max_width
    }

    pub fn average_width(&self) -> i32 {
        self.metrics.average_width
    }

    pub fn margin_left(&self) -> i32 {
        self.metrics.margin_left
    }

    pub fn margin_right(&self) -> i32 {
        self.metrics.margin_right
    }

    pub fn baseline(&self) -> i32 {
        self.metrics.baseline
    }

    pub fn ascent(&self) -> i32 {
        self.metrics.ascent
    }

    pub fn ascent_capital(&self) -> i32 {
        self.metrics.ascent_capital
    }

    pub fn descent(&self) -> i32 {
        self.metrics.descent
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    /// Look up a glyph by code (linear scan of the ordered sequence).
    pub fn glyph(&self, code: u32) -> Option<&Glyph> {
        self.glyphs.iter().find(|glyph| glyph.code() == code)
    }

    /// Look up a glyph by its position in code order.
    pub fn glyph_at(&self, ordinal: usize) -> Option<&Glyph> {
        self.glyphs.get(ordinal)
    }

    /// Identity check: does this glyph's membership point at this font?
    pub fn contains(&self, glyph: &Glyph) -> bool {
        glyph.font() == Some(self.id)
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&FontEvent) + Send + 'static) -> usize {
        self.listeners.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: usize) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn membership(&self) -> Membership {
        Membership {
            font: self.id,
            fixed_width: self.metrics.fixed.then_some(self.metrics.width),
            height: self.metrics.height,
        }
    }

    fn sync_memberships(&mut self) {
        let membership = self.membership();
        for glyph in &mut self.glyphs {
            glyph.set_owner(Some(membership));
        }
    }

    /// Attach a glyph. Its height is forced to the font's height and, in
    /// fixed mode, its width to the font's width. A resident glyph with the
    /// same code is detached and returned (one attach, one detach).
    ///
    /// # Errors
    ///
    /// `GlyphAlreadyAttached` when the glyph still belongs to a font.
    pub fn add(&mut self, mut glyph: Glyph) -> EngineResult<Option<Glyph>> {
        if glyph.is_attached() {
            return Err(EngineError::GlyphAlreadyAttached { code: glyph.code() });
        }

        let width = if self.metrics.fixed { self.metrics.width } else { glyph.width() };
        glyph.force_size((width, self.metrics.height))?;
        glyph.set_owner(Some(self.membership()));

        let code = glyph.code();
        let at = self.glyphs.iter().position(|resident| resident.code() >= code);
        let displaced = match at {
            Some(index) if self.glyphs[index].code() == code => {
                let mut old = std::mem::replace(&mut self.glyphs[index], glyph);
                old.set_owner(None);
                self.listeners.notify(&FontEvent::GlyphReplaced(code));
                Some(old)
            }
            Some(index) => {
                self.glyphs.insert(index, glyph);
                None
            }
            None => {
                self.glyphs.push(glyph);
                None
            }
        };
        if displaced.is_none() {
            self.listeners.notify(&FontEvent::GlyphAdded(code));
            let count = self.glyphs.len();
            self.listeners.notify(&FontEvent::CountChanged(count));
        }

        self.refresh_width_stats();
        Ok(displaced)
    }

    /// Detach and return the glyph with this code.
    pub fn remove(&mut self, code: u32) -> Option<Glyph> {
        let index = self.glyphs.iter().position(|glyph| glyph.code() == code)?;
        let mut glyph = self.glyphs.remove(index);
        glyph.set_owner(None);
        self.listeners.notify(&FontEvent::GlyphRemoved(code));
        let count = self.glyphs.len();
        self.listeners.notify(&FontEvent::CountChanged(count));
        self.refresh_width_stats();
        Some(glyph)
    }

    /// Detach every glyph.
    pub fn remove_all(&mut self) {
        if self.glyphs.is_empty() {
            return;
        }
        for glyph in self.glyphs.drain(..) {
            self.listeners.notify(&FontEvent::GlyphRemoved(glyph.code()));
        }
        self.listeners.notify(&FontEvent::CountChanged(0));
        self.refresh_width_stats();
    }

    /// Run a closure against one glyph. Width statistics and the margin
    /// cascade are re-derived afterwards, so per-glyph width changes in a
    /// proportional font can never leave stale statistics behind.
    pub fn edit_glyph<R>(&mut self, code: u32, edit: impl FnOnce(&mut Glyph) -> R) -> Option<R> {
        let index = self.glyphs.iter().position(|glyph| glyph.code() == code)?;
        let result = edit(&mut self.glyphs[index]);
        self.refresh_width_stats();
        Some(result)
    }

    /// Switch between fixed and proportional width mode. Only the
    /// false-to-true transition reshapes glyphs: the current maximum glyph
    /// width is captured and forced onto the whole population.
    pub fn set_fixed(&mut self, fixed: bool) -> EngineResult<()> {
        if fixed == self.metrics.fixed {
            return Ok(());
        }
        self.metrics.fixed = fixed;
        if fixed {
            let target = self.glyphs.iter().map(Glyph::width).max().unwrap_or(self.metrics.width);
            let height = self.metrics.height;
            for glyph in &mut self.glyphs {
                glyph.force_size((target, height))?;
            }
            self.store_metric(FontMetric::Width, target);
            self.sync_memberships();
            self.refresh_width_stats();
        } else {
            self.sync_memberships();
        }
        self.listeners.notify(&FontEvent::MetricChanged(FontMetric::Fixed));
        Ok(())
    }

    /// Set the font width. Fixed mode forces it onto every glyph; in
    /// proportional mode it is the nominal width for new glyphs and the
    /// width statistics are rescanned. The margin cascade always re-runs.
    ///
    /// # Errors
    ///
    /// `NegativeMetric` for a negative width.
    pub fn set_width(&mut self, width: i32) -> EngineResult<()> {
        if width < 0 {
            return Err(EngineError::NegativeMetric { metric: "width", value: width });
        }
        if self.metrics.fixed {
            if width != self.metrics.width {
                let height = self.metrics.height;
                for glyph in &mut self.glyphs {
                    glyph.force_size((width, height))?;
                }
                self.store_metric(FontMetric::Width, width);
                self.sync_memberships();
            }
            self.store_metric(FontMetric::MinWidth, width);
            self.store_metric(FontMetric::MaxWidth, width);
            self.apply_margin_cascade();
        } else {
            self.store_metric(FontMetric::Width, width);
            self.refresh_width_stats();
        }
        Ok(())
    }

    /// Set the font height; it is forced onto every glyph. The baseline
    /// cascade always re-runs.
    ///
    /// # Errors
    ///
    /// `NegativeMetric` for a negative height.
    pub fn set_height(&mut self, height: i32) -> EngineResult<()> {
        if height < 0 {
            return Err(EngineError::NegativeMetric { metric: "height", value: height });
        }
        if height != self.metrics.height {
            for glyph in &mut self.glyphs {
                let width = glyph.width();
                glyph.force_size((width, height))?;
            }
            self.store_metric(FontMetric::Height, height);
            self.sync_memberships();
        }
        self.apply_baseline_cascade();
        Ok(())
    }

    pub fn set_margin_left(&mut self, margin: i32) {
        let max = self.metrics.min_width * 3 / 10;
        self.store_metric(FontMetric::MarginLeft, margin.clamp(0, max));
    }

    pub fn set_margin_right(&mut self, margin: i32) {
        let max = self.metrics.min_width * 3 / 10;
        self.store_metric(FontMetric::MarginRight, margin.clamp(0, max));
    }

    /// Set the baseline, clamped into `[ceil(0.6 * height), height]`. The
    /// ascent and descent cascades re-run afterwards.
    ///
    /// # Errors
    ///
    /// `NegativeMetric` for a negative baseline.
    pub fn set_baseline(&mut self, baseline: i32) -> EngineResult<()> {
        if baseline < 0 {
            return Err(EngineError::NegativeMetric {
                metric: "baseline",
                value: baseline,
            });
        }
        let low = (self.metrics.height * 6 + 9) / 10;
        self.store_metric(FontMetric::Baseline, baseline.clamp(low, self.metrics.height));
        self.apply_ascent_cascade();
        self.apply_descent_cascade();
        Ok(())
    }

    /// Set the ascent, clamped into `[ceil(baseline / 2), baseline]`. The
    /// ascent-capital cascade re-runs afterwards.
    pub fn set_ascent(&mut self, ascent: i32) {
        let low = (self.metrics.baseline + 1) / 2;
        self.store_metric(FontMetric::Ascent, ascent.clamp(low, self.metrics.baseline));
        self.apply_ascent_capital_cascade();
    }

    /// Set the capital ascent, clamped into `[0, ascent]`.
    pub fn set_ascent_capital(&mut self, ascent_capital: i32) {
        self.store_metric(FontMetric::AscentCapital, ascent_capital.clamp(0, self.metrics.ascent));
    }

    /// Set the descent, clamped into `[0, height - baseline]`.
    pub fn set_descent(&mut self, descent: i32) {
        self.store_metric(FontMetric::Descent, descent.clamp(0, self.metrics.height - self.metrics.baseline));
    }

    fn apply_margin_cascade(&mut self) {
        let max = self.metrics.min_width * 3 / 10;
        self.store_metric(FontMetric::MarginLeft, self.metrics.margin_left.clamp(0, max));
        self.store_metric(FontMetric::MarginRight, self.metrics.margin_right.clamp(0, max));
    }

    fn apply_baseline_cascade(&mut self) {
        let low = (self.metrics.height * 6 + 9) / 10;
        self.store_metric(FontMetric::Baseline, self.metrics.baseline.clamp(low, self.metrics.height));
        self.apply_ascent_cascade();
        self.apply_descent_cascade();
    }

    fn apply_ascent_cascade(&mut self) {
        let low = (self.metrics.baseline + 1) / 2;
        self.store_metric(FontMetric::Ascent, self.metrics.ascent.clamp(low, self.metrics.baseline));
        self.apply_ascent_capital_cascade();
    }

    fn apply_ascent_capital_cascade(&mut self) {
        self.store_metric(FontMetric::AscentCapital, self.metrics.ascent_capital.clamp(0, self.metrics.ascent));
    }

    fn apply_descent_cascade(&mut self) {
        self.store_metric(FontMetric::Descent, self.metrics.descent.clamp(0, self.metrics.height - self.metrics.baseline));
    }

    /// Re-derive min/max/average width from the glyph population (the
    /// nominal width when empty), then re-clamp the margins against the new
    /// minimum.
    fn refresh_width_stats(&mut self) {
        let (min, max, average) = if self.glyphs.is_empty() {
            (self.metrics.width, self.metrics.width, 0)
        } else {
            let mut min = i32::MAX;
            let mut max = 0;
            let mut sum: i64 = 0;
            for glyph in &self.glyphs {
                let width = glyph.width();
                min = min.min(width);
                max = max.max(width);
                sum += i64::from(width);
            }
            (min, max, (sum / self.glyphs.len() as i64) as i32)
        };
        self.store_metric(FontMetric::MinWidth, min);
        self.store_metric(FontMetric::MaxWidth, max);
        self.metrics.average_width = average;
        self.apply_margin_cascade();
    }

    fn store_metric(&mut self, metric: FontMetric, value: i32) {
        let changed = {
            let slot = match metric {
                FontMetric::Width => &mut self.metrics.width,
                FontMetric::Height => &mut self.metrics.height,
                FontMetric::MinWidth => &mut self.metrics.min_width,
                FontMetric::MaxWidth => &mut self.metrics.max_width,
                FontMetric::MarginLeft => &mut self.metrics.margin_left,
                FontMetric::MarginRight => &mut self.metrics.margin_right,
                FontMetric::Baseline => &mut self.metrics.baseline,
                FontMetric::Ascent => &mut self.metrics.ascent,
                FontMetric::AscentCapital => &mut self.metrics.ascent_capital,
                FontMetric::Descent => &mut self.metrics.descent,
                FontMetric::Fixed => unreachable!("fixed is not an i32 metric"),
            };
            if *slot == value {
                false
            } else {
                *slot = value;
                true
            }
        };
        if changed {
            self.listeners.notify(&FontEvent::MetricChanged(metric));
        }
    }

    pub fn snapshot(&self) -> FontSnapshot {
        FontSnapshot {
            metrics: self.metrics.clone(),
            meta: self.meta.clone(),
            glyphs: self.glyphs.iter().map(GlyphSnapshot::of).collect(),
        }
    }

    /// Rebuild the font in place from a snapshot. Listeners survive; a
    /// single `Restored` event is fired.
    pub fn restore(&mut self, snapshot: &FontSnapshot) -> EngineResult<()> {
        let mut glyphs = Vec::with_capacity(snapshot.glyphs.len());
        for glyph_snapshot in &snapshot.glyphs {
            glyphs.push(glyph_snapshot.to_glyph()?);
        }
        self.metrics = snapshot.metrics.clone();
        self.meta = snapshot.meta.clone();
        self.glyphs = glyphs;
        self.sync_memberships();
        self.listeners.notify(&FontEvent::Restored);
        Ok(())
    }
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("id", &self.id)
            .field("name", &self.meta.name)
            .field("size", &Size::new(self.metrics.width, self.metrics.height))
            .field("fixed", &self.metrics.fixed)
            .field("glyphs", &self.glyphs.len())
            .finish()
    }
}
