use crate::{EngineError, EngineResult, Font, FontSnapshot, GlyphSnapshot};

/// Per-glyph diff inside a font-level transaction, gathered from nested
/// edits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolChange {
    pub code: u32,
    pub before: GlyphSnapshot,
    pub after: GlyphSnapshot,
}

/// One invertible edit cycle, delivered to the undo host. The record holds
/// complete before/after state, so undoing never depends on replaying
/// individual operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UndoRecord {
    Font {
        label: String,
        before: FontSnapshot,
        after: FontSnapshot,
        /// Glyphs the presentation layer announced via nested edits and
        /// that actually changed. Informational; `before`/`after` already
        /// carry the full state.
        symbols: Vec<SymbolChange>,
    },
    Symbol {
        label: String,
        code: u32,
        before: GlyphSnapshot,
        after: GlyphSnapshot,
    },
}

impl UndoRecord {
    pub fn description(&self) -> &str {
        match self {
            UndoRecord::Font { label, .. } | UndoRecord::Symbol { label, .. } => label,
        }
    }

    /// Roll the font back to the state before this edit cycle.
    pub fn undo(&self, font: &mut Font) -> EngineResult<()> {
        match self {
            UndoRecord::Font { before, .. } => font.restore(before),
            UndoRecord::Symbol { code, before, .. } => put_symbol(font, *code, before),
        }
    }

    /// Re-apply the state after this edit cycle.
    pub fn redo(&self, font: &mut Font) -> EngineResult<()> {
        match self {
            UndoRecord::Font { after, .. } => font.restore(after),
            UndoRecord::Symbol { code, after, .. } => put_symbol(font, *code, after),
        }
    }
}

fn put_symbol(font: &mut Font, code: u32, snapshot: &GlyphSnapshot) -> EngineResult<()> {
    match font.edit_glyph(code, |glyph| glyph.apply_snapshot(snapshot)) {
        Some(result) => result,
        None => Err(EngineError::GlyphNotFound { code }),
    }
}
