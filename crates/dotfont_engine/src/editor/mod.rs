//! Edit-session plumbing: groups a sequence of font/glyph mutations into one
//! undoable transaction.

mod undo_record;
pub use undo_record::*;

use crate::{Font, FontId, FontSnapshot, GlyphSnapshot};

enum SessionState {
    Idle,
    FontOpen {
        label: String,
        font: FontId,
        before: FontSnapshot,
        nested: Vec<(u32, GlyphSnapshot)>,
    },
    SymbolOpen {
        label: String,
        font: FontId,
        code: u32,
        before: GlyphSnapshot,
    },
}

/// Groups mutations into undoable transactions.
///
/// At most one transaction is open at a time, either font-scoped (optionally
/// with nested glyph sub-edits) or scoped to a single glyph. Ending a
/// session diffs the opening snapshot against the current state and hands
/// the undo host exactly one [`UndoRecord`] iff anything changed. A
/// font-level operation that cascades into many per-glyph mutations (e.g.
/// a height change) collapses into one record this way.
pub struct EditSession {
    state: SessionState,
    sink: Box<dyn FnMut(UndoRecord) + Send>,
}

impl EditSession {
    /// `sink` is the undo host; it receives at most one record per edit
    /// cycle.
    pub fn new(sink: impl FnMut(UndoRecord) + Send + 'static) -> Self {
        Self {
            state: SessionState::Idle,
            sink: Box::new(sink),
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, SessionState::Idle)
    }

    /// Open a font-scoped transaction, finalizing any open session first.
    pub fn font_edit(&mut self, label: impl Into<String>, font: &Font) {
        self.end_edit(font);
        self.state = SessionState::FontOpen {
            label: label.into(),
            font: font.id(),
            before: font.snapshot(),
            nested: Vec::new(),
        };
    }

    /// Open a transaction scoped to one glyph, finalizing any open session
    /// first. A code the font does not contain leaves the session idle.
    pub fn symbol_edit(&mut self, label: impl Into<String>, font: &Font, code: u32) {
        self.end_edit(font);
        let Some(glyph) = font.glyph(code) else {
            return;
        };
        self.state = SessionState::SymbolOpen {
            label: label.into(),
            font: font.id(),
            code,
            before: GlyphSnapshot::of(glyph),
        };
    }

    /// Fold a per-glyph before-snapshot into the open font transaction.
    /// Only meaningful while a font edit is open; the first capture of a
    /// code wins.
    pub fn nested_edit(&mut self, font: &Font, code: u32) {
        let SessionState::FontOpen {
            font: tracked, nested, ..
        } = &mut self.state
        else {
            return;
        };
        if *tracked != font.id() {
            log::warn!("nested edit against a different font, ignoring");
            return;
        }
        let Some(glyph) = font.glyph(code) else {
            return;
        };
        if nested.iter().any(|(captured, _)| *captured == code) {
            return;
        }
        nested.push((code, GlyphSnapshot::of(glyph)));
    }

    /// Finalize whichever transaction is open. Emits exactly one undo
    /// record iff the state diff is non-empty; the session is idle
    /// afterwards either way.
    pub fn end_edit(&mut self, font: &Font) {
        let state = std::mem::replace(&mut self.state, SessionState::Idle);
        match state {
            SessionState::Idle => {}
            SessionState::FontOpen {
                label,
                font: tracked,
                before,
                nested,
            } => {
                if tracked != font.id() {
                    log::warn!("ending a font edit against a different font, dropping it");
                    return;
                }
                let after = font.snapshot();
                if after == before {
                    return;
                }
                let symbols = nested
                    .into_iter()
                    .filter_map(|(code, captured)| {
                        let current = after.glyphs.iter().find(|glyph| glyph.code == code)?;
                        if *current == captured {
                            None
                        } else {
                            Some(SymbolChange {
                                code,
                                before: captured,
                                after: current.clone(),
                            })
                        }
                    })
                    .collect();
                (self.sink)(UndoRecord::Font { label, before, after, symbols });
            }
            SessionState::SymbolOpen {
                label,
                font: tracked,
                code,
                before,
            } => {
                if tracked != font.id() {
                    log::warn!("ending a symbol edit against a different font, dropping it");
                    return;
                }
                let Some(glyph) = font.glyph(code) else {
                    log::warn!("glyph {code} vanished during a symbol edit, dropping it");
                    return;
                };
                let after = GlyphSnapshot::of(glyph);
                if after == before {
                    return;
                }
                (self.sink)(UndoRecord::Symbol { label, code, before, after });
            }
        }
    }
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            SessionState::Idle => "Idle",
            SessionState::FontOpen { .. } => "FontOpen",
            SessionState::SymbolOpen { .. } => "SymbolOpen",
        };
        write!(f, "EditSession({state})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Glyph;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    fn session() -> (EditSession, Arc<Mutex<Vec<UndoRecord>>>) {
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = records.clone();
        let session = EditSession::new(move |record| sink.lock().unwrap().push(record));
        (session, records)
    }

    fn demo_font() -> Font {
        let mut font = Font::new((8, 8)).unwrap();
        for code in [65, 66, 67] {
            font.add(Glyph::new(code, (8, 8)).unwrap()).unwrap();
        }
        font
    }

    #[test]
    fn test_font_edit_collapses_into_one_record() {
        // Scenario: one font transaction around three glyph mutations plus a
        // font-level change produces exactly one undo notification whose
        // payload recovers everything.
        let mut font = demo_font();
        let original = font.snapshot();
        let (mut session, records) = session();

        session.font_edit("resize", &font);
        for code in [65, 66, 67] {
            session.nested_edit(&font, code);
            font.edit_glyph(code, |glyph| glyph.set_pixel(0, 0, true)).unwrap().unwrap();
        }
        font.set_height(10).unwrap();
        session.end_edit(&font);

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.description(), "resize");
        match record {
            UndoRecord::Font { symbols, .. } => assert_eq!(symbols.iter().map(|change| change.code).collect::<Vec<_>>(), vec![65, 66, 67]),
            UndoRecord::Symbol { .. } => panic!("expected a font-scoped record"),
        }

        let mut check = Font::new((1, 1)).unwrap();
        check.restore(&font.snapshot()).unwrap();
        record.undo(&mut check).unwrap();
        assert_eq!(check.snapshot(), original);
        record.redo(&mut check).unwrap();
        assert_eq!(check.snapshot(), font.snapshot());
    }

    #[test]
    fn test_empty_diff_emits_nothing() {
        let font = demo_font();
        let (mut session, records) = session();

        session.font_edit("noop", &font);
        session.end_edit(&font);
        assert!(records.lock().unwrap().is_empty());
        assert!(!session.is_open());
    }

    #[test]
    fn test_symbol_edit_round_trip() {
        let mut font = demo_font();
        let (mut session, records) = session();

        session.symbol_edit("paint", &font, 66);
        font.edit_glyph(66, |glyph| glyph.set_pixel(3, 3, true)).unwrap().unwrap();
        session.end_edit(&font);

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!(matches!(record, UndoRecord::Symbol { code: 66, .. }));

        record.undo(&mut font).unwrap();
        assert!(!font.glyph(66).unwrap().get(3, 3));
        record.redo(&mut font).unwrap();
        assert!(font.glyph(66).unwrap().get(3, 3));
    }

    #[test]
    fn test_symbol_edit_for_unknown_code_stays_idle() {
        let font = demo_font();
        let (mut session, _) = session();
        session.symbol_edit("ghost", &font, 999);
        assert!(!session.is_open());
    }

    #[test]
    fn test_opening_finalizes_previous_session() {
        let mut font = demo_font();
        let (mut session, records) = session();

        session.symbol_edit("first", &font, 65);
        font.edit_glyph(65, |glyph| glyph.set_pixel(0, 0, true)).unwrap().unwrap();
        // Opening the next session must flush the pending one.
        session.font_edit("second", &font);
        session.end_edit(&font);

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description(), "first");
    }

    #[test]
    fn test_nested_edit_outside_font_scope_is_noop() {
        let mut font = demo_font();
        let (mut session, records) = session();

        session.nested_edit(&font, 65);
        assert!(!session.is_open());

        session.symbol_edit("paint", &font, 65);
        session.nested_edit(&font, 66);
        font.edit_glyph(65, |glyph| glyph.set_pixel(0, 0, true)).unwrap().unwrap();
        session.end_edit(&font);

        assert!(matches!(&records.lock().unwrap()[0], UndoRecord::Symbol { .. }));
    }

    #[test]
    fn test_mismatched_font_is_ignored() {
        let mut font = demo_font();
        let other = demo_font();
        let (mut session, records) = session();

        session.font_edit("edit", &font);
        session.nested_edit(&other, 65);
        font.edit_glyph(65, |glyph| glyph.set_pixel(0, 0, true)).unwrap().unwrap();
        session.end_edit(&other);
        assert!(records.lock().unwrap().is_empty());
        assert!(!session.is_open());
    }

    #[test]
    fn test_unchanged_nested_glyphs_are_dropped_from_record() {
        let mut font = demo_font();
        let (mut session, records) = session();

        session.font_edit("touch one", &font);
        session.nested_edit(&font, 65);
        session.nested_edit(&font, 66);
        font.edit_glyph(66, |glyph| glyph.set_pixel(1, 1, true)).unwrap().unwrap();
        session.end_edit(&font);

        match &records.lock().unwrap()[0] {
            UndoRecord::Font { symbols, .. } => {
                assert_eq!(symbols.len(), 1);
                assert_eq!(symbols[0].code, 66);
            }
            UndoRecord::Symbol { .. } => panic!("expected a font-scoped record"),
        };
    }
}
