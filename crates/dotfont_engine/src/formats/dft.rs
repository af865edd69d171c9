//! The native line-oriented text format (.dft).
//!
//! Three sections, `key = value` pairs: `[AUTHOR]` with free-form pairs,
//! `[INFO]` with the font-wide metrics (`fixsed` is the historical spelling
//! and is kept as the wire format), `[SYMBOLS]` with one block per glyph.
//! A symbol block is an optional `index` (previous index + 1 when absent),
//! an optional `width` (meaningful only for proportional fonts) and a
//! mandatory `bytes` line of space-separated hex octets in the grid's
//! LSB-first packing. `width` and `height` must be declared before the
//! first symbol block.
//!
//! Loading is all-or-nothing: the file parses completely into intermediate
//! blocks before any font is built, so a malformed file never leaves a
//! half-populated font behind.

use std::{fs, path::Path};

use crate::{EngineError, EngineResult, Font, FontMeta, Glyph};

#[derive(Copy, Clone, PartialEq)]
enum Section {
    Preamble,
    Author,
    Info,
    Symbols,
    Unknown,
}

#[derive(Default)]
struct InfoBlock {
    width: Option<i32>,
    height: Option<i32>,
    fixed: bool,
    baseline: Option<i32>,
    ascent: Option<i32>,
    ascent_capital: Option<i32>,
    descent: Option<i32>,
    left_margin: Option<i32>,
    right_margin: Option<i32>,
    name: String,
    charset: String,
    prototype: String,
}

struct SymbolRecord {
    code: u32,
    width: Option<i32>,
    bytes: Vec<u8>,
    line: usize,
}

#[derive(Default)]
struct PendingSymbol {
    index: Option<u32>,
    width: Option<i32>,
    line: usize,
}

impl PendingSymbol {
    fn is_empty(&self) -> bool {
        self.index.is_none() && self.width.is_none()
    }
}

fn parse_number(line: usize, key: &str, value: &str) -> EngineResult<i32> {
    value
        .parse()
        .map_err(|_| EngineError::malformed(line, format!("invalid number for '{key}': '{value}'")))
}

fn parse_flag(line: usize, key: &str, value: &str) -> EngineResult<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(EngineError::malformed(line, format!("invalid flag for '{key}': '{value}'"))),
    }
}

fn parse_octets(line: usize, value: &str) -> EngineResult<Vec<u8>> {
    value
        .split_whitespace()
        .map(|token| u8::from_str_radix(token, 16).map_err(|_| EngineError::malformed(line, format!("invalid hex octet '{token}'"))))
        .collect()
}

/// Parse a font from its text form.
///
/// # Errors
///
/// Fails on missing `width`/`height` declarations, unknown sections are
/// tolerated but structural problems (key-less lines, bad numbers, bad hex,
/// a symbol block without `bytes`) abort the load before a font is built.
pub fn parse_font(text: &str) -> EngineResult<Font> {
    let mut section = Section::Preamble;
    let mut info = InfoBlock::default();
    let mut author = Vec::new();
    let mut symbols: Vec<SymbolRecord> = Vec::new();
    let mut pending = PendingSymbol::default();
    let mut next_code = 0u32;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if trimmed.starts_with('[') {
            section = match trimmed {
                "[AUTHOR]" => Section::Author,
                "[INFO]" => Section::Info,
                "[SYMBOLS]" => {
                    if info.width.is_none() {
                        return Err(EngineError::MissingDeclaration { key: "width" });
                    }
                    if info.height.is_none() {
                        return Err(EngineError::MissingDeclaration { key: "height" });
                    }
                    Section::Symbols
                }
                _ => {
                    log::warn!("unknown section {trimmed} on line {line}, skipping");
                    Section::Unknown
                }
            };
            continue;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(EngineError::malformed(line, format!("expected 'key = value', got '{trimmed}'")));
        };
        let key = key.trim();
        let value = value.trim();

        match section {
            Section::Preamble => {
                return Err(EngineError::malformed(line, format!("'{key}' appears before the first section header")));
            }
            Section::Unknown => {}
            Section::Author => author.push((key.to_string(), value.to_string())),
            Section::Info => match key {
                "width" => info.width = Some(parse_number(line, key, value)?),
                "height" => info.height = Some(parse_number(line, key, value)?),
                "fixsed" => info.fixed = parse_flag(line, key, value)?,
                "baseline" => info.baseline = Some(parse_number(line, key, value)?),
                "ascent" => info.ascent = Some(parse_number(line, key, value)?),
                "ascentCapital" => info.ascent_capital = Some(parse_number(line, key, value)?),
                "descent" => info.descent = Some(parse_number(line, key, value)?),
                "leftMargin" => info.left_margin = Some(parse_number(line, key, value)?),
                "rightMargin" => info.right_margin = Some(parse_number(line, key, value)?),
                "name" => info.name = value.to_string(),
                "charset" => info.charset = value.to_string(),
                "prototype" => info.prototype = value.to_string(),
                _ => log::warn!("unknown [INFO] key '{key}' on line {line}, skipping"),
            },
            Section::Symbols => match key {
                "index" => {
                    if pending.index.is_some() {
                        return Err(EngineError::malformed(line, "symbol block is missing its 'bytes' line"));
                    }
                    if pending.is_empty() {
                        pending.line = line;
                    }
                    pending.index = Some(
                        value
                            .parse::<u32>()
                            .map_err(|_| EngineError::malformed(line, format!("invalid symbol index '{value}'")))?,
                    );
                }
                "width" => {
                    if pending.width.is_some() {
                        return Err(EngineError::malformed(line, "symbol block is missing its 'bytes' line"));
                    }
                    if pending.is_empty() {
                        pending.line = line;
                    }
                    pending.width = Some(parse_number(line, key, value)?);
                }
                "bytes" => {
                    let code = pending.index.unwrap_or(next_code);
                    symbols.push(SymbolRecord {
                        code,
                        width: pending.width,
                        bytes: parse_octets(line, value)?,
                        line,
                    });
                    next_code = code + 1;
                    pending = PendingSymbol::default();
                }
                _ => log::warn!("unknown [SYMBOLS] key '{key}' on line {line}, skipping"),
            },
        }
    }

    if !pending.is_empty() {
        return Err(EngineError::malformed(pending.line, "symbol block is missing its 'bytes' line"));
    }
    let Some(width) = info.width else {
        return Err(EngineError::MissingDeclaration { key: "width" });
    };
    let Some(height) = info.height else {
        return Err(EngineError::MissingDeclaration { key: "height" });
    };

    let mut font = Font::new((width, height))?;
    font.meta = FontMeta {
        name: info.name,
        charset: info.charset,
        prototype: info.prototype,
        author,
    };
    font.set_fixed(info.fixed)?;

    for record in symbols {
        let glyph_width = if info.fixed { width } else { record.width.unwrap_or(width) };
        let glyph = Glyph::from_bytes(record.code, (glyph_width, height), &record.bytes)
            .map_err(|err| EngineError::malformed(record.line, format!("symbol {}: {err}", record.code)))?;
        if font.add(glyph)?.is_some() {
            log::warn!("duplicate symbol {} replaced an earlier block", record.code);
        }
    }

    if let Some(baseline) = info.baseline {
        font.set_baseline(baseline)?;
    }
    if let Some(ascent) = info.ascent {
        font.set_ascent(ascent);
    }
    if let Some(ascent_capital) = info.ascent_capital {
        font.set_ascent_capital(ascent_capital);
    }
    if let Some(descent) = info.descent {
        font.set_descent(descent);
    }
    if let Some(margin) = info.left_margin {
        font.set_margin_left(margin);
    }
    if let Some(margin) = info.right_margin {
        font.set_margin_right(margin);
    }
    Ok(font)
}

/// Write a font to its text form. The writer is deterministic, so
/// save/load/save round trips byte for byte.
pub fn encode_font(font: &Font) -> String {
    let mut out = String::new();

    out.push_str("[AUTHOR]\n");
    for (key, value) in &font.meta.author {
        out.push_str(&format!("{key} = {value}\n"));
    }
    out.push('\n');

    out.push_str("[INFO]\n");
    out.push_str(&format!("name = {}\n", font.meta.name));
    out.push_str(&format!("charset = {}\n", font.meta.charset));
    out.push_str(&format!("prototype = {}\n", font.meta.prototype));
    out.push_str(&format!("width = {}\n", font.width()));
    out.push_str(&format!("height = {}\n", font.height()));
    out.push_str(&format!("fixsed = {}\n", font.is_fixed()));
    out.push_str(&format!("baseline = {}\n", font.baseline()));
    out.push_str(&format!("ascent = {}\n", font.ascent()));
    out.push_str(&format!("ascentCapital = {}\n", font.ascent_capital()));
    out.push_str(&format!("descent = {}\n", font.descent()));
    out.push_str(&format!("leftMargin = {}\n", font.margin_left()));
    out.push_str(&format!("rightMargin = {}\n", font.margin_right()));
    out.push('\n');

    out.push_str("[SYMBOLS]\n");
    for glyph in font.glyphs() {
        out.push_str(&format!("index = {}\n", glyph.code()));
        if !font.is_fixed() {
            out.push_str(&format!("width = {}\n", glyph.width()));
        }
        let octets: Vec<String> = glyph.to_bytes().iter().map(|byte| format!("{byte:02x}")).collect();
        out.push_str(&format!("bytes = {}\n", octets.join(" ")));
    }
    out
}

/// Load a font from a file.
pub fn load_font(path: &Path) -> EngineResult<Font> {
    let text = fs::read_to_string(path)?;
    parse_font(&text)
}

/// Save a font to a file.
pub fn save_font(font: &Font, path: &Path) -> EngineResult<()> {
    fs::write(path, encode_font(font))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SMALL_FONT: &str = "\
[INFO]
name = small
width = 8
height = 2
fixsed = false
baseline = 2

[SYMBOLS]
index = 65
bytes = 81 7e
width = 4
bytes = 0f
";

    #[test]
    fn test_parse_small_font() {
        let font = parse_font(SMALL_FONT).unwrap();
        assert_eq!(font.meta.name, "small");
        assert_eq!(font.width(), 8);
        assert_eq!(font.height(), 2);
        assert!(!font.is_fixed());
        assert_eq!(font.baseline(), 2);
        assert_eq!(font.len(), 2);

        let a = font.glyph(65).unwrap();
        assert_eq!(a.width(), 8);
        assert_eq!(a.to_bytes(), vec![0x81, 0x7e]);

        // Implicit index: previous + 1, with its own width.
        let b = font.glyph(66).unwrap();
        assert_eq!(b.width(), 4);
        assert_eq!(b.to_bytes(), vec![0x0f]);
    }

    #[test]
    fn test_missing_width_is_rejected_before_symbols() {
        let text = "[INFO]\nheight = 8\n\n[SYMBOLS]\nbytes = 00\n";
        assert!(matches!(parse_font(text), Err(EngineError::MissingDeclaration { key: "width" })));

        let text = "[INFO]\nwidth = 8\n\n[SYMBOLS]\nbytes = 00\n";
        assert!(matches!(parse_font(text), Err(EngineError::MissingDeclaration { key: "height" })));

        // No symbols at all still needs the dimensions.
        assert!(matches!(parse_font("[INFO]\nname = x\n"), Err(EngineError::MissingDeclaration { .. })));
    }

    #[test]
    fn test_malformed_numbers_and_octets() {
        let text = "[INFO]\nwidth = eight\n";
        assert!(matches!(parse_font(text), Err(EngineError::MalformedFontFile { line: 2, .. })));

        let text = "[INFO]\nwidth = 8\nheight = 1\n\n[SYMBOLS]\nbytes = zz\n";
        assert!(matches!(parse_font(text), Err(EngineError::MalformedFontFile { line: 6, .. })));
    }

    #[test]
    fn test_symbol_block_without_bytes_is_rejected() {
        let text = "[INFO]\nwidth = 8\nheight = 1\n\n[SYMBOLS]\nindex = 65\n";
        assert!(matches!(parse_font(text), Err(EngineError::MalformedFontFile { line: 6, .. })));
    }

    #[test]
    fn test_keyless_line_is_rejected() {
        let text = "[INFO]\nwidth\n";
        assert!(matches!(parse_font(text), Err(EngineError::MalformedFontFile { line: 2, .. })));
    }

    #[test]
    fn test_too_few_octets_for_extent() {
        let text = "[INFO]\nwidth = 8\nheight = 2\n\n[SYMBOLS]\nbytes = 0f\n";
        let err = parse_font(text).unwrap_err();
        assert!(matches!(err, EngineError::MalformedFontFile { line: 6, .. }));
    }

    #[test]
    fn test_fixed_font_ignores_symbol_width() {
        let text = "\
[INFO]
width = 8
height = 1
fixsed = true

[SYMBOLS]
index = 65
width = 4
bytes = ff
";
        let font = parse_font(text).unwrap();
        assert!(font.is_fixed());
        assert_eq!(font.glyph(65).unwrap().width(), 8);
    }

    #[test]
    fn test_author_and_comments_and_unknown_keys() {
        let text = "\
# demo file
[AUTHOR]
name = somebody
mail = somebody@example.com

[INFO]
width = 4
height = 1
flavor = crunchy

[SYMBOLS]
bytes = 05
";
        let font = parse_font(text).unwrap();
        assert_eq!(
            font.meta.author,
            vec![
                ("name".to_string(), "somebody".to_string()),
                ("mail".to_string(), "somebody@example.com".to_string()),
            ]
        );
        assert_eq!(font.glyph(0).unwrap().to_bytes(), vec![0x05]);
    }

    #[test]
    fn test_metrics_survive_round_trip() {
        let text = "\
[INFO]
width = 10
height = 10
fixsed = false
baseline = 9
ascent = 7
ascentCapital = 6
descent = 1
leftMargin = 2
rightMargin = 1

[SYMBOLS]
index = 65
width = 7
bytes = 12 34 56 78 9a bc de f0 15
";
        let font = parse_font(text).unwrap();
        assert_eq!(font.baseline(), 9);
        assert_eq!(font.ascent(), 7);
        assert_eq!(font.ascent_capital(), 6);
        assert_eq!(font.descent(), 1);
        assert_eq!(font.margin_left(), 2);
        assert_eq!(font.margin_right(), 1);

        let first = encode_font(&font);
        let reloaded = parse_font(&first).unwrap();
        let second = encode_font(&reloaded);
        assert_eq!(first, second);
        assert_eq!(reloaded.snapshot(), font.snapshot());
    }

    #[test]
    fn test_encode_fixed_font_omits_symbol_width() {
        let mut font = Font::new((6, 1)).unwrap();
        font.add(Glyph::new(65, (6, 1)).unwrap()).unwrap();
        font.set_fixed(true).unwrap();

        let text = encode_font(&font);
        assert!(text.contains("fixsed = true"));
        assert!(!text.contains("\nwidth = 6\nbytes"));
        assert_eq!(encode_font(&parse_font(&text).unwrap()), text);
    }
}
