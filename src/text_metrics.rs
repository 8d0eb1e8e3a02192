use std::collections::HashMap;
use std::sync::Mutex;

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use ttf_parser::Face;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Measure the rendered width of a single-line label in pixels.
/// Returns `None` when no matching system font can be loaded; callers
/// fall back to a per-character estimate.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

/// Horizontal advances for the ASCII range, scaled per call. Non-ASCII
/// characters use an em-relative estimate; gutter sizing does not need
/// glyph-exact widths for them.
struct FontMetrics {
    units_per_em: u16,
    ascii_advances: [u16; 128],
}

impl FontMetrics {
    fn from_face(face: &Face<'_>) -> Self {
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        Self {
            units_per_em: face.units_per_em().max(1),
            ascii_advances,
        }
    }

    fn width(&self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let advance = if ch.is_ascii() {
                self.ascii_advances[ch as usize]
            } else {
                0
            };
            if advance == 0 {
                width += fallback;
            } else {
                width += advance as f32 * scale;
            }
        }
        width.max(0.0)
    }
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontMetrics>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = font_family.trim().to_string();
        if !self.cache.contains_key(&key) {
            let metrics = self.load_metrics(font_family);
            self.cache.insert(key.clone(), metrics);
        }
        let metrics = self.cache.get(&key)?.as_ref()?;
        Some(metrics.width(text, font_size))
    }

    fn load_metrics(&mut self, font_family: &str) -> Option<FontMetrics> {
        let mut names: Vec<String> = Vec::new();
        let mut generics: Vec<Family<'static>> = Vec::new();
        for part in font_family.split(',') {
            let raw = part.trim().trim_matches('"').trim_matches('\'');
            if raw.is_empty() {
                continue;
            }
            match raw.to_ascii_lowercase().as_str() {
                "serif" => generics.push(Family::Serif),
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    generics.push(Family::SansSerif)
                }
                "monospace" | "ui-monospace" => generics.push(Family::Monospace),
                "cursive" => generics.push(Family::Cursive),
                "fantasy" => generics.push(Family::Fantasy),
                _ => names.push(raw.to_string()),
            }
        }

        let mut families: Vec<Family<'_>> = names.iter().map(|n| Family::Name(n)).collect();
        families.extend(generics);
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        let mut metrics = None;
        self.db.with_face_data(id, |data, index| {
            if let Ok(face) = Face::parse(data, index) {
                metrics = Some(FontMetrics::from_face(&face));
            }
        });
        metrics
    }
}
