//! [`Report`] → A4 PDF bytes.

use printpdf::{
  BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use crate::{Error, Report, Result};

// ─── Page geometry ───────────────────────────────────────────────────────────

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const VALUE_COLUMN: f32 = 65.0;

const HEADING_SIZE: f32 = 16.0;
const SECTION_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;

const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.5;
const LAYER: &str = "Layer 1";

fn line_height(size: f32) -> f32 { size * PT_TO_MM * 1.4 }

fn chars_per_line(width_mm: f32, size: f32) -> usize {
  ((width_mm / (size * PT_TO_MM * GLYPH_WIDTH)) as usize).max(1)
}

/// Greedy word wrap on whitespace, honouring explicit newlines. Words longer
/// than `max_chars` are split.
pub(crate) fn wrap(text: &str, max_chars: usize) -> Vec<String> {
  let mut lines = Vec::new();
  for paragraph in text.lines() {
    let mut current = String::new();
    for word in paragraph.split_whitespace() {
      let mut word: Vec<char> = word.chars().collect();
      while word.len() > max_chars {
        if !current.is_empty() {
          lines.push(std::mem::take(&mut current));
        }
        let rest = word.split_off(max_chars);
        lines.push(word.into_iter().collect());
        word = rest;
      }
      let word: String = word.into_iter().collect();
      let needed = if current.is_empty() { 0 } else { 1 } + word.chars().count();
      if current.chars().count() + needed > max_chars {
        lines.push(std::mem::take(&mut current));
      }
      if !current.is_empty() {
        current.push(' ');
      }
      current.push_str(&word);
    }
    lines.push(current);
  }
  lines
}

// ─── Writer ──────────────────────────────────────────────────────────────────

struct Fonts {
  regular: IndirectFontRef,
  bold:    IndirectFontRef,
  italic:  IndirectFontRef,
}

/// Top-down text cursor that starts a new page when it runs out of room.
struct PageWriter {
  doc:   PdfDocumentReference,
  layer: PdfLayerReference,
  fonts: Fonts,
  y:     f32,
}

impl PageWriter {
  fn new(title: &str) -> Result<Self> {
    let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
    let font = |f: BuiltinFont| doc.add_builtin_font(f).map_err(|e| Error::Pdf(e.to_string()));
    let fonts = Fonts {
      regular: font(BuiltinFont::Helvetica)?,
      bold:    font(BuiltinFont::HelveticaBold)?,
      italic:  font(BuiltinFont::HelveticaOblique)?,
    };
    let layer = doc.get_page(page).get_layer(layer);
    Ok(Self { doc, layer, fonts, y: PAGE_HEIGHT - MARGIN })
  }

  fn ensure_room(&mut self, height: f32) {
    if self.y - height < MARGIN {
      let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
      self.layer = self.doc.get_page(page).get_layer(layer);
      self.y = PAGE_HEIGHT - MARGIN;
    }
  }

  fn skip(&mut self, mm: f32) { self.y -= mm; }

  fn text(&mut self, x: f32, size: f32, font: &IndirectFontRef, text: &str) {
    self.ensure_room(line_height(size));
    self.y -= line_height(size);
    self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
  }

  fn paragraph(&mut self, x: f32, size: f32, font: &IndirectFontRef, text: &str) {
    let width = PAGE_WIDTH - MARGIN - x;
    for line in wrap(text, chars_per_line(width, size)) {
      self.text(x, size, font, &line);
    }
  }

  /// A label/value row; the value wraps inside its own column.
  fn row(&mut self, label: &str, value: &str) {
    let lines = wrap(value, chars_per_line(PAGE_WIDTH - MARGIN - VALUE_COLUMN, BODY_SIZE));
    let height = line_height(BODY_SIZE);
    self.ensure_room(height);
    let top = self.y - height;
    self
      .layer
      .use_text(label, BODY_SIZE, Mm(MARGIN), Mm(top), &self.fonts.bold);
    if lines.is_empty() {
      self.y = top;
    }
    for (i, line) in lines.iter().enumerate() {
      if i > 0 {
        self.ensure_room(height);
      }
      self.y -= height;
      self
        .layer
        .use_text(line.as_str(), BODY_SIZE, Mm(VALUE_COLUMN), Mm(self.y), &self.fonts.regular);
    }
  }

  fn finish(self) -> Result<Vec<u8>> {
    self.doc.save_to_bytes().map_err(|e| Error::Pdf(e.to_string()))
  }
}

/// Serialise `report` as an A4 PDF using the built-in Helvetica faces.
pub fn render_pdf(report: &Report) -> Result<Vec<u8>> {
  let mut w = PageWriter::new(&report.heading)?;

  let heading = w.fonts.bold.clone();
  w.text(MARGIN, HEADING_SIZE, &heading, &report.heading);
  w.skip(6.0);

  for field in &report.fields {
    w.row(field.label, &field.value);
    w.skip(1.5);
  }
  w.skip(6.0);

  let (bold, regular) = (w.fonts.bold.clone(), w.fonts.regular.clone());
  for section in &report.sections {
    w.text(MARGIN, SECTION_SIZE, &bold, section.heading);
    w.skip(1.0);
    w.paragraph(MARGIN, BODY_SIZE, &regular, &section.body);
    w.skip(5.0);
  }

  w.skip(10.0);
  let italic = w.fonts.italic.clone();
  w.text(MARGIN, BODY_SIZE, &italic, &report.footer);

  w.finish()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Field, Section};

  #[test]
  fn wrap_breaks_on_words() {
    assert_eq!(wrap("the quick brown fox", 10), vec!["the quick", "brown fox"]);
    assert_eq!(wrap("a\nb", 10), vec!["a", "b"]);
  }

  #[test]
  fn wrap_splits_overlong_words() {
    assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
  }

  #[test]
  fn renders_a_pdf_even_across_pages() {
    let report = Report {
      heading:  "RCA REPORT - RCA-1".into(),
      fields:   vec![Field { label: "Title", value: "Conveyor stop".into() }],
      sections: vec![Section {
        heading: "Root cause",
        body:    "Bearing wear. ".repeat(800),
      }],
      footer:   "Report generated: 2024-01-01 00:00:00".into(),
    };
    let bytes = render_pdf(&report).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
  }
}
