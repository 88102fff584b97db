//! PDF composition for event summary reports.
//!
//! The renderer is a pure function from a [`ReportRequest`] to the bytes of
//! a complete document: a fixed title, then one heading per section with its
//! paragraphs in arrival order. Persistence is the storage layer's problem.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use thiserror::Error;

use crate::domain::report::ReportRequest;

pub const REPORT_TITLE: &str = "Event Summary Report";

// Letter page geometry, in points.
const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 72;

const FONT_BODY: &str = "F1";
const FONT_HEADING: &str = "F2";

const TITLE_SIZE: i64 = 18;
const HEADING_SIZE: i64 = 14;
const BODY_SIZE: i64 = 11;

const TITLE_LEADING: i64 = 24;
const HEADING_LEADING: i64 = 20;
const BODY_LEADING: i64 = 14;

const TITLE_GAP: i64 = 12;
const HEADING_GAP: i64 = 4;
const PARAGRAPH_GAP: i64 = 8;

// Helvetica averages roughly half an em per glyph; good enough for wrapping
// plain prose at these sizes.
const GLYPH_ADVANCE: f32 = 0.5;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("pdf composition failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("pdf serialization failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Render the complete report document in memory.
pub fn render_report(request: &ReportRequest) -> Result<Vec<u8>, RenderError> {
    let mut composer = PageComposer::new();

    composer.text_block(FONT_HEADING, TITLE_SIZE, TITLE_LEADING, REPORT_TITLE);
    composer.gap(TITLE_GAP);

    for (title, paragraphs) in request.sections() {
        composer.text_block(FONT_HEADING, HEADING_SIZE, HEADING_LEADING, title);
        composer.gap(HEADING_GAP);
        for paragraph in paragraphs {
            composer.text_block(FONT_BODY, BODY_SIZE, BODY_LEADING, paragraph);
            composer.gap(PARAGRAPH_GAP);
        }
    }

    assemble(composer.finish())
}

/// Accumulates text operations page by page, breaking to a fresh page when
/// the write cursor would cross the bottom margin.
struct PageComposer {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    cursor: i64,
}

impl PageComposer {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn text_block(&mut self, font: &str, size: i64, leading: i64, text: &str) {
        // Line at a time, so a page break may fall inside a paragraph.
        for line in wrap(text, chars_per_line(size)) {
            if self.cursor - leading < MARGIN {
                self.break_page();
            }
            self.cursor -= leading;
            self.current.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![font.into(), size.into()]),
                Operation::new("Td", vec![MARGIN.into(), self.cursor.into()]),
                Operation::new("Tj", vec![Object::string_literal(line)]),
                Operation::new("ET", vec![]),
            ]);
        }
    }

    fn gap(&mut self, points: i64) {
        self.cursor = (self.cursor - points).max(MARGIN);
    }

    fn break_page(&mut self) {
        if !self.current.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
        }
        self.cursor = PAGE_HEIGHT - MARGIN;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.current.is_empty() {
            self.pages.push(self.current);
        }
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        self.pages
    }
}

fn chars_per_line(font_size: i64) -> usize {
    let line_width = (PAGE_WIDTH - 2 * MARGIN) as f32;
    (line_width / (font_size as f32 * GLYPH_ADVANCE)).floor() as usize
}

/// Greedy word wrap. Control characters are dropped; words longer than a
/// whole line are hard-split rather than overflowing the margin.
fn wrap(text: &str, limit: usize) -> Vec<String> {
    let cleaned: String = text.chars().filter(|c| !c.is_control()).collect();
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in cleaned.split_whitespace() {
        let mut word = word;
        while word.chars().count() > limit {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let split = word
                .char_indices()
                .nth(limit)
                .map_or(word.len(), |(index, _)| index);
            lines.push(word[..split].to_owned());
            word = &word[split..];
        }
        let separator = usize::from(!line.is_empty());
        if line.chars().count() + separator + word.chars().count() > limit {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }

    if !line.is_empty() {
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn assemble(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let body_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let heading_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_BODY => body_font_id,
            FONT_HEADING => heading_font_id,
        },
    });

    let page_count = pages.len() as i64;
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let stream_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => stream_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
