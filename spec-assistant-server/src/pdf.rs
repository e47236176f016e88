//! PDF report of extraction results: a two-column `Key | Extracted Value`
//! table under a title, paginated on US Letter.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::excel::ExportRow;

pub const TITLE: &str = "Extracted Keys Report";
pub const HEADERS: [&str; 2] = ["Key", "Extracted Value"];

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 36;
const COLUMN_WIDTH: i64 = (PAGE_WIDTH - 2 * MARGIN) / 2;
const CELL_PADDING: i64 = 6;

const TITLE_SIZE: i64 = 18;
const HEADER_SIZE: i64 = 12;
const BODY_SIZE: i64 = 10;
const LINE_HEIGHT: i64 = 12;

/// Helvetica at 10pt averages a little under 5pt per glyph.
const CHARS_PER_LINE: usize = 48;
/// Keeps any single row shorter than a page.
const MAX_CELL_LINES: usize = 50;

const HEADER_FILL: [f32; 3] = [0.173, 0.243, 0.314];
const EVEN_FILL: [f32; 3] = [0.961, 0.961, 0.863];
const ODD_FILL: [f32; 3] = [0.827, 0.827, 0.827];
const WHITE: [f32; 3] = [1.0, 1.0, 1.0];
const BLACK: [f32; 3] = [0.0, 0.0, 0.0];

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

/// Render `rows` as a PDF document.
pub fn build_pdf(rows: &[ExportRow]) -> Result<Vec<u8>, lopdf::Error> {
    let mut pages = Vec::new();
    let mut page = PageWriter::new();

    page.title();
    page.header();
    for (index, row) in rows.iter().enumerate() {
        let cells = [wrap_text(&row.key), wrap_text(&row.value)];
        let height = row_height(&cells, BODY_SIZE);
        if !page.fits(height) {
            pages.push(page.finish());
            page = PageWriter::new();
            page.header();
        }
        let fill = if index % 2 == 0 { EVEN_FILL } else { ODD_FILL };
        page.row(&cells, fill, BLACK, REGULAR, BODY_SIZE);
    }
    pages.push(page.finish());

    write_document(pages)
}

/// Break `text` into lines of at most [`CHARS_PER_LINE`] characters,
/// preferring word boundaries.
pub fn wrap_text(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > CHARS_PER_LINE {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                lines.push(word.drain(..CHARS_PER_LINE).collect());
            }
            let word: String = word.into_iter().collect();
            let needed = line.chars().count() + usize::from(!line.is_empty()) + word.chars().count();
            if needed > CHARS_PER_LINE && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        lines.push(line);
    }

    if lines.len() > MAX_CELL_LINES {
        lines.truncate(MAX_CELL_LINES);
        if let Some(last) = lines.last_mut() {
            last.push_str(" ...");
        }
    }
    lines
}

fn row_height(cells: &[Vec<String>; 2], font_size: i64) -> i64 {
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1) as i64;
    (lines - 1) * LINE_HEIGHT + font_size + 2 * CELL_PADDING
}

/// Latin-1 bytes for the WinAnsi-encoded standard fonts. Anything outside
/// that range prints as `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn color(op: &str, rgb: [f32; 3]) -> Operation {
    Operation::new(op, rgb.iter().map(|&c| Object::Real(c)).collect())
}

fn text_at(font: &str, size: i64, x: i64, y: i64, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(encode_text(text))]),
        Operation::new("ET", vec![]),
    ]
}

struct PageWriter {
    operations: Vec<Operation>,
    y: i64,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            operations: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn fits(&self, height: i64) -> bool {
        self.y - height >= MARGIN
    }

    fn title(&mut self) {
        self.y -= TITLE_SIZE;
        self.operations.push(color("rg", BLACK));
        self.operations
            .extend(text_at(BOLD, TITLE_SIZE, MARGIN, self.y, TITLE));
        self.y -= TITLE_SIZE;
    }

    fn header(&mut self) {
        let cells = HEADERS.map(|h| vec![h.to_string()]);
        self.row(&cells, HEADER_FILL, WHITE, BOLD, HEADER_SIZE);
    }

    fn row(
        &mut self,
        cells: &[Vec<String>; 2],
        fill: [f32; 3],
        text_color: [f32; 3],
        font: &str,
        font_size: i64,
    ) {
        let height = row_height(cells, font_size);
        let bottom = self.y - height;

        for (col, lines) in cells.iter().enumerate() {
            let x = MARGIN + col as i64 * COLUMN_WIDTH;
            let rect: Vec<Object> = vec![x.into(), bottom.into(), COLUMN_WIDTH.into(), height.into()];

            self.operations.push(color("rg", fill));
            self.operations.push(Operation::new("re", rect.clone()));
            self.operations.push(Operation::new("f", vec![]));
            self.operations.push(color("RG", BLACK));
            self.operations.push(Operation::new("w", vec![Object::Integer(1)]));
            self.operations.push(Operation::new("re", rect));
            self.operations.push(Operation::new("S", vec![]));

            self.operations.push(color("rg", text_color));
            let mut baseline = self.y - CELL_PADDING - font_size;
            for line in lines {
                self.operations
                    .extend(text_at(font, font_size, x + CELL_PADDING, baseline, line));
                baseline -= LINE_HEIGHT;
            }
        }
        self.y = bottom;
    }

    fn finish(self) -> Vec<Operation> {
        self.operations
    }
}

fn write_document(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, lopdf::Error> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font = |base: &str| {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base,
            "Encoding" => "WinAnsiEncoding",
        }
    };
    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => regular_id,
            BOLD => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(TITLE),
    });
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
