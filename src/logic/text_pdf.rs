use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::logic::converter::{ConversionError, FormatConverter};

// US Letter, in points
const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 50;
const LINE_HEIGHT: i64 = 15;
const FONT_SIZE: i64 = 12;
/// Longer lines wrap onto continuation lines.
const MAX_LINE_CHARS: usize = 80;

/// A line of text placed at a baseline on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub y: i64,
    pub text: String,
}

/// `.txt` rendered in-process: one Helvetica line per source line, top to
/// bottom, starting a new page when the bottom margin is reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextConverter;

#[async_trait::async_trait]
impl FormatConverter for TextConverter {
    fn name(&self) -> &'static str {
        "text"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<String, ConversionError> {
        let bytes = tokio::fs::read(input).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let output: PathBuf = output.to_path_buf();

        tokio::task::spawn_blocking(move || render_pdf(&layout_pages(&text), &output))
            .await
            .map_err(|e| ConversionError::Render(e.to_string()))??;

        Ok("TXT converted successfully".to_string())
    }
}

/// Splits text into pages of positioned lines.
pub fn layout_pages(text: &str) -> Vec<Vec<PlacedLine>> {
    let top = PAGE_HEIGHT - MARGIN;
    let mut pages = vec![Vec::new()];
    let mut y = top;

    for line in text.split('\n').flat_map(wrap_line) {
        if y < MARGIN {
            pages.push(Vec::new());
            y = top;
        }
        if let Some(page) = pages.last_mut() {
            page.push(PlacedLine { y, text: line });
        }
        y -= LINE_HEIGHT;
    }
    pages
}

fn wrap_line(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.trim_end_matches('\r').chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(MAX_LINE_CHARS)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Helvetica with WinAnsiEncoding covers Latin-1; anything else becomes `?`.
fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            c if (c as u32) < 0x20 => b' ',
            c if (c as u32) <= 0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn render_pdf(pages: &[Vec<PlacedLine>], output: &Path) -> Result<(), ConversionError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let mut operations = Vec::with_capacity(page.len() * 3 + 3);
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]));
        operations.push(Operation::new("TL", vec![LINE_HEIGHT.into()]));
        for line in page {
            operations.push(Operation::new("Tm", matrix_at(MARGIN, line.y)));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(encode_latin1(&line.text))],
            ));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| ConversionError::Render(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
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
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(output)
        .map_err(|e| ConversionError::Render(e.to_string()))?;
    Ok(())
}

fn matrix_at(x: i64, y: i64) -> Vec<Object> {
    vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()]
}
