//! Extraction of the repeated teacher blocks on a course about page.
//!
//! Each block is an element tagged `data-scos-teacher="teacher"`; inside it
//! the `display_name`, `description` and `image` sub-markers carry the
//! block's named parts. The image is taken from the `src` attribute of the
//! `img` tag; img is a void element, so no closing tag is involved.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Attribute marking teacher blocks and their sub-fields.
pub const TEACHER_MARKER_ATTR: &str = "data-scos-teacher";

static BLOCK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[data-scos-teacher="teacher"]"#).unwrap());
static NAME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[data-scos-teacher="display_name"]"#).unwrap());
static DESCRIPTION_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[data-scos-teacher="description"]"#).unwrap());
static IMAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[data-scos-teacher="image"]"#).unwrap());
static IMG_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());

/// One teacher block as found on the page, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTeacher {
    pub display_name: Vec<String>,
    /// `src` of the block's image, usually a path relative to the platform.
    pub image: Option<String>,
    pub description: Vec<String>,
}

/// Extracts all teacher blocks from an HTML document, in document order.
pub fn extract_teacher_blocks(html: &str) -> Vec<RawTeacher> {
    let document = Html::parse_document(html);
    document.select(&BLOCK_SELECTOR).map(parse_block).collect()
}

fn parse_block(block: ElementRef) -> RawTeacher {
    RawTeacher {
        display_name: text_fragments(block.select(&NAME_SELECTOR)),
        image: image_source(&block),
        description: text_fragments(block.select(&DESCRIPTION_SELECTOR)),
    }
}

/// Finds the image `src` for a block: the `image`-marked element itself if
/// it is an `img`, otherwise the first `img` inside it.
fn image_source(block: &ElementRef) -> Option<String> {
    let marked = block.select(&IMAGE_SELECTOR).next()?;
    let img = if marked.value().name() == "img" {
        marked
    } else {
        marked.select(&IMG_SELECTOR).next()?
    };
    img.value().attr("src").map(str::to_string)
}

fn text_fragments<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> Vec<String> {
    let mut fragments = Vec::new();
    for element in elements {
        for text in element.text() {
            let text = text.trim();
            if !text.is_empty() {
                fragments.push(text.to_string());
            }
        }
    }
    fragments
}
