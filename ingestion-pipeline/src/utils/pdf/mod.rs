pub mod text_extraction;

use common::error::AppError;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// US Letter, used when a page carries no usable MediaBox.
const FALLBACK_PAGE_SIZE: (f64, f64) = (612.0, 792.0);
/// Guards against cyclic or absurdly deep page trees.
const MAX_PARENT_DEPTH: usize = 32;

/// Width and height of a page in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn aspect_ratio(&self) -> f64 {
        self.height / self.width
    }
}

pub(crate) fn load(content: &[u8]) -> Result<Document, AppError> {
    Document::load_mem(content)
        .map_err(|err| AppError::Processing(format!("Failed to parse PDF: {err}")))
}

/// Number of pages in the document. Derived on every call, never stored.
pub fn page_count(content: &[u8]) -> Result<u32, AppError> {
    let document = load(content)?;
    let count = document.get_pages().len();
    u32::try_from(count).map_err(|_| AppError::Processing(format!("PDF has {count} pages")))
}

/// Size of the first page, honoring a MediaBox inherited from the page tree.
pub fn first_page_size(content: &[u8]) -> Result<PageSize, AppError> {
    let document = load(content)?;
    let Some((_, &page_id)) = document.get_pages().iter().next() else {
        return Err(AppError::Processing("PDF appears to have no pages".into()));
    };

    Ok(media_box(&document, page_id).unwrap_or(PageSize {
        width: FALLBACK_PAGE_SIZE.0,
        height: FALLBACK_PAGE_SIZE.1,
    }))
}

fn media_box(document: &Document, page_id: ObjectId) -> Option<PageSize> {
    let mut node = document.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_PARENT_DEPTH {
        if let Some(size) = node.get(b"MediaBox").ok().and_then(|obj| parse_box(document, obj)) {
            return Some(size);
        }
        node = parent(document, node)?;
    }

    None
}

fn parent<'a>(document: &'a Document, node: &Dictionary) -> Option<&'a Dictionary> {
    let parent_id = node.get(b"Parent").ok()?.as_reference().ok()?;
    document.get_dictionary(parent_id).ok()
}

fn parse_box(document: &Document, obj: &Object) -> Option<PageSize> {
    let obj = match obj {
        Object::Reference(id) => document.get_object(*id).ok()?,
        other => other,
    };
    let values = obj
        .as_array()
        .ok()?
        .iter()
        .map(number)
        .collect::<Option<Vec<f64>>>()?;

    let [x0, y0, x1, y1] = values.as_slice() else {
        return None;
    };
    let width = (x1 - x0).abs();
    let height = (y1 - y0).abs();

    (width > 0.0 && height > 0.0).then_some(PageSize { width, height })
}

#[allow(clippy::cast_precision_loss)]
fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

/// Builds small PDFs in memory for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use common::error::AppError;
    use lopdf::{
        content::{Content, Operation},
        dictionary, Document, Object, Stream,
    };

    /// A PDF with one page per entry; each page shows its text, if any.
    pub fn pdf_with_pages(pages: &[&str]) -> Result<Vec<u8>, AppError> {
        let to_err = |err: lopdf::Error| AppError::Processing(err.to_string());

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids = Vec::with_capacity(pages.len());
        for text in pages {
            let operations = if text.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let encoded = Content { operations }.encode().map_err(to_err)?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = i64::try_from(kids.len()).map_err(|err| AppError::Processing(err.to_string()))?;
        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|err| AppError::Processing(err.to_string()))?;
        Ok(bytes)
    }

    /// A single blank A4 page.
    pub fn blank_pdf() -> Result<Vec<u8>, AppError> {
        pdf_with_pages(&[""])
    }
}
