//! Plain-text extraction from supported document formats.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use helpdesk_core::error::{HelpdeskError, Result};

/// Extensions picked up from the documents directory (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "pdf", "docx", "doc"];

static XML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Invalid XML tag regex"));
static PARAGRAPH_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</w:p>|<w:br\s*/>|<w:cr\s*/>").expect("Invalid paragraph regex")
});
static TAB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:tab\s*/>").expect("Invalid tab regex"));

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Extract the text of a document, dispatching on its extension.
pub fn load_document(path: &Path) -> Result<String> {
    match extension(path).as_deref() {
        Some("txt") => load_text(path),
        Some("pdf") => load_pdf(path),
        Some("docx") | Some("doc") => load_word(path),
        _ => Err(HelpdeskError::Document(format!(
            "unsupported document type: {}",
            path.display()
        ))),
    }
}

fn load_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn load_pdf(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path)
        .map_err(|e| HelpdeskError::Document(format!("{}: {}", path.display(), e)))
}

/// Word documents are read from the OOXML `word/document.xml` part.
/// Legacy binary `.doc` files are not zip archives and fail here.
fn load_word(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        HelpdeskError::Document(format!("{} is not an OOXML document: {}", path.display(), e))
    })?;
    let mut part = archive.by_name("word/document.xml").map_err(|e| {
        HelpdeskError::Document(format!("{} has no document body: {}", path.display(), e))
    })?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(word_xml_to_text(&xml))
}

fn word_xml_to_text(xml: &str) -> String {
    let text = PARAGRAPH_END.replace_all(xml, "\n");
    let text = TAB.replace_all(&text, "\t");
    let text = XML_TAG.replace_all(&text, "");
    decode_entities(&text).trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
