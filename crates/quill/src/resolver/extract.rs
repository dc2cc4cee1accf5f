//! Format detection and text extraction for resolved documents.
//!
//! Detection is driven by the declared content type first and the
//! filename suffix second. Unknown formats get a best-effort strict
//! UTF-8 decode; undecodable bytes are treated as unresolvable.

use std::io::{Cursor, Read};

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
    Json,
    Unknown,
}

const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

impl DocumentFormat {
    /// Derive the format tag from content type or, failing that, the
    /// storage key suffix.
    pub fn detect(content_type: Option<&str>, key: &str) -> Self {
        if let Some(content_type) = content_type {
            let media_type = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            match media_type.as_str() {
                "application/pdf" => return DocumentFormat::Pdf,
                DOCX_CONTENT_TYPE => return DocumentFormat::Docx,
                "text/plain" => return DocumentFormat::Text,
                "application/json" => return DocumentFormat::Json,
                _ => {}
            }
        }

        let key = key.to_ascii_lowercase();
        if key.ends_with(".pdf") {
            DocumentFormat::Pdf
        } else if key.ends_with(".docx") {
            DocumentFormat::Docx
        } else if key.ends_with(".txt") {
            DocumentFormat::Text
        } else if key.ends_with(".json") {
            DocumentFormat::Json
        } else {
            DocumentFormat::Unknown
        }
    }
}

/// Extract plain text from raw bytes according to the format tag.
///
/// Returns `None` when the bytes cannot be turned into text; the
/// resolver then treats the document as unresolved for this backend.
pub fn extract_text(format: DocumentFormat, bytes: &[u8]) -> Option<String> {
    match format {
        DocumentFormat::Pdf => extract_pdf(bytes),
        DocumentFormat::Docx => extract_docx(bytes),
        DocumentFormat::Text => decode_utf8(bytes),
        DocumentFormat::Json => extract_json(bytes),
        DocumentFormat::Unknown => decode_utf8(bytes),
    }
}

fn decode_utf8(bytes: &[u8]) -> Option<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Some(text.to_string()),
        Err(e) => {
            warn!(error = %e, "could not decode bytes as UTF-8 text");
            None
        }
    }
}

/// JSON documents with a top-level string `content` field serve that
/// field verbatim; anything else is pretty-printed as-is.
fn extract_json(bytes: &[u8]) -> Option<String> {
    let value: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "could not parse document as JSON");
            return None;
        }
    };

    if let Some(content) = value.get("content").and_then(Value::as_str) {
        return Some(content.to_string());
    }
    serde_json::to_string_pretty(&value).ok()
}

fn extract_pdf(bytes: &[u8]) -> Option<String> {
    let doc = match lopdf::Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "could not parse PDF document");
            return None;
        }
    };

    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Some(String::new());
    }
    match doc.extract_text(&pages) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(error = %e, "could not extract text from PDF");
            None
        }
    }
}

lazy_static! {
    static ref PARAGRAPH_END: Regex = Regex::new(r"</w:p>").unwrap();
    static ref TAB_MARK: Regex = Regex::new(r"<w:tab[^>]*/>").unwrap();
    static ref XML_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
}

/// A DOCX file is a zip archive; the body text lives in
/// `word/document.xml`. Paragraph closes become line breaks and the
/// remaining markup is stripped.
fn extract_docx(bytes: &[u8]) -> Option<String> {
    let mut archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(e) => {
            warn!(error = %e, "could not open DOCX archive");
            return None;
        }
    };

    let mut xml = String::new();
    match archive.by_name("word/document.xml") {
        Ok(mut file) => {
            if let Err(e) = file.read_to_string(&mut xml) {
                warn!(error = %e, "could not read DOCX document body");
                return None;
            }
        }
        Err(e) => {
            warn!(error = %e, "DOCX archive has no document body");
            return None;
        }
    }

    let text = PARAGRAPH_END.replace_all(&xml, "\n\n");
    let text = TAB_MARK.replace_all(&text, "\t");
    let text = XML_TAG.replace_all(&text, "");
    Some(decode_xml_entities(text.trim()))
}

fn decode_xml_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
