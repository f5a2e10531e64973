use std::path::Path;

use docx_rs::{
    DocumentChild, InsertChild, Paragraph, ParagraphChild, Run, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};
use encoding_rs::{Encoding, WINDOWS_1252};

use crate::error::{Error, Result};
use crate::services::file_store::FileFormat;

/// Pulls plain text out of stored exam documents.
#[derive(Clone, Debug, Default)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Reads `path` and extracts its text according to the file extension.
    /// Parsing runs on the blocking pool.
    pub async fn extract_file(&self, path: &Path) -> Result<String> {
        let format = FileFormat::from_path(path).ok_or_else(|| {
            Error::UnsupportedFormat(
                path.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_string(),
            )
        })?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::CorruptFile(format!("cannot read {:?}: {}", path, e)))?;
        self.extract(bytes, format).await
    }

    pub async fn extract(&self, bytes: Vec<u8>, format: FileFormat) -> Result<String> {
        tokio::task::spawn_blocking(move || extract_bytes(&bytes, format))
            .await
            .map_err(|e| Error::Internal(format!("text extraction task failed: {}", e)))?
    }
}

pub fn extract_bytes(bytes: &[u8], format: FileFormat) -> Result<String> {
    if bytes.is_empty() {
        return Ok(String::new());
    }
    match format {
        FileFormat::Txt => Ok(decode_text(bytes)),
        FileFormat::Pdf => extract_pdf(bytes),
        FileFormat::Docx => extract_docx(bytes),
    }
}

/// BOM first, then strict UTF-8, then Windows-1252 which never fails.
fn decode_text(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| Error::CorruptFile(format!("unreadable PDF: {}", e)))?;
    if doc.is_encrypted() {
        return Err(Error::CorruptFile("PDF is encrypted".to_string()));
    }

    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys() {
        let text = doc.extract_text(&[*page_number]).map_err(|e| {
            Error::CorruptFile(format!("PDF page {} unreadable: {}", page_number, e))
        })?;
        pages.push(text);
    }
    tracing::debug!(pages = pages.len(), "extracted PDF text");
    Ok(pages.join("\n"))
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| Error::CorruptFile(format!("unreadable DOCX: {}", e)))?;

    let mut lines = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => lines.push(paragraph_text(paragraph)),
            DocumentChild::Table(table) => collect_table(table, &mut lines),
            _ => {}
        }
    }
    Ok(lines.join("\n"))
}

/// Each cell paragraph becomes its own line, row by row.
fn collect_table(table: &Table, lines: &mut Vec<String>) {
    for TableChild::TableRow(row) in &table.rows {
        for TableRowChild::TableCell(cell) in &row.cells {
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(paragraph) => {
                        lines.push(paragraph_text(paragraph))
                    }
                    TableCellContent::Table(nested) => collect_table(nested, lines),
                    _ => {}
                }
            }
        }
    }
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut line = String::new();
    push_paragraph_children(&paragraph.children, &mut line);
    line
}

fn push_paragraph_children(children: &[ParagraphChild], line: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run(run, line),
            ParagraphChild::Hyperlink(link) => push_paragraph_children(&link.children, line),
            ParagraphChild::Insert(insert) => {
                for inserted in &insert.children {
                    if let InsertChild::Run(run) = inserted {
                        push_run(run, line);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_run(run: &Run, line: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(t) => line.push_str(&t.text),
            RunChild::Tab(_) => line.push('\t'),
            RunChild::Break(_) | RunChild::CarriageReturn(_) => line.push('\n'),
            _ => {}
        }
    }
}
