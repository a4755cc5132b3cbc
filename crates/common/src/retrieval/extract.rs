//! Text extraction and upload storage
//!
//! Extraction never fails from the caller's point of view: unreadable or
//! malformed files are logged and produce an empty string.

use super::Document;
use crate::errors::{AppError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex_lite::Regex;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// File formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Paginated document, text extracted page by page
    Pdf,
    /// UTF-8 plain text
    Text,
    /// Word document, paragraphs joined by newlines
    Docx,
}

impl DocumentFormat {
    /// Format for a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Format for a filename or path, judged by its last extension
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Whether a filename has a supported extension
pub fn allowed_file(filename: &str) -> bool {
    DocumentFormat::from_path(filename).is_some()
}

/// Extract trimmed plain text from `path`; any failure yields `""`.
pub fn extract_text(path: &Path, format: DocumentFormat) -> String {
    let result = match format {
        DocumentFormat::Pdf => extract_pdf(path),
        DocumentFormat::Text => extract_plain(path),
        DocumentFormat::Docx => extract_docx(path),
    };

    match result {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!(path = %path.display(), format = ?format, error = %e, "Error reading document");
            String::new()
        }
    }
}

fn extraction_error(path: &Path, message: impl std::fmt::Display) -> AppError {
    AppError::Extraction {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

fn extract_pdf(path: &Path) -> Result<String> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| extraction_error(path, format!("Failed to load PDF: {}", e)))?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut text = String::new();
    for page_num in pages.keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => {
                debug!(page = page_num, error = %e, "No text extracted from page");
            }
        }
    }

    Ok(text)
}

fn extract_plain(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| extraction_error(path, e))
}

fn extract_docx(path: &Path) -> Result<String> {
    let file = fs::File::open(path).map_err(|e| extraction_error(path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| extraction_error(path, e))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| extraction_error(path, e))?
        .read_to_string(&mut xml)
        .map_err(|e| extraction_error(path, e))?;

    docx_paragraphs(&xml)
        .map(|paragraphs| paragraphs.join("\n"))
        .map_err(|e| extraction_error(path, e))
}

/// Text of every `<w:p>` in a WordprocessingML body, in document order.
fn docx_paragraphs(xml: &str) -> std::result::Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" if in_paragraph => current.push('\t'),
                b"w:br" | b"w:cr" if in_paragraph => current.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    in_paragraph = false;
                    paragraphs.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn unsafe_filename_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("valid filename pattern"))
}

/// Reduce an uploaded filename to a safe, flat storage name.
///
/// Path separators become word breaks, whitespace runs become `_`,
/// characters outside `[A-Za-z0-9_.-]` are dropped and leading/trailing
/// dots and underscores are trimmed. May return an empty string.
pub fn secure_filename(filename: &str) -> String {
    let flattened = filename.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = unsafe_filename_chars().replace_all(&joined, "");
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Upload directory holding the documents available for question answering
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if it does not exist
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Names of stored files with a supported extension, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if allowed_file(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Extract every stored document, skipping those with no text.
    pub fn load_documents(&self) -> Vec<Document> {
        let names = match self.list() {
            Ok(names) => names,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to list upload directory");
                return Vec::new();
            }
        };

        let mut documents = Vec::with_capacity(names.len());
        for name in names {
            let Some(format) = DocumentFormat::from_path(&name) else {
                continue;
            };
            let content = extract_text(&self.dir.join(&name), format);
            if content.is_empty() {
                debug!(document = %name, "Skipping document without text");
                continue;
            }
            documents.push(Document { name, content });
        }

        info!(count = documents.len(), "Loaded documents");
        documents
    }

    /// Store an upload under its sanitized name and return that name.
    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let name = secure_filename(filename);
        if name.is_empty() || !allowed_file(&name) {
            return Err(AppError::UnsupportedFileType {
                filename: filename.to_string(),
            });
        }

        self.ensure_dir()?;
        fs::write(self.dir.join(&name), bytes)?;
        info!(document = %name, size = bytes.len(), "Stored upload");
        Ok(name)
    }

    /// Remove a stored document
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(AppError::DocumentNotFound {
                name: name.to_string(),
            });
        }
        fs::remove_file(&path)?;
        info!(document = %name, "Deleted document");
        Ok(())
    }

    /// Path of a stored document; names that would leave the directory are
    /// rejected.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        let is_flat = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
        if name.is_empty() || !is_flat || name.starts_with('.') {
            return Err(AppError::DocumentNotFound {
                name: name.to_string(),
            });
        }
        Ok(self.dir.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_docx(path: &Path, document_xml: &str) {
        let file = fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(document_xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    fn write_pdf(path: &Path, text: &str) {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Object, Stream};

        let mut doc = lopdf::Document::with_version("1.5");
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
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 48.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    const DOCX_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Quarterly</w:t></w:r><w:r><w:t xml:space="preserve"> report</w:t></w:r></w:p>
    <w:p/>
    <w:p><w:r><w:t>Revenue &amp; costs</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn test_format_detection() {
        assert_eq!(DocumentFormat::from_path("a.PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_path("notes.txt"), Some(DocumentFormat::Text));
        assert_eq!(DocumentFormat::from_path("x.tar.docx"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_path("image.png"), None);
        assert_eq!(DocumentFormat::from_path("README"), None);
        assert!(allowed_file("report.Docx"));
        assert!(!allowed_file("pdf"));
    }

    #[test]
    fn test_plain_text_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "\n  cats are great pets \n\n").unwrap();
        assert_eq!(extract_text(&path, DocumentFormat::Text), "cats are great pets");
    }

    #[test]
    fn test_invalid_utf8_text_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, [0xff, 0xfe, 0xfd]).unwrap();
        assert_eq!(extract_text(&path, DocumentFormat::Text), "");
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        assert_eq!(extract_text(&path, DocumentFormat::Text), "");
    }

    #[test]
    fn test_zero_byte_and_corrupt_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        for (name, format) in [
            ("empty.pdf", DocumentFormat::Pdf),
            ("empty.docx", DocumentFormat::Docx),
            ("empty.txt", DocumentFormat::Text),
        ] {
            let path = dir.path().join(name);
            fs::write(&path, b"").unwrap();
            assert_eq!(extract_text(&path, format), "", "zero-byte {}", name);
        }

        for (name, format) in [
            ("corrupt.pdf", DocumentFormat::Pdf),
            ("corrupt.docx", DocumentFormat::Docx),
        ] {
            let path = dir.path().join(name);
            fs::write(&path, b"%PDF-1.4 this is not really a document").unwrap();
            assert_eq!(extract_text(&path, format), "", "corrupt {}", name);
        }
    }

    #[test]
    fn test_docx_paragraphs_joined_by_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.docx");
        write_docx(&path, DOCX_BODY);
        assert_eq!(
            extract_text(&path, DocumentFormat::Docx),
            "Quarterly report\n\nRevenue & costs"
        );
    }

    #[test]
    fn test_docx_without_body_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.docx");
        let file = fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("readme.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"not a word document").unwrap();
        zip.finish().unwrap();

        assert_eq!(extract_text(&path, DocumentFormat::Docx), "");
    }

    #[test]
    fn test_pdf_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.pdf");
        write_pdf(&path, "Hello World!");
        assert!(extract_text(&path, DocumentFormat::Pdf).contains("Hello World!"));
    }

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My cool report.pdf"), "My_cool_report.pdf");
        assert_eq!(secure_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("C:\\docs\\notes.txt"), "C_docs_notes.txt");
        assert_eq!(secure_filename("résumé.docx"), "rsum.docx");
        assert_eq!(secure_filename(".."), "");
    }

    #[test]
    fn test_store_save_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path().join("uploads"));

        let name = store.save("quarterly report.txt", b"revenue is up").unwrap();
        assert_eq!(name, "quarterly_report.txt");
        store.save("b.txt", b"second").unwrap();
        fs::write(store.dir().join("photo.png"), b"png").unwrap();

        assert_eq!(store.list().unwrap(), vec!["b.txt", "quarterly_report.txt"]);

        store.delete("b.txt").unwrap();
        assert_eq!(store.list().unwrap(), vec!["quarterly_report.txt"]);

        let err = store.delete("b.txt").unwrap_err();
        assert!(matches!(err, AppError::DocumentNotFound { .. }));
    }

    #[test]
    fn test_store_rejects_unsupported_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        let err = store.save("photo.png", b"png").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType { .. }));
        let err = store.save("../", b"").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType { .. }));
    }

    #[test]
    fn test_path_for_rejects_traversal() {
        let store = DocumentStore::new("/srv/uploads");
        assert!(store.path_for("a.txt").is_ok());
        assert!(store.path_for("../a.txt").is_err());
        assert!(store.path_for("sub/a.txt").is_err());
        assert!(store.path_for(".env").is_err());
        assert!(store.path_for("").is_err());
    }

    #[test]
    fn test_load_documents_skips_empty_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        fs::write(dir.path().join("b.txt"), "stock market report").unwrap();
        fs::write(dir.path().join("a.txt"), "cats are great pets").unwrap();
        fs::write(dir.path().join("blank.txt"), "   ").unwrap();
        fs::write(dir.path().join("broken.pdf"), "garbage").unwrap();

        let docs = store.load_documents();
        assert_eq!(
            docs,
            vec![
                Document::new("a.txt", "cats are great pets"),
                Document::new("b.txt", "stock market report"),
            ]
        );
    }

    #[test]
    fn test_load_documents_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path().join("nope"));
        assert!(store.load_documents().is_empty());
    }
}
