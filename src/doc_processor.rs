use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub type Metadata = BTreeMap<String, Value>;

/// Parsed document content
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub text: String,
    pub metadata: Metadata,
}

/// A file in the upload directory
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub size: u64,
}

/// Visible regular files in `dir`, sorted by name.
///
/// Dotfiles are skipped; uploads are staged under a dot-prefixed name until
/// they are complete.
pub async fn list_files(dir: &Path) -> Result<Vec<StoredFile>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        // Follows symlinks, unlike `DirEntry::metadata`
        let meta = tokio::fs::metadata(entry.path()).await?;
        if !meta.is_file() {
            continue;
        }
        files.push(StoredFile {
            name,
            path: entry.path(),
            size: meta.len(),
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Read and parse every file in the upload directory as a PDF.
///
/// One bad file fails the whole load.
pub async fn load_directory(dir: &Path) -> Result<Vec<ParsedDocument>> {
    let files = list_files(dir).await?;
    tracing::debug!("Loading {} files from {}", files.len(), dir.display());

    let parsed = files.into_iter().map(|file| async move {
        let bytes = tokio::fs::read(&file.path).await?;
        let name = file.name.clone();
        tokio::task::spawn_blocking(move || parse_pdf(&name, &bytes))
            .await
            .map_err(|e| Error::file_parse(&file.name, format!("parser crashed: {}", e)))?
    });

    futures::future::try_join_all(parsed).await
}

/// Extract text and document info from PDF bytes
pub fn parse_pdf(file_name: &str, bytes: &[u8]) -> Result<ParsedDocument> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| Error::file_parse(file_name, format!("PDF parse error: {}", e)))?;

    let mut metadata = Metadata::new();
    metadata.insert("source".into(), Value::String(file_name.to_string()));
    if let Ok(doc) = lopdf::Document::load_mem(bytes) {
        metadata.insert("pages".into(), Value::from(doc.get_pages().len()));
        let info = pdf_info(&doc);
        if !info.is_empty() {
            metadata.insert("info".into(), Value::Object(info.into_iter().collect()));
        }
    }

    Ok(ParsedDocument { text, metadata })
}

/// String entries of the trailer's Info dictionary
fn pdf_info(doc: &lopdf::Document) -> BTreeMap<String, Value> {
    let mut info = BTreeMap::new();
    let dict = match doc.trailer.get(b"Info") {
        Ok(lopdf::Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Ok(lopdf::Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    let Some(dict) = dict else {
        return info;
    };

    for (key, value) in dict.iter() {
        if let lopdf::Object::String(bytes, _) = value {
            let key = String::from_utf8_lossy(key).to_string();
            info.insert(key, Value::String(decode_pdf_string(bytes)));
        }
    }
    info
}

/// PDF text strings are UTF-16BE when they carry a byte order mark.
fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => String::from_utf8_lossy(bytes).to_string(),
    }
}

/// Write an upload into `dir` under `file_name`, replacing any previous file.
///
/// Bytes go to a hidden staging file first and are renamed into place, so a
/// concurrent directory load never sees a partial file.
pub async fn store_file(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let target = dir.join(file_name);
    let staging = dir.join(format!(".upload-{}.part", uuid::Uuid::new_v4()));

    let written = match tokio::fs::write(&staging, bytes).await {
        Ok(()) => tokio::fs::rename(&staging, &target).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e.into());
    }
    Ok(target)
}

/// Reduce a client-supplied name to a plain file name.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = Path::new(raw.trim()).file_name()?.to_str()?;
    if name.is_empty() || name.starts_with('.') {
        return None;
    }
    Some(name.to_string())
}

/// Split text into overlapping chunks for embedding
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || chunk_size == 0 {
        return vec![];
    }
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim().to_string();
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
        if end >= chars.len() {
            break;
        }
        start += step;
    }

    chunks
}
