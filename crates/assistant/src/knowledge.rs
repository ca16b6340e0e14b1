//! Knowledge base: the administrator's uploaded `.txt` documents.
//!
//! Documents keep insertion order for display. Uploads in a batch are
//! independent; a rejected file never blocks the others.

use shared::knowledge::KnowledgeDocument;
use shared::ChatError;
use std::path::Path;

/// Heading placed above the document block in the system instruction
pub const CONTEXT_HEADER: &str = "CAMPSITE DATA:";

#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    documents: Vec<KnowledgeDocument>,
}

/// Result of uploading a batch of files
#[derive(Debug, Default)]
pub struct IngestReport {
    pub added: Vec<KnowledgeDocument>,
    pub rejected: Vec<ChatError>,
}

impl IngestReport {
    /// User-facing notices, one per rejected file
    pub fn notices(&self) -> Vec<String> {
        self.rejected.iter().map(|e| e.to_string()).collect()
    }
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[KnowledgeDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&KnowledgeDocument> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Insert a document. A document with the same id is replaced in place.
    pub fn add(&mut self, doc: KnowledgeDocument) {
        match self.documents.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc,
            None => self.documents.push(doc),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<KnowledgeDocument> {
        let idx = self.documents.iter().position(|d| d.id == id)?;
        let doc = self.documents.remove(idx);
        tracing::info!(name = %doc.name, "knowledge document removed");
        Some(doc)
    }

    pub fn total_bytes(&self) -> u64 {
        self.documents.iter().map(|d| d.size_bytes).sum()
    }

    /// Every document as `[name]: content`, under a heading. `None` when empty.
    pub fn context_block(&self) -> Option<String> {
        if self.documents.is_empty() {
            return None;
        }
        let entries: Vec<String> = self
            .documents
            .iter()
            .map(|d| format!("[{}]: {}", d.name, d.content))
            .collect();
        Some(format!("{}\n{}", CONTEXT_HEADER, entries.join("\n")))
    }

    /// Read each file and add the accepted ones.
    pub async fn ingest<P: AsRef<Path>>(&mut self, paths: &[P]) -> IngestReport {
        let mut report = IngestReport::default();
        for path in paths {
            match ingest_file(path.as_ref()).await {
                Ok(doc) => {
                    tracing::info!(name = %doc.name, size = doc.size_bytes, "knowledge document added");
                    self.add(doc.clone());
                    report.added.push(doc);
                }
                Err(e) => {
                    tracing::warn!(path = %path.as_ref().display(), "upload rejected: {}", e);
                    report.rejected.push(e);
                }
            }
        }
        report
    }
}

/// Only `.txt` files are accepted (case-insensitive extension).
pub fn is_plain_text(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("txt"))
        .unwrap_or(false)
}

/// Turn one local file into a document.
pub async fn ingest_file(path: &Path) -> Result<KnowledgeDocument, ChatError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    if !is_plain_text(path) {
        return Err(ChatError::UnsupportedFile { name });
    }

    let io_err = |source| ChatError::Io {
        name: name.clone(),
        source,
    };
    let size_bytes = tokio::fs::metadata(path).await.map_err(io_err)?.len();
    let bytes = tokio::fs::read(path).await.map_err(io_err)?;
    let content = String::from_utf8_lossy(&bytes).into_owned();

    Ok(KnowledgeDocument::new(name, content, size_bytes))
}
