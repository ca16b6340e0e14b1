//! Knowledge documents: plain-text snippets the administrator uploads so the
//! model can answer from them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    /// File name as uploaded, e.g. "rules.txt"
    pub name: String,
    pub content: String,
    /// Size in bytes as reported by the filesystem
    pub size_bytes: u64,
}

impl KnowledgeDocument {
    pub fn new(name: impl Into<String>, content: impl Into<String>, size_bytes: u64) -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(9);
        Self {
            id,
            name: name.into(),
            content: content.into(),
            size_bytes,
        }
    }

    pub fn formatted_size(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// Format a byte count as "0 B", "512 B", "1.5 KB", "2 MB".
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["B", "KB", "MB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.1}", value);
    let trimmed = rounded.strip_suffix(".0").unwrap_or(&rounded);
    format!("{} {}", trimmed, UNITS[unit])
}
