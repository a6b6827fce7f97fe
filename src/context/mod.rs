//! Documents attached to the active conversation and the synthetic context
//! message built from them.

use log::{ debug, warn };
use std::path::Path;

use crate::error::ChatError;
use crate::models::chat::{ ChatMessage, DocumentItem };

/// Per-document cap, in characters, applied at ingestion.
pub const MAX_DOCUMENT_CHARS: usize = 3000;
pub const CONTEXT_SEPARATOR: &str = "\n\n";
/// Combined context size above which a warning is logged. Nothing is cut.
pub const LARGE_CONTEXT_CHARS: usize = 12_000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentCollector {
    items: Vec<DocumentItem>,
}

impl DocumentCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<DocumentItem>) -> Self {
        let mut collector = Self::new();
        for item in items {
            collector.add(item);
        }
        collector
    }

    pub fn add(&mut self, mut item: DocumentItem) -> &DocumentItem {
        let original_len = item.content.chars().count();
        if original_len > MAX_DOCUMENT_CHARS {
            debug!(
                "Truncating document '{}' from {} to {} characters",
                item.name,
                original_len,
                MAX_DOCUMENT_CHARS
            );
            item.content = truncate_chars(&item.content, MAX_DOCUMENT_CHARS);
        }
        self.items.push(item);
        &self.items[self.items.len() - 1]
    }

    pub fn remove(&mut self, index: usize) -> Option<DocumentItem> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn list(&self) -> &[DocumentItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_vec(&self) -> Vec<DocumentItem> {
        self.items.clone()
    }
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

pub fn build_context_message(documents: &[DocumentItem]) -> Option<ChatMessage> {
    let parts: Vec<&str> = documents
        .iter()
        .map(|d| d.content.as_str())
        .filter(|c| !c.is_empty())
        .collect();
    if parts.is_empty() {
        return None;
    }

    let context = parts.join(CONTEXT_SEPARATOR);
    let size = context.chars().count();
    if size > LARGE_CONTEXT_CHARS {
        warn!("Combined document context is {} characters across {} documents", size, parts.len());
    }
    Some(ChatMessage::system(context))
}

/// Prior transcript, then the optional context message, then the new user message.
pub fn build_request(
    history: &[ChatMessage],
    documents: &[DocumentItem],
    user_message: &ChatMessage
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.extend_from_slice(history);
    if let Some(context) = build_context_message(documents) {
        messages.push(context);
    }
    messages.push(user_message.clone());
    messages
}

pub fn type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "xml" => "application/xml",
        "rs" | "py" | "js" | "ts" | "go" | "java" | "c" | "h" | "cpp" | "toml" | "yaml" | "yml" =>
            "text/x-source",
        _ => "text/plain",
    }
}

/// Reads a text file into a document. Truncation happens when it is added to a
/// collector.
pub async fn read_document(path: &Path) -> Result<DocumentItem, ChatError> {
    let content = tokio::fs::read_to_string(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(DocumentItem {
        name,
        doc_type: type_for_path(path).to_string(),
        content,
    })
}
