//! Core domain types for the word-rag system.

use serde::{Deserialize, Serialize};

/// Stable document identifier: the row position in the loaded corpus.
pub type DocumentId = u32;

/// Default rendering of a document's indexed text.
pub const DEFAULT_CONTENT_TEMPLATE: &str = "단어: {title}\n설명: {body}";

/// An economic-term entry of the corpus.
///
/// Documents are immutable once loaded. `content` is derived from the other
/// fields when the document is constructed, and it is the text both
/// retrievers index and the synthesizer quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Row index in the corpus.
    pub id: DocumentId,

    /// Term being defined (trimmed, empty when absent).
    pub title: String,

    /// Definition text (trimmed, empty when absent).
    pub body: String,

    /// Auxiliary tag string (trimmed, empty when absent).
    pub related_keyword: String,

    /// Rendered indexable text.
    pub content: String,
}

impl Document {
    /// Create a document, rendering `content` from `template`.
    ///
    /// The template may reference `{title}`, `{body}` and `{related_keyword}`.
    pub fn new(
        id: DocumentId,
        title: &str,
        body: &str,
        related_keyword: &str,
        template: &str,
    ) -> Self {
        let title = title.trim().to_string();
        let body = body.trim().to_string();
        let related_keyword = related_keyword.trim().to_string();
        let content = render_content(template, &title, &body, &related_keyword);

        Self {
            id,
            title,
            body,
            related_keyword,
            content,
        }
    }
}

fn render_content(template: &str, title: &str, body: &str, related_keyword: &str) -> String {
    fill_template(
        template,
        &[
            ("title", title),
            ("body", body),
            ("related_keyword", related_keyword),
        ],
    )
}

/// Replace `{name}` placeholders in one pass.
///
/// Substituted values are never re-expanded, and braces that do not open a
/// known placeholder are copied through unchanged.
pub fn fill_template(template: &str, fields: &[(&str, &str)]) -> String {
    let extra: usize = fields.iter().map(|(_, value)| value.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let matched = fields.iter().find(|(name, _)| {
            tail.strip_prefix(name)
                .is_some_and(|after| after.starts_with('}'))
        });
        match matched {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// The read-only document set, loaded once and shared for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    /// Wrap an ordered document sequence.
    ///
    /// Fails if any document's id does not equal its position.
    pub fn new(documents: Vec<Document>) -> crate::Result<Self> {
        if let Some((pos, doc)) = documents
            .iter()
            .enumerate()
            .find(|(pos, doc)| doc.id as usize != *pos)
        {
            return Err(crate::WordError::invalid_argument(format!(
                "document at position {} has id {}",
                pos, doc.id
            )));
        }
        Ok(Self { documents })
    }

    /// Look up a document by id.
    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(id as usize)
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when the corpus holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Iterate documents in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> + '_ {
        self.documents.iter()
    }

    /// All documents as a slice.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Blake3 digest over every document's rendered content, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for doc in &self.documents {
            hasher.update(&doc.id.to_le_bytes());
            hasher.update(doc.content.as_bytes());
            hasher.update(&[0]);
        }
        hex::encode(hasher.finalize().as_bytes())
    }
}

/// One entry of a single retriever's result list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedHit {
    /// Matched document.
    pub document_id: DocumentId,

    /// Retriever-local score (higher is better, not comparable across retrievers).
    pub score: f32,

    /// Position in the retriever's list (1-based).
    pub rank: u32,
}

/// One entry of the fused ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    /// Matched document.
    pub document_id: DocumentId,

    /// Combined score.
    pub fused_score: f32,

    /// Position in the fused list (1-based).
    pub fused_rank: u32,
}
