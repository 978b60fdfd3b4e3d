//! CSV corpus loader.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use word_core::{Corpus, Document, DocumentId, Result, WordError, DEFAULT_CONTENT_TEMPLATE};

/// Columns every corpus file must carry. `content` becomes [`Document::body`].
pub const REQUIRED_COLUMNS: [&str; 3] = ["title", "content", "related_keyword"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Loads a corpus from CSV.
#[derive(Debug, Clone)]
pub struct CorpusLoader {
    content_template: String,
}

impl CorpusLoader {
    /// Create a loader using the default content template.
    pub fn new() -> Self {
        Self {
            content_template: DEFAULT_CONTENT_TEMPLATE.to_string(),
        }
    }

    /// Create a loader with a custom content template.
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            content_template: template.into(),
        }
    }

    /// Read and parse a corpus file.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Corpus> {
        let path = path.as_ref();
        info!("Loading corpus from {:?}", path);

        let bytes = std::fs::read(path).map_err(|e| WordError::corpus_load(path, e.to_string()))?;
        let corpus = self.parse(&bytes, path)?;

        info!(
            "Loaded {} documents (fingerprint {})",
            corpus.len(),
            &corpus.fingerprint()[..12]
        );
        Ok(corpus)
    }

    /// Parse corpus bytes. `origin` is only used in error messages.
    pub fn parse(&self, bytes: &[u8], origin: &Path) -> Result<Corpus> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| WordError::corpus_load(origin, format!("unreadable header: {}", e)))?
            .clone();
        let columns = ColumnMap::resolve(&headers)
            .map_err(|reason| WordError::corpus_load(origin, reason))?;

        let mut documents = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                WordError::corpus_load(origin, format!("row {}: {}", row + 1, e))
            })?;

            let id = DocumentId::try_from(documents.len())
                .map_err(|_| WordError::corpus_load(origin, "corpus exceeds u32 rows"))?;
            let doc = Document::new(
                id,
                columns.field(&record, columns.title),
                columns.field(&record, columns.body),
                columns.field(&record, columns.related_keyword),
                &self.content_template,
            );

            if doc.title.is_empty() {
                debug!("Row {} has no title", row + 1);
            }
            documents.push(doc);
        }

        Corpus::new(documents)
    }
}

impl Default for CorpusLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Header positions of the required columns.
struct ColumnMap {
    title: usize,
    body: usize,
    related_keyword: usize,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> std::result::Result<Self, String> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| format!("missing required column '{}'", name))
        };

        Ok(Self {
            title: position(REQUIRED_COLUMNS[0])?,
            body: position(REQUIRED_COLUMNS[1])?,
            related_keyword: position(REQUIRED_COLUMNS[2])?,
        })
    }

    /// Missing trailing fields read as empty.
    fn field<'r>(&self, record: &'r StringRecord, index: usize) -> &'r str {
        record.get(index).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(csv: &str) -> Result<Corpus> {
        CorpusLoader::new().parse(csv.as_bytes(), Path::new("test.csv"))
    }

    #[test]
    fn test_load_basic_rows() {
        let corpus = parse(
            "title,content,related_keyword\n\
             금리,이자율을 의미합니다.,이자\n\
             환율,두 나라 화폐의 교환 비율,외환\n",
        )
        .unwrap();

        assert_eq!(corpus.len(), 2);
        let first = corpus.get(0).unwrap();
        assert_eq!(first.id, 0);
        assert_eq!(first.title, "금리");
        assert_eq!(first.body, "이자율을 의미합니다.");
        assert_eq!(first.related_keyword, "이자");
        assert_eq!(first.content, "단어: 금리\n설명: 이자율을 의미합니다.");
        assert_eq!(corpus.get(1).unwrap().id, 1);
    }

    #[test]
    fn test_blank_fields_become_empty_strings() {
        let corpus = CorpusLoader::with_template("Term: {title}\nDescription: {body}")
            .parse(
                "title,content,related_keyword\n,  some body  ,\n".as_bytes(),
                Path::new("test.csv"),
            )
            .unwrap();

        let doc = corpus.get(0).unwrap();
        assert_eq!(doc.title, "");
        assert_eq!(doc.related_keyword, "");
        assert_eq!(doc.content, "Term: \nDescription: some body");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let corpus = parse("title,content,related_keyword\n인플레이션\n").unwrap();
        let doc = corpus.get(0).unwrap();
        assert_eq!(doc.title, "인플레이션");
        assert_eq!(doc.body, "");
        assert_eq!(doc.related_keyword, "");
    }

    #[test]
    fn test_column_order_and_extra_columns() {
        let corpus = parse(
            "\u{feff}id,related_keyword,content,title\n7,물가,\"여러 줄\n설명\",인플레이션\n",
        )
        .unwrap();
        let doc = corpus.get(0).unwrap();
        assert_eq!(doc.title, "인플레이션");
        assert_eq!(doc.body, "여러 줄\n설명");
        assert_eq!(doc.related_keyword, "물가");
    }

    #[test]
    fn test_missing_column_is_error() {
        let err = parse("title,content\n금리,이자율\n").unwrap_err();
        assert!(matches!(err, WordError::CorpusLoad { .. }));
        assert!(err.to_string().contains("related_keyword"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = CorpusLoader::new()
            .load("/nonexistent/700words.csv")
            .unwrap_err();
        assert_eq!(err.error_code(), "CORPUS_LOAD_ERROR");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "title,content,related_keyword").unwrap();
        writeln!(file, "국내총생산,한 나라의 생산 총액,GDP").unwrap();

        let corpus = CorpusLoader::new().load(file.path()).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.get(0).unwrap().related_keyword, "GDP");
    }
}
