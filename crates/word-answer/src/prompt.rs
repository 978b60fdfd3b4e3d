//! Prompt templates for the answer synthesizer.

use std::path::Path;

use word_core::{fill_template, Document, Result, WordError};

/// Placeholder for the user's query.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Placeholder for the newline-joined `content` of the retrieved documents.
pub const CONTENTS_PLACEHOLDER: &str = "{retrieved_contents}";

/// Built-in "today's word" blog-post prompt.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
당신은 경제 용어를 친절하고 쉽게 풀어 설명하는 작가입니다.
경제 지식이 없거나 경제 개념을 쉽게 배우고 싶은 독자를 위해 '오늘의 단어' 글을 작성합니다.

먼저 단어의 정의를 자세히 설명하고, 일상생활에서 찾아볼 수 있는 예시를 하나 간단히 들어 주세요.
마지막으로 이 용어를 이해하는 것이 왜 중요한지 요약하며 글을 마무리해 주세요.
경제를 전혀 모르는 사람도 흥미롭게 읽을 수 있도록 친근한 말투로 작성해 주세요.

# 주의사항:
1. 아래 단락의 내용만을 근거로 작성하세요. 내용을 지어내거나 사실과 다르게 쓰지 마세요.
2. 설명할 수 없는 부분이 있다면 '모르겠습니다'라고 답하세요.
3. 소제목은 #이나 ## 같은 Markdown 기호 대신 굵은 글씨(**)로 표시하세요. 예: '## 경기는' 대신 '**경기**는'.
4. 본문은 일반 텍스트로 쓰고, 필요한 경우 단어에만 굵은 글씨를 사용하세요.
5. 글 전체의 제목은 넣지 마세요.

이제 주제에 맞게 블로그 글을 작성해 주세요.
질문: {query}
단락: {retrieved_contents}
답변:
";

/// A prompt template with `{query}` and `{retrieved_contents}` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Wrap a template string, checking that both placeholders are present.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in [QUERY_PLACEHOLDER, CONTENTS_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(WordError::config(format!(
                    "prompt template is missing the {} placeholder",
                    placeholder
                )));
            }
        }
        Ok(Self { template })
    }

    /// Read a template from a UTF-8 text file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let template = std::fs::read_to_string(path).map_err(|e| {
            WordError::config(format!("Failed to read prompt template {:?}: {}", path, e))
        })?;
        Self::new(template)
    }

    /// Fill the template with `query` and the documents' `content`, one per line.
    ///
    /// With no documents the contents slot is left empty; the prompt is
    /// still well-formed.
    pub fn render(&self, query: &str, documents: &[&Document]) -> String {
        let retrieved_contents = documents
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        fill_template(
            &self.template,
            &[
                ("query", query),
                ("retrieved_contents", &retrieved_contents),
            ],
        )
    }

    /// The raw template text.
    pub fn as_str(&self) -> &str {
        &self.template
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}
