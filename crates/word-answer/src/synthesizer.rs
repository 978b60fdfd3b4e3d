//! Prompt assembly and delegation to the generation provider.

use std::sync::Arc;

use tracing::{debug, info};

use word_core::{Document, GenerationParams, Generator, Result, WordError};

use crate::prompt::PromptTemplate;

/// Renders the prompt for a query and hands it to a [`Generator`].
pub struct AnswerSynthesizer {
    template: PromptTemplate,
    generator: Arc<dyn Generator>,
    params: GenerationParams,
}

impl AnswerSynthesizer {
    pub fn new(
        template: PromptTemplate,
        generator: Arc<dyn Generator>,
        params: GenerationParams,
    ) -> Self {
        Self {
            template,
            generator,
            params,
        }
    }

    /// Assemble the prompt text. Pure and deterministic.
    pub fn render(&self, query: &str, documents: &[&Document]) -> String {
        self.template.render(query, documents)
    }

    /// Send a rendered prompt to the generator.
    ///
    /// Every failure comes back as a generation error; a content-policy
    /// rejection keeps its own variant so callers can apply a fallback.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        info!(
            "Generating with model={}, temperature={}, prompt_len={}",
            self.params.model,
            self.params.temperature,
            prompt.chars().count()
        );
        debug!("Prompt:\n{}", prompt);

        self.generator
            .complete(prompt, &self.params)
            .await
            .map_err(|e| {
                if e.is_generation() {
                    e
                } else {
                    WordError::generation(e.to_string())
                }
            })
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }
}
