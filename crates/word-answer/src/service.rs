//! The retrieval service: one explicit build step, then many queries.

use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::{Builder, Runtime};
use tracing::info;

use word_core::{Corpus, Embedder, Generator, Result, WordConfig};
use word_corpus::CorpusLoader;
use word_query::{HybridRetriever, IndexStats, Retrieval};

use crate::prompt::PromptTemplate;
use crate::synthesizer::AnswerSynthesizer;

/// The result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Generated text.
    pub text: String,

    /// The prompt that produced it.
    pub prompt: String,

    /// Rankings behind the prompt.
    pub retrieval: Retrieval,
}

/// Corpus index plus synthesizer, shared read-only by every request.
///
/// Created by [`RetrievalService::initialize`] and held by the caller for
/// the life of the process. Wrap it in an `Arc` to serve concurrent requests.
pub struct RetrievalService {
    retriever: HybridRetriever,
    synthesizer: AnswerSynthesizer,
}

impl RetrievalService {
    /// Load the corpus named in `config` and build both indexes.
    ///
    /// Fails with a corpus load error if the file is missing or malformed,
    /// and with an embedding error if the corpus cannot be embedded.
    pub async fn initialize(
        config: WordConfig,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        config.validate()?;
        let corpus = CorpusLoader::with_template(config.corpus.content_template.as_str())
            .load(&config.corpus.path)?;
        Self::from_corpus(corpus, config, embedder, generator).await
    }

    /// Build the service over an already loaded corpus.
    pub async fn from_corpus(
        corpus: Corpus,
        config: WordConfig,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        let start = Instant::now();

        let template = match &config.generation.prompt_template_path {
            Some(path) => PromptTemplate::from_file(path)?,
            None => PromptTemplate::default(),
        };
        let synthesizer = AnswerSynthesizer::new(template, generator, config.generation.params());

        let retriever =
            HybridRetriever::build(Arc::new(corpus), embedder, config.retrieval).await?;

        info!(
            "Retrieval service initialized in {}ms",
            start.elapsed().as_millis()
        );

        Ok(Self {
            retriever,
            synthesizer,
        })
    }

    /// Retrieve, fuse, render and generate.
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        let retrieval = self.retriever.retrieve(query).await?;
        let documents = self.retriever.documents(&retrieval.fused);
        let prompt = self.synthesizer.render(query, &documents);
        let text = self.synthesizer.generate(&prompt).await?;

        Ok(Answer {
            text,
            prompt,
            retrieval,
        })
    }

    /// Generated text for `query`.
    pub async fn generate_response(&self, query: &str) -> Result<String> {
        Ok(self.answer(query).await?.text)
    }

    /// Retrieval only, without generation.
    pub async fn retrieve(&self, query: &str) -> Result<Retrieval> {
        self.retriever.retrieve(query).await
    }

    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    pub fn synthesizer(&self) -> &AnswerSynthesizer {
        &self.synthesizer
    }

    pub fn stats(&self) -> IndexStats {
        self.retriever.stats()
    }
}

/// Synchronous front end for callers without an async runtime.
///
/// Owns one runtime for its whole life, so connection pools the providers
/// open stay usable between calls. Must not be created, called or dropped
/// from inside an async context.
pub struct BlockingRetrievalService {
    runtime: Runtime,
    service: RetrievalService,
}

impl BlockingRetrievalService {
    /// Start the runtime and build the service on it.
    pub fn initialize(
        config: WordConfig,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("word-rag")
            .enable_all()
            .build()?;
        let service = runtime.block_on(RetrievalService::initialize(config, embedder, generator))?;
        Ok(Self { runtime, service })
    }

    /// Blocking form of [`RetrievalService::generate_response`].
    pub fn generate_response(&self, query: &str) -> Result<String> {
        self.runtime.block_on(self.service.generate_response(query))
    }

    /// Blocking form of [`RetrievalService::answer`].
    pub fn answer(&self, query: &str) -> Result<Answer> {
        self.runtime.block_on(self.service.answer(query))
    }

    pub fn service(&self) -> &RetrievalService {
        &self.service
    }
}
