//! word - Command-line interface for the today's-word RAG core.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use word_answer::{answer_with_fallback, EchoGenerator, OpenAiGenerator, RetrievalService};
use word_core::{Embedder, EmbeddingProvider, Generator, RankedHit, Result, WordConfig, WordError};
use word_corpus::CorpusLoader;
use word_query::HybridRetriever;

/// word - Hybrid-retrieval "today's word" generator for economic terms
#[derive(Parser)]
#[command(name = "word")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: user config dir, then ./word-rag.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Corpus CSV, overriding the configured path
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use the hashing embedder and echo the prompt instead of calling a model
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a "today's word" post for a query
    Ask {
        /// Query, e.g. a term such as 금리
        query: String,

        /// Do not retry with the fallback query after a content-policy rejection
        #[arg(long)]
        no_fallback: bool,

        /// Print the rendered prompt before the answer
        #[arg(long)]
        show_prompt: bool,
    },

    /// Show dense, sparse and fused rankings without generating
    Search {
        /// Search query
        query: String,
    },

    /// Show corpus and index statistics
    Stats,

    /// Write the default configuration file
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "word-rag.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(cli: &Cli) -> Result<WordConfig> {
    let mut config = match &cli.config {
        Some(path) => WordConfig::load(path)?,
        None => WordConfig::load_default()?,
    };
    if let Some(corpus) = &cli.corpus {
        config.corpus.path = corpus.clone();
    }
    if cli.offline {
        config.embedding.provider = EmbeddingProvider::Hashing;
    }
    Ok(config)
}

fn make_generator(config: &WordConfig, offline: bool) -> Result<Arc<dyn Generator>> {
    if offline {
        return Ok(Arc::new(EchoGenerator));
    }
    Ok(Arc::new(OpenAiGenerator::from_config(&config.generation)?))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error [{}]: {}", e.error_code(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::InitConfig { output, force } = &cli.command {
        return init_config(output, *force);
    }

    let config = load_config(&cli)?;
    let embedder = word_embed::from_config(&config.embedding)?;

    match &cli.command {
        Commands::Ask {
            query,
            no_fallback,
            show_prompt,
        } => {
            let generator = make_generator(&config, cli.offline)?;
            ask(config, embedder, generator, query, *no_fallback, *show_prompt).await
        }
        Commands::Search { query } => {
            let retriever = build_retriever(&config, embedder).await?;
            search(&retriever, query).await
        }
        Commands::Stats => {
            let retriever = build_retriever(&config, embedder).await?;
            stats(&retriever, &config);
            Ok(())
        }
        Commands::InitConfig { .. } => Ok(()),
    }
}

fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(WordError::invalid_argument(format!(
            "{} already exists (use --force to overwrite)",
            output.display()
        )));
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, WordConfig::default().to_toml()?)?;
    println!("Wrote default configuration to: {}", output.display());
    Ok(())
}

async fn build_retriever(config: &WordConfig, embedder: Arc<dyn Embedder>) -> Result<HybridRetriever> {
    config.validate()?;
    let corpus = CorpusLoader::with_template(config.corpus.content_template.as_str())
        .load(&config.corpus.path)?;
    HybridRetriever::build(Arc::new(corpus), embedder, config.retrieval.clone()).await
}

async fn ask(
    config: WordConfig,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    query: &str,
    no_fallback: bool,
    show_prompt: bool,
) -> Result<()> {
    let fallback_query = config
        .generation
        .fallback_query
        .clone()
        .filter(|q| !q.trim().is_empty() && !no_fallback);

    let service = RetrievalService::initialize(config, embedder, generator).await?;
    let output = ask_output(&service, query, fallback_query.as_deref(), show_prompt).await?;
    println!("{}", output);
    Ok(())
}

/// Run the pipeline once and format what `ask` prints. The prompt shown is
/// the one sent for the returned answer.
async fn ask_output(
    service: &RetrievalService,
    query: &str,
    fallback_query: Option<&str>,
    show_prompt: bool,
) -> Result<String> {
    let answer = match fallback_query {
        Some(fallback) => answer_with_fallback(service, query, fallback).await?,
        None => service.answer(query).await?,
    };

    if show_prompt {
        Ok(format!("{}\n{}\n{}", answer.prompt, "-".repeat(40), answer.text))
    } else {
        Ok(answer.text)
    }
}

async fn search(retriever: &HybridRetriever, query: &str) -> Result<()> {
    let retrieval = retriever.retrieve(query).await?;
    let corpus = retriever.corpus();
    let title = |id| {
        corpus
            .get(id)
            .map(|d| if d.title.is_empty() { "(untitled)" } else { d.title.as_str() })
            .unwrap_or("?")
    };

    let print_hits = |label: &str, hits: &[RankedHit]| {
        println!("{} ({} hits)", label, hits.len());
        for hit in hits {
            println!(
                "  {:>2}. [{:>4}] {:<20} score={:.4}",
                hit.rank,
                hit.document_id,
                title(hit.document_id),
                hit.score
            );
        }
    };
    print_hits("Dense", &retrieval.dense);
    print_hits("Sparse", &retrieval.sparse);

    println!("Fused ({:?}, {} kept)", retriever.config().method, retrieval.fused.len());
    for fused in &retrieval.fused {
        println!(
            "  {:>2}. [{:>4}] {:<20} score={:.4}",
            fused.fused_rank,
            fused.document_id,
            title(fused.document_id),
            fused.fused_score
        );
    }
    println!("\nCompleted in {}ms", retrieval.latency_ms);
    Ok(())
}

fn stats(retriever: &HybridRetriever, config: &WordConfig) {
    let stats = retriever.stats();
    println!("Corpus:          {}", config.corpus.path.display());
    println!("Documents:       {}", stats.documents);
    println!("Fingerprint:     {}", stats.fingerprint);
    println!("Vocabulary:      {} terms", stats.vocabulary_size);
    println!("Avg doc length:  {:.1} tokens", stats.average_doc_length);
    println!("Embedding dim:   {}", stats.dimension);
    println!("Embedding:       {:?}", config.embedding.provider);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use word_answer::MockGenerator;
    use word_core::{Corpus, Document, DEFAULT_CONTENT_TEMPLATE};
    use word_embed::HashingEmbedder;

    /// Counts query embeddings, one per retrieval.
    #[derive(Default)]
    struct CountingEmbedder {
        inner: HashingEmbedder,
        queries: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.inner.embed_documents(texts).await
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.inner.embed_query(text).await
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
    }

    async fn service(
        embedder: Arc<CountingEmbedder>,
        generator: Arc<MockGenerator>,
    ) -> RetrievalService {
        let corpus = Corpus::new(vec![
            Document::new(0, "금리", "이자율", "", DEFAULT_CONTENT_TEMPLATE),
            Document::new(1, "시장", "재화가 거래되는 곳", "", DEFAULT_CONTENT_TEMPLATE),
        ])
        .unwrap();
        RetrievalService::from_corpus(corpus, WordConfig::default(), embedder, generator)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_show_prompt_retrieves_once() {
        let embedder = Arc::new(CountingEmbedder::default());
        let mock = Arc::new(MockGenerator::new("오늘의 단어"));
        let service = service(embedder.clone(), mock.clone()).await;

        let output = ask_output(&service, "금리가 뭐야?", None, true).await.unwrap();

        assert_eq!(embedder.queries.load(Ordering::SeqCst), 1);
        let prompts = mock.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(output.starts_with(&prompts[0]));
        assert!(output.ends_with("오늘의 단어"));
    }

    #[tokio::test]
    async fn test_show_prompt_after_fallback() {
        let embedder = Arc::new(CountingEmbedder::default());
        let mock = Arc::new(MockGenerator::new("대체 응답").rejecting("질문: 위험한 질문"));
        let service = service(embedder.clone(), mock.clone()).await;

        let output = ask_output(&service, "위험한 질문", Some("시장 경제 활동"), true)
            .await
            .unwrap();

        // one retrieval per attempt
        assert_eq!(embedder.queries.load(Ordering::SeqCst), 2);
        assert!(output.contains("질문: 시장 경제 활동"));
        assert!(!output.contains("질문: 위험한 질문"));
        assert!(output.ends_with("대체 응답"));
    }

    #[tokio::test]
    async fn test_plain_output_is_the_answer() {
        let embedder = Arc::new(CountingEmbedder::default());
        let service = service(embedder, Arc::new(MockGenerator::new("답변"))).await;
        let output = ask_output(&service, "금리", None, false).await.unwrap();
        assert_eq!(output, "답변");
    }
}
