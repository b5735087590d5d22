use anyhow::{Context as AnyhowContext, Result};
use async_trait::async_trait;
use citeseek_answer::{AnswerConfig, AnswerPipeline, Drafter, DraftingError, GenerateOptions};
use citeseek_citation::{CitationProcessor, ReferenceMap};
use citeseek_index_store::{
    DocumentCorpus, Embedder, HashingEmbedder, IndexStore, MemoryIndexStore, ScopeFilter,
};
use citeseek_protocol::{Citation, ReferenceEntry, Source};
use clap::{Args, Parser, Subcommand};
use remote::{Endpoint, OpenAiCompatDrafter, OpenAiCompatEmbedder};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

mod remote;

#[derive(Parser)]
#[command(name = "citeseek")]
#[command(about = "Citation-grounded answers over a document corpus", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Pipeline configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan, retrieve and diversify evidence; print the numbered reference table
    Retrieve(RetrieveArgs),

    /// Answer a question with validated citations
    Ask(AskArgs),

    /// Validate and renumber the citations of a draft against a saved reference table
    CheckCitations(CheckCitationsArgs),

    /// List indexed chunks in scope
    Chunks(ChunksArgs),
}

#[derive(Args)]
struct CorpusArgs {
    /// JSON corpus file (schema_version 1)
    #[arg(long)]
    corpus: PathBuf,

    /// OpenAI-compatible embeddings endpoint; the local hashing embedder is used otherwise
    #[arg(long)]
    embed_url: Option<String>,

    /// Embedding model served at --embed-url
    #[arg(long, default_value = "text-embedding-3-small")]
    embed_model: String,

    /// Embedding dimension
    #[arg(long, default_value_t = HashingEmbedder::DEFAULT_DIMENSION)]
    embed_dim: usize,
}

#[derive(Args)]
struct ScopeArgs {
    /// Restrict to these document ids (repeatable)
    #[arg(long = "document")]
    documents: Vec<String>,

    /// Restrict to these document collections (repeatable)
    #[arg(long = "collection-id")]
    collection_ids: Vec<String>,

    /// Restrict to documents owned by this user
    #[arg(long)]
    owner: Option<String>,
}

impl ScopeArgs {
    fn filter(&self) -> ScopeFilter {
        ScopeFilter {
            collection_ids: self.collection_ids.clone(),
            owner_id: self.owner.clone(),
            document_ids: self.documents.clone(),
        }
    }
}

#[derive(Args)]
struct LlmArgs {
    /// OpenAI-compatible base URL, e.g. http://localhost:11434/v1
    #[arg(long)]
    llm_url: Option<String>,

    #[arg(long, default_value = "gpt-4o-mini")]
    llm_model: String,

    /// Environment variable holding the API key (used for both LLM and embeddings)
    #[arg(long, default_value = "OPENAI_API_KEY")]
    api_key_env: String,

    /// HTTP timeout per model call
    #[arg(long, default_value_t = 120)]
    llm_timeout_secs: u64,
}

#[derive(Args)]
struct RetrieveArgs {
    question: String,

    #[command(flatten)]
    corpus: CorpusArgs,

    #[command(flatten)]
    scope: ScopeArgs,

    /// Only used for query planning; without it the question is searched as-is
    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args)]
struct AskArgs {
    question: String,

    #[command(flatten)]
    corpus: CorpusArgs,

    #[command(flatten)]
    scope: ScopeArgs,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args)]
struct CheckCitationsArgs {
    /// Reference table: output of `retrieve`, or a bare array of entries
    #[arg(long)]
    references: PathBuf,

    /// Draft text file
    #[arg(long)]
    draft: PathBuf,
}

#[derive(Args)]
struct ChunksArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    #[command(flatten)]
    scope: ScopeArgs,

    #[arg(long, default_value_t = 50)]
    limit: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveOutput {
    subqueries: Vec<String>,
    floor: f32,
    cap: usize,
    references: Vec<ReferenceEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReferenceFile {
    Retrieval { references: Vec<ReferenceEntry> },
    Table(Vec<ReferenceEntry>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckCitationsOutput {
    answer: String,
    citations: Vec<Citation>,
    sources: Vec<Source>,
    issues: Vec<String>,
    needs_repair: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkOutput {
    id: String,
    document_id: String,
    chunk_index: u32,
    title: String,
    text: String,
}

/// Stands in when no drafting endpoint is configured; every call fails.
struct NoDrafter;

#[async_trait]
impl Drafter for NoDrafter {
    async fn generate(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _options: &GenerateOptions,
    ) -> std::result::Result<String, DraftingError> {
        Err(DraftingError::Request(
            "no drafting endpoint configured (--llm-url)".to_string(),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // reqwest/hyper internals are noisy at debug level
    if !cli.verbose {
        builder.filter_module("reqwest", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = match &cli.config {
        Some(path) => AnswerConfig::load(path)?,
        None => AnswerConfig::default(),
    };

    match cli.command {
        Commands::Retrieve(args) => run_retrieve(args, config).await?,
        Commands::Ask(args) => run_ask(args, config).await?,
        Commands::CheckCitations(args) => run_check_citations(args, &config)?,
        Commands::Chunks(args) => run_chunks(args, &config).await?,
    }

    Ok(())
}

async fn run_retrieve(args: RetrieveArgs, mut config: AnswerConfig) -> Result<()> {
    let drafter = build_drafter(&args.llm)?;
    if drafter.is_none() {
        config.planner.enabled = false;
    }
    let drafter = drafter.unwrap_or_else(|| Arc::new(NoDrafter) as Arc<dyn Drafter>);
    let (store, embedder) = load_corpus(&args.corpus, &args.llm, &config).await?;
    let pipeline = AnswerPipeline::new(&config, store, embedder, drafter);

    let retrieval = pipeline
        .retrieve(&args.question, &args.scope.filter(), &cancel_on_ctrl_c())
        .await?;
    print_json(&RetrieveOutput {
        subqueries: retrieval.subqueries,
        floor: retrieval.plan.floor,
        cap: retrieval.plan.cap,
        references: retrieval.references.entries().to_vec(),
    })
}

async fn run_ask(args: AskArgs, config: AnswerConfig) -> Result<()> {
    let drafter = build_drafter(&args.llm)?
        .context("`ask` needs a drafting endpoint: pass --llm-url")?;
    let (store, embedder) = load_corpus(&args.corpus, &args.llm, &config).await?;
    let pipeline = AnswerPipeline::new(&config, store, embedder, drafter);

    let result = pipeline
        .answer(&args.question, &args.scope.filter(), &cancel_on_ctrl_c())
        .await?;
    print_json(&result)
}

fn run_check_citations(args: CheckCitationsArgs, config: &AnswerConfig) -> Result<()> {
    let raw = std::fs::read_to_string(&args.references)
        .with_context(|| format!("Failed to read {}", args.references.display()))?;
    let entries = match serde_json::from_str::<ReferenceFile>(&raw)
        .with_context(|| format!("Invalid reference table {}", args.references.display()))?
    {
        ReferenceFile::Retrieval { references } | ReferenceFile::Table(references) => references,
    };
    let references = ReferenceMap::from_entries(entries)?;
    let draft = std::fs::read_to_string(&args.draft)
        .with_context(|| format!("Failed to read {}", args.draft.display()))?;

    let processed = CitationProcessor::new(config.citations.clone()).process(&draft, &references);
    print_json(&CheckCitationsOutput {
        needs_repair: processed.needs_repair(),
        issues: processed.issues.iter().map(ToString::to_string).collect(),
        answer: processed.answer,
        citations: processed.citations,
        sources: processed.sources,
    })
}

async fn run_chunks(args: ChunksArgs, config: &AnswerConfig) -> Result<()> {
    let embedder = build_embedder(&args.corpus, None)?;
    let store = load_store(&args.corpus, embedder.as_ref(), &config.collection).await?;
    let points = store
        .scroll(&config.collection, &args.scope.filter(), args.limit)
        .await?;
    let chunks: Vec<ChunkOutput> = points
        .into_iter()
        .map(|point| ChunkOutput {
            id: point.id,
            document_id: point.payload.document_id,
            chunk_index: point.payload.chunk_index,
            title: point.payload.title,
            text: point.payload.chunk_text,
        })
        .collect();
    print_json(&chunks)
}

fn build_drafter(llm: &LlmArgs) -> Result<Option<Arc<dyn Drafter>>> {
    let Some(base_url) = &llm.llm_url else {
        return Ok(None);
    };
    let drafter = OpenAiCompatDrafter::new(Endpoint {
        base_url: base_url.clone(),
        model: llm.llm_model.clone(),
        api_key: std::env::var(&llm.api_key_env).ok(),
        timeout: Duration::from_secs(llm.llm_timeout_secs),
    })?;
    Ok(Some(Arc::new(drafter)))
}

fn build_embedder(corpus: &CorpusArgs, llm: Option<&LlmArgs>) -> Result<Arc<dyn Embedder>> {
    match &corpus.embed_url {
        Some(base_url) => {
            let api_key = llm.and_then(|llm| std::env::var(&llm.api_key_env).ok());
            let timeout = llm.map_or(120, |llm| llm.llm_timeout_secs);
            let embedder = OpenAiCompatEmbedder::new(
                Endpoint {
                    base_url: base_url.clone(),
                    model: corpus.embed_model.clone(),
                    api_key,
                    timeout: Duration::from_secs(timeout),
                },
                corpus.embed_dim,
            )?;
            Ok(Arc::new(embedder))
        }
        None => Ok(Arc::new(HashingEmbedder::new(corpus.embed_dim)?)),
    }
}

async fn load_store(
    corpus: &CorpusArgs,
    embedder: &dyn Embedder,
    collection: &str,
) -> Result<MemoryIndexStore> {
    let documents = DocumentCorpus::load(&corpus.corpus)
        .await
        .with_context(|| format!("Failed to load corpus {}", corpus.corpus.display()))?;
    Ok(documents.into_store(embedder, collection).await?)
}

async fn load_corpus(
    corpus: &CorpusArgs,
    llm: &LlmArgs,
    config: &AnswerConfig,
) -> Result<(Arc<dyn IndexStore>, Arc<dyn Embedder>)> {
    let embedder = build_embedder(corpus, Some(llm))?;
    let store = load_store(corpus, embedder.as_ref(), &config.collection).await?;
    log::info!(
        "Loaded {} chunks into collection '{}'",
        store.len(&config.collection),
        config.collection
    );
    Ok((Arc::new(store), embedder))
}

/// Cancels in-flight retrieval and drafting on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling request");
            child.cancel();
        }
    });
    token
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
