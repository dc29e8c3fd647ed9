use callsight::answer::Answerer;
use callsight::chunking::Chunker;
use callsight::cli::{Cli, Commands, ConfigAction};
use callsight::config::{expand_path, Config};
use callsight::embedding::provider_from_config;
use callsight::error::{CallsightError, Result};
use callsight::llm::chat_from_config;
use callsight::pipeline::Ingestor;
use callsight::retrieval::{Retriever, SearchQuery};
use callsight::session::Conversation;
use callsight::storage::{IndexStore, QueryResult};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("{}: {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ingest { dir, rebuild } => cmd_ingest(cli.config, dir, rebuild),
        Commands::Query {
            question,
            top_k,
            company,
            sources,
        } => cmd_query(cli.config, &question, top_k, company, sources),
        Commands::Search {
            text,
            top_k,
            company,
            json,
        } => cmd_search(cli.config, &text, top_k, company, json),
        Commands::Chat { top_k, company } => cmd_chat(cli.config, top_k, company),
        Commands::Stats => cmd_stats(cli.config),
        Commands::Companies => cmd_companies(cli.config),
        Commands::Config { action } => cmd_config(cli.config, action),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_filter = if verbose {
        "callsight=debug"
    } else {
        "callsight=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // stdout carries command output only
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_ingest(config_path: Option<PathBuf>, dir: Option<PathBuf>, rebuild: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let dir = expand_path(&dir.unwrap_or_else(|| config.transcripts.dir.clone()))?;

    let chunker = Chunker::new(config.chunking.chunk_size, config.chunking.overlap)?;

    let store = open_store(&config, false)?;
    let embedder = provider_from_config(&config.embedding)?;
    let ingestor = Ingestor::new(embedder.as_ref(), &store, chunker)
        .with_batch_size(config.embedding.batch_size);

    let report = if rebuild {
        ingestor.rebuild(&dir)?
    } else {
        ingestor.ingest_directory(&dir)?
    };

    println!("✓ Ingestion complete");
    println!("  Collection:     {}", store.collection());
    println!("  New files:      {}", report.new);
    println!("  Updated files:  {}", report.updated);
    println!("  Unchanged:      {}", report.skipped);
    println!("  Chunks indexed: {}", report.chunks_indexed);
    println!("  Requests:       {}", report.embedding_requests);
    println!("  Time:           {:.1}s", report.elapsed_ms as f64 / 1000.0);
    println!("  Total chunks:   {}", store.len()?);

    Ok(())
}

fn cmd_query(
    config_path: Option<PathBuf>,
    question: &str,
    top_k: Option<usize>,
    company: Option<String>,
    sources: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config, true)?;
    let embedder = provider_from_config(&config.embedding)?;
    let chat = chat_from_config(&config.llm)?;

    let query = SearchQuery::new(question, top_k.unwrap_or(config.retrieval.top_k))
        .with_company(company);
    let result = Retriever::new(embedder.as_ref(), &store).retrieve(&query)?;
    let answer = Answerer::new(chat.as_ref()).answer(question, &result)?;

    println!("{}", answer);

    if sources {
        println!();
        print_sources(&result);
    }

    Ok(())
}

fn cmd_search(
    config_path: Option<PathBuf>,
    text: &str,
    top_k: Option<usize>,
    company: Option<String>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config, true)?;
    let embedder = provider_from_config(&config.embedding)?;

    let query =
        SearchQuery::new(text, top_k.unwrap_or(config.retrieval.top_k)).with_company(company);
    let result = Retriever::new(embedder.as_ref(), &store).retrieve(&query)?;

    if json {
        let output = serde_json::to_string_pretty(&result).map_err(|e| CallsightError::Json {
            source: e,
            context: "Failed to serialize search results".to_string(),
        })?;
        println!("{}", output);
        return Ok(());
    }

    if result.is_empty() {
        println!("No matching excerpts found.");
        return Ok(());
    }

    for (i, hit) in result.iter().enumerate() {
        let meta = &hit.entry.metadata;
        println!(
            "{}. [{:.3}] {} ({}, chunk {})",
            i + 1,
            hit.score,
            meta.label(),
            meta.source_filename,
            meta.chunk_index
        );
        println!("   {}", preview(&hit.entry.text, 200));
        println!();
    }

    Ok(())
}

fn cmd_chat(config_path: Option<PathBuf>, top_k: Option<usize>, company: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config, true)?;
    let embedder = provider_from_config(&config.embedding)?;
    let chat = chat_from_config(&config.llm)?;

    let retriever = Retriever::new(embedder.as_ref(), &store);
    let answerer = Answerer::new(chat.as_ref());
    let limit = top_k.unwrap_or(config.retrieval.top_k);
    let mut conversation = Conversation::new();

    tracing::debug!("Started conversation {}", conversation.id);
    println!("Ask about the indexed earnings calls. Type 'exit' to quit.");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush().map_err(|e| CallsightError::Io {
            source: e,
            context: "Failed to flush stdout".to_string(),
        })?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.map_err(|e| CallsightError::Io {
            source: e,
            context: "Failed to read from stdin".to_string(),
        })?;

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let query = SearchQuery::new(question, limit).with_company(company.clone());
        let result = retriever.retrieve(&query)?;
        let answer = answerer.answer_with_history(
            question,
            &result,
            conversation.recent(config.retrieval.history_turns),
        )?;

        println!("\n{}", answer);
        conversation.record(question, answer);
    }

    tracing::info!(
        "Chat ended after {} questions ({}s)",
        conversation.len(),
        conversation.duration().num_seconds()
    );
    Ok(())
}

fn cmd_stats(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config, true)?;
    let stats = store.stats()?;

    println!("Index: {}", store.path().display());
    println!("  Collection:      {}", stats.collection);
    println!("  Transcripts:     {}", stats.total_files);
    println!("  Chunks:          {}", stats.total_chunks);
    println!("  Companies:       {}", stats.companies);
    println!(
        "  Embedding model: {}",
        stats.embedding_model.as_deref().unwrap_or("-")
    );
    println!(
        "  Dimension:       {}",
        stats
            .dimension
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "  Last update:     {}",
        stats.last_update.as_deref().unwrap_or("never")
    );

    Ok(())
}

fn cmd_companies(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config, true)?;

    let companies = store.companies()?;
    if companies.is_empty() {
        println!("No companies indexed yet.");
    }
    for company in companies {
        println!("{}", company);
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| CallsightError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::debug!(
            "Config file {} not found, using defaults. Run 'callsight config init' to create one.",
            path.display()
        );
        return Config::from_env();
    }

    Config::load(&path)
}

fn open_store(config: &Config, must_exist: bool) -> Result<IndexStore> {
    let index_dir = expand_path(&config.storage.index_dir)?;
    let store = if must_exist {
        IndexStore::open_existing(&index_dir, &config.storage.collection)?
    } else {
        IndexStore::open(&index_dir, &config.storage.collection)?
    };
    Ok(store)
}

fn print_sources(result: &QueryResult) {
    if result.is_empty() {
        println!("Sources: none");
        return;
    }

    println!("Sources:");
    for (i, hit) in result.iter().enumerate() {
        let meta = &hit.entry.metadata;
        println!(
            "  [{}] {} | {}, chunk {} | similarity {:.3}",
            i + 1,
            meta.label(),
            meta.source_filename,
            meta.chunk_index,
            hit.score
        );
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max_chars {
        let truncated: String = flat.chars().take(max_chars).collect();
        format!("{}...", truncated)
    } else {
        flat
    }
}

