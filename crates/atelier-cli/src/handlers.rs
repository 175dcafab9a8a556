use anyhow::{Context as _, Result, bail};
use chrono::{DateTime, Local};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use atelier_agent::{
    AgentTeam, MemoryStore, ResearchClient, assemble_context, chat_stream, extract_facts,
    format_research_context, should_research,
};
use atelier_context::{
    EmbeddingProvider as _, IndexObserver, IndexStore, Indexer, OllamaEmbeddingClient, Retriever,
    format_retrieval_context,
};
use atelier_core::{
    ChatMessage, Config, EventChannel, FileContext, ModelProvider as _, PipelineEvent,
};
use atelier_providers::OllamaProvider;

use crate::cli::{Cli, Command, MemoryAction};

/// Dispatches a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(|| PathBuf::from("atelier.toml"));
    let config = Config::load_or_default(Some(&config_path));

    match cli.command {
        Command::Index { path } => index(&config, path).await,
        Command::Search { query, top_k } => search(&config, &query, top_k).await,
        Command::Chat {
            prompt,
            file,
            no_research,
        } => chat(&config, &prompt, file, no_research).await,
        Command::Team { request, file } => team(&config, &request, file).await,
        Command::Status => status(&config).await,
        Command::Memory { action } => memory(&config, &action),
    }
}

/// Data directory for the persisted index and memory files.
fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".atelier")
}

async fn index(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let root = match path {
        Some(path) => path,
        None => std::env::current_dir().context("Cannot resolve the current directory")?,
    };

    let client = OllamaEmbeddingClient::new(&config.models);
    client
        .ensure_model_available()
        .await
        .context("Embedding model is not ready")?;

    let store = Arc::new(IndexStore::load(data_dir().join("index.bin")).await);
    let indexer = Indexer::new(Arc::clone(&store), client, config.index.clone());

    let observer: IndexObserver = Arc::new(|progress| match (progress.done, progress.total) {
        (Some(done), Some(total)) => println!("  [{done}/{total}] {}", progress.message),
        _ => println!("  {}", progress.message),
    });

    let summary = indexer.index_workspace(&root, Some(observer)).await?;
    println!(
        "Indexed {} chunks from {} files under {}",
        summary.chunks,
        summary.files,
        root.display()
    );
    Ok(())
}

async fn search(config: &Config, query: &str, top_k: usize) -> Result<()> {
    let store = Arc::new(IndexStore::load(data_dir().join("index.bin")).await);
    if store.snapshot().is_empty() {
        bail!("The index is empty. Run `atelier index <path>` first.");
    }

    let retriever = Retriever::new(
        store,
        OllamaEmbeddingClient::new(&config.models),
        config.search.clone(),
    );
    let results = retriever.search(query, top_k).await;

    if results.is_empty() {
        println!("No sufficiently relevant chunks found.");
        return Ok(());
    }
    for result in &results {
        println!(
            "{:5.1}%  {} (lines {}-{})",
            f64::from(result.score) * 100.0,
            result.chunk.file_path,
            result.chunk.start_line,
            result.chunk.end_line
        );
    }
    Ok(())
}

async fn status(config: &Config) -> Result<()> {
    let store = IndexStore::load(data_dir().join("index.bin")).await;
    let status = store.status();

    println!("Workspace : {}", status.workspace.display());
    println!("Chunks    : {}", status.chunks);
    println!(
        "Indexed at: {}",
        status.indexed_at.map_or_else(
            || "never".to_owned(),
            |time| DateTime::<Local>::from(time)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        )
    );
    println!("Embedding : {}", config.models.embedding_model);
    println!("Chat model: {}", config.models.chat_model);
    Ok(())
}

async fn chat(
    config: &Config,
    prompt: &str,
    file: Option<PathBuf>,
    no_research: bool,
) -> Result<()> {
    let provider = OllamaProvider::new(&config.models);
    if !provider.is_available().await {
        bail!(
            "Ollama is not reachable at {}. Start it with `ollama serve`.",
            config.models.ollama_host
        );
    }

    let mut memory_store = MemoryStore::load(data_dir().join("memory.json"), &config.memory);
    let context_block = build_context_block(config, prompt, file.as_deref(), no_research, &mut memory_store).await?;

    let (events, receiver) = EventChannel::new();
    let printer = spawn_event_printer(receiver);

    let history = vec![ChatMessage::user(prompt)];
    let response = chat_stream(&provider, &context_block, &history, &events).await;
    drop(events);
    printer.await?;

    let response = response?;

    // Distill anything worth remembering from this turn; extraction is
    // best-effort and silent.
    let facts = extract_facts(&provider, prompt, &response).await;
    if !facts.is_empty() {
        memory_store.add_facts(&facts);
    }
    Ok(())
}

async fn team(config: &Config, request: &str, file: Option<PathBuf>) -> Result<()> {
    let provider = OllamaProvider::new(&config.models);
    if !provider.is_available().await {
        bail!(
            "Ollama is not reachable at {}. Start it with `ollama serve`.",
            config.models.ollama_host
        );
    }

    let mut memory_store = MemoryStore::load(data_dir().join("memory.json"), &config.memory);
    let context_block =
        build_context_block(config, request, file.as_deref(), true, &mut memory_store).await?;

    let (events, receiver) = EventChannel::new();
    let printer = spawn_event_printer(receiver);

    let team = AgentTeam::new(Arc::new(provider));
    let outcome = team.run(request, &context_block, &events).await;
    drop(events);
    printer.await?;

    drop(outcome?);
    Ok(())
}

/// Gathers memory, open-file, retrieval, and research parts into the
/// context block both generation modes share.
async fn build_context_block(
    config: &Config,
    query: &str,
    file: Option<&Path>,
    no_research: bool,
    memory_store: &mut MemoryStore,
) -> Result<String> {
    let memory_block = memory_store.context_block();

    let file_context = match file {
        Some(path) => Some(
            FileContext::from_path(&path.to_path_buf())
                .with_context(|| format!("Cannot read {}", path.display()))?,
        ),
        None => None,
    };

    let store = Arc::new(IndexStore::load(data_dir().join("index.bin")).await);
    let retrieval_block = if store.snapshot().is_empty() {
        String::new()
    } else {
        let retriever = Retriever::new(
            store,
            OllamaEmbeddingClient::new(&config.models),
            config.search.clone(),
        );
        format_retrieval_context(&retriever.search(query, config.search.top_k).await)
    };

    let research_block = if !no_research && should_research(query) {
        let research = ResearchClient::new();
        let findings = research
            .research(query, Some(&|message: &str| eprintln!("  {message}")))
            .await;
        format_research_context(&findings)
    } else {
        String::new()
    };

    Ok(assemble_context(
        &memory_block,
        file_context.as_ref(),
        &retrieval_block,
        &research_block,
    ))
}

fn memory(config: &Config, action: &MemoryAction) -> Result<()> {
    let mut store = MemoryStore::load(data_dir().join("memory.json"), &config.memory);

    match action {
        MemoryAction::Add { fact } => {
            store.add(fact);
            println!("Remembered. {} facts total.", store.len());
        }
        MemoryAction::List => {
            if store.is_empty() {
                println!("Nothing remembered yet.");
            }
            for (index, memory) in store.all().iter().enumerate() {
                println!(
                    "{index:3}. {} (used {}x, added {})",
                    memory.fact,
                    memory.use_count,
                    memory.added_at.format("%Y-%m-%d")
                );
            }
        }
        MemoryAction::Clear => {
            store.clear();
            println!("All memories cleared.");
        }
    }
    Ok(())
}

/// Renders pipeline events to the terminal as they arrive.
fn spawn_event_printer(mut receiver: UnboundedReceiver<PipelineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        while let Some(event) = receiver.recv().await {
            match event {
                PipelineEvent::StageStart { label, .. } => {
                    println!("\n── {label} ──");
                }
                PipelineEvent::StageChunk { text, .. } => {
                    print!("{text}");
                    drop(stdout.flush());
                }
                PipelineEvent::StageDone { .. } => println!(),
                PipelineEvent::AllDone => {}
                PipelineEvent::Error { message } => {
                    eprintln!("\nError: {message}");
                }
            }
        }
    })
}
