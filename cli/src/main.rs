//! `scholar`: ask questions about a paper library from the command line.
//!
//! ```bash
//! scholar --config scholar.toml ask "Which datasets do these papers use?" --project 3
//! scholar ask "Compare the methods" --paper 10 --paper 20 --stream
//! scholar search "attention heads" --section methods --top-k 5
//! scholar print-config > scholar.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_stream::StreamExt;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use scholar_agent::AgentEvent;
use scholar_cli::{App, AppConfig, ScopeArgs, replay_client};
use scholar_llm::CompletionClient;
use scholar_protocol::SectionType;
use scholar_retrieval::{RetrievalRequest, Retriever};

#[derive(Parser, Debug)]
#[command(
    name = "scholar",
    version,
    about = "Research assistant over an ingested paper library"
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, short, global = true, env = "SCHOLAR_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the assistant a question
    Ask(AskArgs),

    /// Run hybrid retrieval without the assistant
    Search(SearchArgs),

    /// Print the effective configuration as TOML
    PrintConfig,
}

#[derive(Args, Debug)]
struct AskArgs {
    /// The question
    message: String,

    #[command(flatten)]
    scope: ScopeArgs,

    /// Conversation to continue; a new one is started if omitted
    #[arg(long, value_name = "ID")]
    conversation: Option<String>,

    /// Print progress events as JSON lines. The turn is not recorded.
    #[arg(long)]
    stream: bool,

    /// Replay model replies from a file instead of calling a provider
    #[arg(long, value_name = "PATH")]
    replay: Option<PathBuf>,

    /// Print the full outcome as JSON
    #[arg(long, conflicts_with = "stream")]
    json: bool,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Search query
    query: String,

    #[command(flatten)]
    scope: ScopeArgs,

    /// Number of passages to return
    #[arg(long, default_value_t = 8, value_name = "N")]
    top_k: usize,

    /// Only search these sections (repeatable)
    #[arg(long = "section", value_name = "NAME")]
    sections: Vec<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).await?;
    debug!("Effective configuration: {config:?}");

    match cli.command {
        Command::Ask(args) => ask(&config, args).await,
        Command::Search(args) => search(&config, args).await,
        Command::PrintConfig => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn ask(config: &AppConfig, args: AskArgs) -> Result<()> {
    let llm: Option<Arc<dyn CompletionClient>> = match &args.replay {
        Some(path) => Some(replay_client(path).await?),
        None => None,
    };
    let app = App::build(config, llm).await?;
    let context = args.scope.to_context();

    if args.stream {
        let mut events = app
            .assistant
            .router()
            .run_streaming(args.message, context, Vec::new());
        while let Some(event) = events.next().await {
            println!("{}", serde_json::to_string(&event)?);
            if matches!(event, AgentEvent::MessageEnd { .. }) {
                break;
            }
        }
        return Ok(());
    }

    let conversation = args
        .conversation
        .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
    let outcome = app
        .assistant
        .ask(&conversation, &args.message, &context)
        .await
        .context("the turn could not be recorded")?;
    info!("Conversation {conversation} turn ended with {}", outcome.status);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.message());
        eprintln!("\n[{}] {} (conversation {conversation})", outcome.status, outcome.summary);
    }
    Ok(())
}

async fn search(config: &AppConfig, args: SearchArgs) -> Result<()> {
    let app = App::build(config, None).await?;
    let sections = args
        .sections
        .iter()
        .map(String::as_str)
        .map(SectionType::parse_lenient)
        .collect();
    let request = RetrievalRequest::new(&args.query, args.scope.to_context())
        .with_top_k(args.top_k)
        .with_sections(sections);
    let outcome = app.retriever.retrieve(request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    if outcome.is_empty() {
        println!("No passages matched.");
        return Ok(());
    }
    for result in &outcome.results {
        let section = result
            .chunk
            .section_type
            .map(|s| s.as_str())
            .unwrap_or("unknown");
        println!(
            "{}. paper {} [{section}] score {:.4}\n   {}",
            result.rank, result.chunk.paper_id, result.score, result.chunk.text
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_flags() {
        let cli = Cli::parse_from([
            "scholar", "ask", "what?", "--project", "3", "--paper", "10", "--paper", "20",
        ]);
        let Command::Ask(args) = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(args.message, "what?");
        assert_eq!(args.scope.project, Some(3));
        assert_eq!(args.scope.papers, vec![10, 20]);
        assert_eq!(args.scope.user, 1);
    }

    #[test]
    fn test_stream_and_json_conflict() {
        assert!(Cli::try_parse_from(["scholar", "ask", "q", "--stream", "--json"]).is_err());
    }
}
