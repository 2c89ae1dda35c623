use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dinchat_agents::{ChatInput, ResponderAgent};
use dinchat_api::{build_app, ApiConfig};
use dinchat_core::IntentCatalog;
use dinchat_observability::{init_tracing, AppMetrics};
use dinchat_tenants::Store;

#[derive(Debug, Parser)]
#[command(name = "dinchat")]
#[command(about = "Rule-based FAQ responder")]
struct Cli {
    /// Directory of `*.json` tenant files.
    #[arg(long, env = "DINCHAT_TENANTS_DIR")]
    tenants_dir: Option<PathBuf>,

    /// JSON intent catalog replacing the built-in one.
    #[arg(long, env = "DINCHAT_INTENTS_FILE")]
    intents_file: Option<PathBuf>,

    #[arg(long, env = "DINCHAT_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Chat {
        #[arg(long)]
        client_id: Option<String>,
    },
    Ask {
        message: String,
        #[arg(long)]
        client_id: Option<String>,
        /// Print reply, intent and outcome as JSON.
        #[arg(long)]
        json: bool,
    },
    Intents,
    Serve {
        #[arg(long, env = "DINCHAT_BIND", default_value = "0.0.0.0:3000")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("dinchat_cli");
    let cli = Cli::parse();

    match &cli.command {
        Command::Chat { client_id } => {
            let agent = build_agent(&cli).await?;
            run_chat(agent, client_id.clone()).await?;
        }
        Command::Ask {
            message,
            client_id,
            json,
        } => {
            let agent = build_agent(&cli).await?;
            let outcome = agent
                .handle_chat(ChatInput {
                    message: Some(message.clone()),
                    client_id: client_id.clone(),
                    session_id: None,
                    msg_index: None,
                })
                .await?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", outcome.reply.reply);
            }
        }
        Command::Intents => {
            let catalog = load_catalog(&cli)?;
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
        Command::Serve { bind } => {
            let config = ApiConfig {
                bind: bind.clone(),
                tenants_dir: cli.tenants_dir.clone(),
                database_url: cli.database_url.clone(),
                intents_file: cli.intents_file.clone(),
                ..ApiConfig::from_env()
            };
            let app = build_app(config).await?;
            let listener = tokio::net::TcpListener::bind(bind.as_str())
                .await
                .with_context(|| format!("failed binding {bind}"))?;
            tracing::info!(bind = %bind, "dinchat api started");
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

async fn run_chat(agent: ResponderAgent<Store>, client_id: Option<String>) -> Result<()> {
    let mut msg_index = 0_u32;
    let mut session_id: Option<String> = None;

    println!("dinchat chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        let outcome = agent
            .handle_chat(ChatInput {
                message: Some(message.to_string()),
                client_id: client_id.clone(),
                session_id: session_id.clone(),
                msg_index: Some(msg_index),
            })
            .await?;
        session_id = Some(outcome.session_id.clone());
        msg_index += 1;

        println!("\n{}\n", outcome.reply.reply);
    }

    Ok(())
}

fn load_catalog(cli: &Cli) -> Result<IntentCatalog> {
    match cli.intents_file.as_ref() {
        Some(path) => IntentCatalog::from_json_file(path),
        None => Ok(IntentCatalog::builtin().clone()),
    }
}

async fn build_agent(cli: &Cli) -> Result<ResponderAgent<Store>> {
    let catalog = load_catalog(cli)?;
    let store = Store::open(cli.database_url.as_deref(), cli.tenants_dir.as_deref())
        .await
        .context("failed to open tenant store")?;

    Ok(ResponderAgent::new(
        Arc::new(catalog),
        Arc::new(store),
        AppMetrics::shared(),
    ))
}
