//! ollama-ime - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use ollama_ime::{
    cli::{Args, Commands, Verbosity},
    config::Settings,
    discovery::{self, ServerStatus},
    streaming::{ClientSettings, OllamaClient, StreamPolicy},
    types::CompletionRequest,
};
use std::future::Future;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(verbosity: Verbosity) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| verbosity.filter_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Build a client from flags > config file > OLLAMA_HOST > defaults
fn build_client(args: &Args) -> Result<OllamaClient> {
    let settings = Settings::load(args.config.as_deref()).context("Failed to load config")?;

    let mut client_settings = ClientSettings::from_settings(&settings);
    client_settings.base_url = args.url.clone();
    if client_settings.stored_base_url.is_none() {
        client_settings.stored_base_url = Args::env_base_url();
    }
    if let Some(model) = &args.model {
        client_settings.model = Some(model.clone());
    }
    if let Some(secs) = args.timeout {
        client_settings.request_timeout = Some(Duration::from_secs(secs));
    }
    if args.strict {
        client_settings.policy = StreamPolicy::strict();
    }

    OllamaClient::from_settings(client_settings).context("Invalid client configuration")
}

/// Run a request, abandoning it (and its connection) on Ctrl-C
async fn cancellable<T>(fut: impl Future<Output = ollama_ime::Result<T>>) -> Result<T> {
    tokio::select! {
        result = fut => Ok(result?),
        _ = tokio::signal::ctrl_c() => Err(anyhow::anyhow!("Interrupted")),
    }
}

async fn check(client: &OllamaClient, verbosity: Verbosity) -> Result<()> {
    let status = discovery::probe(client.transport(), client.target(), client.model()).await?;
    match &status {
        ServerStatus::Ready => {
            if verbosity.show_status() {
                println!(
                    "{} {} ({})",
                    "Connected".green(),
                    client.target().base_url(),
                    client.model()
                );
            }
        }
        other => {
            eprintln!("{} {:?}", "Not ready:".red(), other);
            if let Some(hint) = discovery::status_hint(other) {
                eprintln!("{}", hint);
            }
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn list_models(client: &OllamaClient, verbosity: Verbosity) -> Result<()> {
    let models = cancellable(client.list_models()).await?;

    if models.is_empty() {
        if verbosity.show_status() {
            println!("No models installed.");
            println!("\nPull a model with:");
            println!("  ollama pull {}", client.model());
        }
    } else {
        for model in models {
            println!("{}", model);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    init_tracing(verbosity);

    let client = build_client(&args)?;

    match &args.command {
        Commands::Check => check(&client, verbosity).await?,
        Commands::Models => list_models(&client, verbosity).await?,
        Commands::Generate { prompt } => {
            for line in cancellable(client.generate_lines(prompt)).await? {
                println!("{}", line);
            }
        }
        Commands::Transform { prompt } => {
            println!("{}", cancellable(client.transform_text(prompt)).await?);
        }
        Commands::Complete { prompt, target } => {
            let request = CompletionRequest::new(prompt.as_str(), target.as_str());
            for line in cancellable(client.complete(&request)).await? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
