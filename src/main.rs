//! Main entry point for the Zaban CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zaban::cli::commands::{self, Commands};

/// Zaban - translation and speech API client
#[derive(Parser, Debug)]
#[command(name = "zaban", version, about, long_about = None)]
struct Args {
    /// API key (defaults to ZABAN_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Override config with CLI args if provided
    if let Some(api_key) = &args.api_key {
        std::env::set_var("ZABAN_API_KEY", api_key);
    }

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}={}", env!("CARGO_PKG_NAME"), default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match args.command {
        Some(Commands::Translate {
            text,
            source_lang,
            target_lang,
        }) => {
            commands::handle_translate(text, source_lang, target_lang).await?;
        }
        Some(Commands::Transliterate {
            text,
            source_script,
            target_script,
            lang,
            topk,
        }) => {
            commands::handle_transliterate(text, source_script, target_script, lang, topk).await?;
        }
        Some(Commands::Speak {
            text,
            lang,
            speaker,
            format,
            output,
        }) => {
            commands::handle_speak(text, lang, speaker, format, output).await?;
        }
        Some(Commands::Transcribe { file, lang }) => {
            commands::handle_transcribe(file, lang).await?;
        }
        Some(Commands::Batch {
            file,
            target_lang,
            output,
        }) => {
            commands::handle_batch(file, target_lang, output).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
