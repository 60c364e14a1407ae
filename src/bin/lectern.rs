//! lectern: operational smoke checks for the generation layer.
//!
//! Builds a [`GenerationContext`] from the resolved config and environment
//! credentials, then runs one text or speech request through it.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lectern::{Config, Credentials, GenerationContext, GenerationOptions, LecternError};

/// Lectern CLI
#[derive(Parser)]
#[command(name = "lectern")]
#[command(version)]
#[command(about = "Multi-provider text and speech generation")]
struct Args {
    /// Config file (default: ~/.lectern/config.toml, then /etc/lectern/config.toml)
    #[arg(short, long, env = "LECTERN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate text
    Text {
        /// Prompt (or omit to read from stdin)
        prompt: Option<String>,
        /// Model to use (provider default if omitted)
        #[arg(short, long)]
        model: Option<String>,
        /// JSON schema file; switches to structured output
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// Synthesize speech
    Speech {
        /// Text to speak (or omit to read from stdin)
        text: Option<String>,
        /// Voice to use (provider default if omitted)
        #[arg(short, long)]
        voice: Option<String>,
        /// Audio format
        #[arg(short, long, default_value = "mp3")]
        format: String,
        /// Where to write the audio
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the resolved configuration and which credentials are present
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Default: warn for CLI; override with RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let credentials = Credentials::from_env();

    match args.command {
        Command::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            println!();
            println!("# credentials: {credentials:?}");
        }

        Command::Text {
            prompt,
            model,
            schema,
        } => {
            let prompt = input_or_stdin(prompt)?;
            let ctx = GenerationContext::from_config(config, credentials);
            let mut options = GenerationOptions::new();
            if let Some(model) = model {
                options = options.model(model);
            }

            if let Some(path) = schema {
                let schema: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
                let value = ctx.text().generate_structured(&prompt, &schema, &options).await?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                let result = ctx.text().generate(&prompt, &options).await?;
                println!("{}", result.content);
                eprintln!(
                    "provider: {}, latency: {}ms, tokens: {}, cost: ${:.6}",
                    result.provider_name,
                    result.latency_ms,
                    result.usage.total_tokens,
                    result.usage.estimated_cost_usd
                );
            }
        }

        Command::Speech {
            text,
            voice,
            format,
            output,
        } => {
            let text = input_or_stdin(text)?;
            let ctx = GenerationContext::from_config(config, credentials);
            let mut options = GenerationOptions::new().audio_format(format);
            if let Some(voice) = voice {
                options = options.voice(voice);
            }
            let result = ctx.speech().generate(&text, &options).await?;
            std::fs::write(&output, &result.content)?;
            eprintln!(
                "provider: {}, latency: {}ms, {} bytes (~{:.1}s) written to {}",
                result.provider_name,
                result.latency_ms,
                result.usage.bytes,
                result.usage.estimated_duration_secs,
                output.display()
            );
        }
    }

    Ok(())
}

fn input_or_stdin(arg: Option<String>) -> Result<String, LecternError> {
    if let Some(text) = arg {
        return Ok(text);
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(LecternError::Configuration(
            "no input given and stdin is a terminal".to_string(),
        ));
    }
    let mut buf = String::new();
    stdin.lock().read_to_string(&mut buf)?;
    Ok(buf.trim().to_string())
}
