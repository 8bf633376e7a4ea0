//! levitate-llm - run agent CLIs through one provider contract
//!
//! Usage:
//!   levitate-llm providers                         List registered providers
//!   levitate-llm call [-p KEY] [PROMPT]            Send one prompt (stdin if omitted)
//!   levitate-llm call --messages convo.json        Send a full conversation

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use levitate_llm::{
    Message, OutputFormat, ProviderContext, ProviderRegistry, Settings, output,
};
use std::io::Read;
use std::path::{Path, PathBuf};

const FALLBACK_PROVIDER: &str = "claude_cli";

#[derive(Parser)]
#[command(name = "levitate-llm")]
#[command(about = "Run agent CLIs (Claude, Codex, Gemini) through one provider contract")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: XDG levitate-llm/providers.toml)
    #[arg(short, long, global = true, env = "LEVITATE_LLM_CONFIG")]
    config: Option<PathBuf>,

    /// Log pipeline details to stderr
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered providers
    Providers,

    /// Send a prompt to a provider and print the answer
    Call {
        /// Prompt text (read from stdin when omitted)
        prompt: Option<String>,

        /// Provider key (default: `default_provider` from config)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model name passed to the CLI
        #[arg(short, long)]
        model: Option<String>,

        /// System prompt
        #[arg(short, long)]
        system: Option<String>,

        /// JSON file holding the conversation as an array of messages
        #[arg(long, conflicts_with_all = ["prompt", "system"])]
        messages: Option<PathBuf>,

        /// Timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Directory the CLI runs in
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Output format requested from the CLI
        #[arg(long, value_parser = parse_output_format)]
        output_format: Option<OutputFormat>,

        /// Print the full response as JSON
        #[arg(long)]
        raw: bool,
    },
}

fn parse_output_format(s: &str) -> Result<OutputFormat, String> {
    match s {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        "jsonl" | "stream-json" => Ok(OutputFormat::Jsonl),
        other => Err(format!("unknown output format '{other}' (text, json, jsonl)")),
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "levitate_llm=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load provider config")?;
    let registry = ProviderRegistry::global();

    match cli.command {
        Commands::Providers => {
            output::action("Providers");
            for entry in registry.entries() {
                output::provider_row(&entry.key, &entry.label, &entry.summary);
            }
            for skipped in registry.skipped() {
                output::skipped_row(&skipped.key, &skipped.reason);
            }
            if let Some(default) = &settings.default_provider {
                output::detail(&format!("default provider: {default}"));
            }
        }

        Commands::Call {
            prompt,
            provider,
            model,
            system,
            messages,
            timeout,
            cwd,
            output_format,
            raw,
        } => {
            let key = provider
                .or_else(|| settings.default_provider.clone())
                .unwrap_or_else(|| FALLBACK_PROVIDER.to_owned());

            let mut config = settings.provider(&key);
            if let Some(timeout) = timeout {
                config.timeout = timeout;
            }
            if let Some(cwd) = cwd {
                config.working_directory = Some(cwd);
            }
            if let Some(format) = output_format {
                config.output_format = format;
            }
            config.debug |= cli.debug;
            if config.skip_permissions {
                output::warning(&format!("{key} runs with permission prompts bypassed"));
            }

            let mut ctx = ProviderContext::new(config);
            ctx.model_name = model;
            ctx.workspace_root = settings.workspace_root.clone();

            let conversation = match messages {
                Some(path) => read_conversation(&path)?,
                None => {
                    let mut conversation = Vec::new();
                    if let Some(system) = system {
                        conversation.push(Message::system(system));
                    }
                    conversation.push(Message::user(read_prompt(prompt)?));
                    conversation
                }
            };

            let (provider, client) = registry.connect(&key, ctx)?;
            output::action(&format!("Calling {key}"));
            output::detail(&format!("executable: {}", client.executable().display()));

            let pb = output::spinner("waiting for response");
            let response = provider.call_model(&client, &conversation, &[]);
            if response.is_success() {
                output::progress_success(pb, "done");
            } else {
                output::progress_fail(pb, "failed");
            }

            if raw {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else if response.is_success() {
                println!("{}", response.content());
            } else {
                output::error(&response.content());
            }

            if !response.is_success() {
                std::process::exit(1);
            }
            output::success(&format!("{key} finished"));
        }
    }

    Ok(())
}

fn read_prompt(prompt: Option<String>) -> Result<String> {
    if let Some(prompt) = prompt {
        return Ok(prompt);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read prompt from stdin")?;
    if buf.trim().is_empty() {
        bail!("No prompt given (pass PROMPT or pipe it on stdin)");
    }
    Ok(buf)
}

fn read_conversation(path: &Path) -> Result<Vec<Message>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid conversation JSON in {}", path.display()))
}
