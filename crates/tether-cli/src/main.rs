//! tether - terminal chat client for Ollama-compatible servers

mod commands;
mod config;
mod utils;

use anyhow::Context;
use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tether_ai::SettingsStore;
use tether_chat::{ChatClient, ChatEvent};
use tracing_subscriber::EnvFilter;

/// tether - streaming chat and HTTP exchange analysis against a local model
#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Inference server base URL (default: http://localhost:11434)
    #[arg(long)]
    server: Option<String>,

    /// Chat endpoint path (default: /api/chat)
    #[arg(long)]
    chat_path: Option<String>,

    /// Model to use (default: deepseek-r1:1.5b)
    #[arg(short, long)]
    model: Option<String>,

    /// Treat the model as multimodal so attached images are sent
    #[arg(long)]
    multimodal: bool,

    /// Route requests through an HTTP proxy (host:port)
    #[arg(long)]
    proxy: Option<String>,

    /// Extra request header, "Name: value" (repeatable)
    #[arg(long = "header", value_name = "HEADER")]
    headers: Vec<String>,

    /// System prompt to send with every turn
    #[arg(long)]
    system_prompt: Option<String>,

    /// Run in non-interactive mode with a single prompt
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// With -c: analyze this raw HTTP request (needs --response-file)
    #[arg(long, requires = "response_file")]
    request_file: Option<PathBuf>,

    /// With -c: analyze this raw HTTP response (needs --request-file)
    #[arg(long, requires = "request_file")]
    response_file: Option<PathBuf>,

    /// Image to attach to the -c prompt (repeatable)
    #[arg(long = "image", value_name = "FILE")]
    images: Vec<PathBuf>,

    /// Config file (default: ~/.config/tether/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so streamed replies on stdout stay clean
    let filter = if args.verbose {
        EnvFilter::new("tether=debug,tether_ai=debug,tether_chat=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config_path = config::Config::config_path(args.config.as_deref());

    // Initialize config and exit
    if args.init_config {
        match config::Config::init(&config_path) {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // File first, then CLI flags on top
    let store = Arc::new(SettingsStore::new());
    config::Config::load(&config_path)
        .apply_to(&store)
        .with_context(|| format!("Invalid settings in {}", config_path.display()))?;
    apply_args(&args, &store)?;

    let client = ChatClient::new(Arc::clone(&store))?;
    let usage_log = spawn_usage_logger(&client);

    let result = match args.command {
        Some(ref command) => run_command(&client, &args, command).await,
        None => run_interactive(&client, &store, &config_path).await,
    };

    usage_log.abort();
    result
}

/// Apply command-line overrides as one batch
fn apply_args(args: &Args, store: &SettingsStore) -> anyhow::Result<()> {
    let proxy = match args.proxy {
        Some(ref raw) => {
            let (host, port) = utils::parse_proxy(raw)
                .with_context(|| format!("Invalid --proxy '{}', expected host:port", raw))?;
            let port = u16::try_from(port)
                .map_err(|_| tether_ai::ConfigError::InvalidPort(port))
                .context("Invalid --proxy")?;
            Some((host, port))
        }
        None => None,
    };

    let mut headers = Vec::with_capacity(args.headers.len());
    for raw in &args.headers {
        let header = utils::parse_header(raw)
            .with_context(|| format!("Invalid --header '{}', expected 'Name: value'", raw))?;
        headers.push(header);
    }

    store
        .update(|s| {
            if let Some(ref server) = args.server {
                s.server_base_url = server.clone();
            }
            if let Some(ref path) = args.chat_path {
                s.chat_path = path.clone();
            }
            if let Some(ref model) = args.model {
                s.model = model.clone();
            }
            if args.multimodal {
                s.multimodal = true;
            }
            if let Some((host, port)) = proxy {
                s.use_proxy = true;
                s.proxy_host = host;
                s.proxy_port = port;
            }
            s.custom_headers.extend(headers);
            if let Some(ref prompt) = args.system_prompt {
                s.system_prompt = prompt.clone();
                s.use_system_prompt = true;
            }
        })
        .context("Invalid command-line settings")?;
    Ok(())
}

/// Log per-turn token counts
fn spawn_usage_logger(client: &ChatClient) -> tokio::task::JoinHandle<()> {
    let mut receiver = client.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            if let ChatEvent::TurnEnd {
                kind,
                usage: Some(usage),
                recorded,
                ..
            } = event
            {
                tracing::info!(
                    "{:?} turn: {} prompt tokens, {} completion tokens ({}), recorded={}",
                    kind,
                    usage.prompt_tokens,
                    usage.completion_tokens,
                    usage.done_reason.as_deref().unwrap_or("unknown"),
                    recorded
                );
            }
        }
    })
}

fn print_chunk(chunk: &str) {
    print!("{}", chunk);
    io::stdout().flush().ok();
}

async fn run_command(client: &ChatClient, args: &Args, command: &str) -> anyhow::Result<()> {
    let mut images = Vec::with_capacity(args.images.len());
    for path in &args.images {
        images.push(utils::encode_image(path)?);
    }

    let result = match (&args.request_file, &args.response_file) {
        (Some(request_file), Some(response_file)) => {
            let request = read_text(request_file)?;
            let response = read_text(response_file)?;
            client
                .analyze_with(&request, &response, command, images, print_chunk)
                .await
        }
        _ => {
            let system_prompt = client.settings().effective_system_prompt();
            client
                .chat_with(command, system_prompt.as_deref(), images, print_chunk)
                .await
        }
    };

    println!();
    result?;
    Ok(())
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

async fn run_interactive(
    client: &ChatClient,
    store: &SettingsStore,
    config_path: &Path,
) -> anyhow::Result<()> {
    let mut pending_images: Vec<String> = Vec::new();

    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("tether ({} @ {})", store.model(), store.server_base_url());
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // Handle slash commands
        if let Some(result) = commands::execute_command(input, store, client) {
            match result {
                commands::CommandResult::Clear => {
                    client.clear_history();
                    pending_images.clear();
                    println!("Cleared conversation.");
                }
                commands::CommandResult::Exit => {
                    break;
                }
                commands::CommandResult::Message(msg) => {
                    println!("{}", msg);
                }
                commands::CommandResult::AddImage(path) => match utils::encode_image(&path) {
                    Ok(image) => {
                        pending_images.push(image);
                        println!(
                            "Attached {} ({} pending)",
                            path.display(),
                            pending_images.len()
                        );
                    }
                    Err(e) => println!("Error: {:#}", e),
                },
                commands::CommandResult::ShowImages => {
                    println!("{} image(s) pending for the next message.", pending_images.len());
                }
                commands::CommandResult::ClearImages => {
                    pending_images.clear();
                    println!("Dropped pending images.");
                }
                commands::CommandResult::Analyze {
                    request,
                    response,
                    question,
                } => {
                    match (read_text(&request), read_text(&response)) {
                        (Ok(request), Ok(response)) => {
                            println!();
                            let images = std::mem::take(&mut pending_images);
                            let result = client
                                .analyze_with(&request, &response, &question, images, print_chunk)
                                .await;
                            println!();
                            if let Err(e) = result {
                                println!("Error: {}", e);
                            }
                        }
                        (Err(e), _) | (_, Err(e)) => println!("Error: {:#}", e),
                    }
                }
                commands::CommandResult::Save => {
                    match config::Config::from_settings(&store.snapshot()).save(config_path) {
                        Ok(()) => println!("Saved settings to {}", config_path.display()),
                        Err(e) => println!("Error: failed to save settings: {}", e),
                    }
                }
                commands::CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            println!();
            continue;
        }

        println!();

        // Images go with this turn only, whatever the outcome
        let images = std::mem::take(&mut pending_images);
        let system_prompt = store.effective_system_prompt();
        let result = client
            .chat_with(input, system_prompt.as_deref(), images, print_chunk)
            .await;
        println!();
        if let Err(e) = result {
            println!("Error: {}", e);
        }
        println!();
    }

    Ok(())
}
