//! Slash commands for interactive mode

mod analyze;
mod history;
mod set;
mod show;

pub use analyze::AnalyzeCommand;
pub use history::HistoryCommand;
pub use set::SetCommand;
pub use show::ShowCommand;

use std::path::PathBuf;
use tether_ai::SettingsStore;
use tether_chat::ChatClient;

/// Result of executing a slash command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Clear the conversation and pending images
    Clear,
    /// Show a message to the user (not sent to the model)
    Message(String),
    /// Queue an image for the next turn
    AddImage(PathBuf),
    /// Show how many images are queued
    ShowImages,
    /// Drop queued images
    ClearImages,
    /// Ask about an HTTP exchange stored in two files
    Analyze {
        request: PathBuf,
        response: PathBuf,
        question: String,
    },
    /// Write the current settings to the config file
    Save,
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(
    input: &str,
    store: &SettingsStore,
    client: &ChatClient,
) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "clear" | "c" => CommandResult::Clear,

        "quit" | "exit" | "q" => CommandResult::Exit,

        "image" | "i" => image_command(args, store),

        "images" => match args {
            "" => CommandResult::ShowImages,
            "clear" => CommandResult::ClearImages,
            other => CommandResult::Message(format!(
                "Unknown /images argument: '{}'\nUsage: /images [clear]",
                other
            )),
        },

        "analyze" | "a" => AnalyzeCommand::execute(args),

        "set" => SetCommand::execute(args, store),

        "show" => ShowCommand::execute(store),

        "history" => HistoryCommand::execute(client),

        "save" => CommandResult::Save,

        _ => CommandResult::Unknown(command),
    })
}

fn image_command(args: &str, store: &SettingsStore) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Message("Usage: /image <path>".to_string());
    }
    if !store.is_multimodal() {
        return CommandResult::Message(format!(
            "Model '{}' is not marked multimodal; images would not be sent.\nEnable with: /set multimodal on",
            store.model()
        ));
    }
    CommandResult::AddImage(PathBuf::from(args))
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?              Show this help message
  /clear, /c                 Clear conversation history and pending images
  /image, /i <path>          Attach an image to the next message (multimodal models)
  /images [clear]            Show or drop pending images
  /analyze, /a <req> <resp> <question>
                             Ask about an HTTP exchange (not added to history)
  /set <key> <value>         Change a setting (see /set for keys)
  /show                      Show current settings
  /save                      Write current settings to the config file
  /history                   Show the conversation so far
  /quit, /exit, /q           Exit tether

Examples:
  /set model llama3.2-vision
  /set proxy 127.0.0.1:8080
  /analyze req.txt resp.txt Is this response vulnerable to XSS?"#
        .to_string()
}
