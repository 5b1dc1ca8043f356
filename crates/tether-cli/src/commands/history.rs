//! /history command - list remembered messages

use super::CommandResult;
use tether_chat::ChatClient;

pub struct HistoryCommand;

impl HistoryCommand {
    pub fn execute(client: &ChatClient) -> CommandResult {
        let messages = client.history();
        if messages.is_empty() {
            return CommandResult::Message("No messages yet.".to_string());
        }

        let mut output = format!("Conversation ({} turns):\n", messages.len() / 2);
        for (i, msg) in messages.iter().enumerate() {
            let preview = crate::utils::truncate_chars(&msg.content.replace('\n', " "), 60);
            let images = if msg.has_images() {
                format!(" [{} image(s)]", msg.images.len())
            } else {
                String::new()
            };
            output.push_str(&format!("  {}: [{}] {}{}\n", i, msg.role, preview, images));
        }
        CommandResult::Message(output.trim_end().to_string())
    }
}
