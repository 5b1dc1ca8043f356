//! /show command - print current settings

use super::CommandResult;
use tether_ai::{Settings, SettingsStore};

pub struct ShowCommand;

impl ShowCommand {
    pub fn execute(store: &SettingsStore) -> CommandResult {
        CommandResult::Message(render(&store.snapshot()))
    }
}

fn render(s: &Settings) -> String {
    let mut output = String::from("Settings:\n\n");

    output.push_str(&format!("  {:<18} {}\n", "endpoint", s.chat_url()));
    output.push_str(&format!("  {:<18} {}\n", "model", s.model));
    output.push_str(&format!("  {:<18} {}\n", "multimodal", s.multimodal));
    output.push_str(&format!(
        "  {:<18} connect {}s, write {}s, read {}s\n",
        "timeouts",
        s.connect_timeout.as_secs(),
        s.write_timeout.as_secs(),
        s.read_timeout.as_secs()
    ));

    let proxy = match s.proxy_url() {
        Some(url) => url,
        None if s.use_proxy => "on, but no host set".to_string(),
        None => "off".to_string(),
    };
    output.push_str(&format!("  {:<18} {}\n", "proxy", proxy));

    let prompt = if s.system_prompt.is_empty() {
        "(empty)".to_string()
    } else {
        crate::utils::truncate_chars(&s.system_prompt.replace('\n', " "), 60)
    };
    output.push_str(&format!(
        "  {:<18} {} [{}]\n",
        "system prompt",
        prompt,
        if s.use_system_prompt { "on" } else { "off" }
    ));

    if s.custom_headers.is_empty() {
        output.push_str(&format!("  {:<18} none\n", "headers"));
    } else {
        output.push_str("  headers\n");
        for (i, h) in s.custom_headers.iter().enumerate() {
            let note = if h.sendable_name().is_none() {
                "  (blank name, not sent)"
            } else {
                ""
            };
            output.push_str(&format!("    {}: {}: {}{}\n", i, h.name, h.value, note));
        }
    }

    output.trim_end().to_string()
}
