//! /set command - change one settings field

use super::CommandResult;
use crate::utils::{parse_bool, parse_header, parse_proxy};
use std::time::Duration;
use tether_ai::SettingsStore;

pub struct SetCommand;

impl SetCommand {
    pub fn execute(args: &str, store: &SettingsStore) -> CommandResult {
        if args.is_empty() {
            return CommandResult::Message(keys_message());
        }

        let (key, value) = match args.split_once(' ') {
            Some((key, value)) => (key, value.trim()),
            None => (args, ""),
        };

        CommandResult::Message(match apply(store, &key.to_lowercase(), value) {
            Ok(done) => done,
            Err(e) => format!("Not changed: {}", e),
        })
    }
}

/// Apply one `key value` pair; the error explains why nothing changed
fn apply(store: &SettingsStore, key: &str, value: &str) -> Result<String, String> {
    match key {
        "server" => {
            require(value)?;
            store.set_server_base_url(value);
            Ok(format!("Server set to {}", value))
        }
        "chat_path" | "path" => {
            store.set_chat_path(value).map_err(|e| e.to_string())?;
            Ok(format!("Chat path set to {}", store.chat_path()))
        }
        "model" => {
            require(value)?;
            store.set_model(value);
            Ok(format!("Model set to {}", value))
        }
        "multimodal" => {
            let on = bool_arg(value)?;
            store.set_multimodal(on);
            Ok(format!("Multimodal {}", on_off(on)))
        }
        "connect_timeout" => {
            store
                .set_connect_timeout(seconds(value)?)
                .map_err(|e| e.to_string())?;
            Ok(format!("Connect timeout set to {}s", value))
        }
        "write_timeout" => {
            store
                .set_write_timeout(seconds(value)?)
                .map_err(|e| e.to_string())?;
            Ok(format!("Write timeout set to {}s", value))
        }
        "read_timeout" => {
            store
                .set_read_timeout(seconds(value)?)
                .map_err(|e| e.to_string())?;
            Ok(format!("Read timeout set to {}s", value))
        }
        "proxy" => match parse_bool(value) {
            Some(on) => {
                store.set_use_proxy(on);
                Ok(format!("Proxy {}", on_off(on)))
            }
            None => {
                let (host, port) =
                    parse_proxy(value).ok_or_else(|| format!("expected host:port, got '{}'", value))?;
                let port16 = u16::try_from(port)
                    .map_err(|_| tether_ai::ConfigError::InvalidPort(port).to_string())?;
                store
                    .update(|s| {
                        s.use_proxy = true;
                        s.proxy_host = host.clone();
                        s.proxy_port = port16;
                    })
                    .map_err(|e| e.to_string())?;
                Ok(format!("Proxy on via {}:{}", host, port))
            }
        },
        "proxy_host" => {
            store.set_proxy_host(value);
            Ok(format!("Proxy host set to '{}'", store.proxy_host()))
        }
        "proxy_port" => {
            let port: u32 = value
                .parse()
                .map_err(|_| format!("'{}' is not a port number", value))?;
            store.set_proxy_port(port).map_err(|e| e.to_string())?;
            Ok(format!("Proxy port set to {}", port))
        }
        "use_system_prompt" => {
            let on = bool_arg(value)?;
            store.set_use_system_prompt(on);
            Ok(format!("System prompt {}", on_off(on)))
        }
        "system_prompt" => {
            store.set_system_prompt(value);
            Ok(if value.is_empty() {
                "System prompt cleared".to_string()
            } else {
                "System prompt updated".to_string()
            })
        }
        "header" => {
            let header =
                parse_header(value).ok_or_else(|| format!("expected 'Name: value', got '{}'", value))?;
            let shown = format!("{}: {}", header.name, header.value);
            store.add_custom_header(header);
            Ok(format!("Added header {}", shown))
        }
        "header.remove" => {
            let index: usize = value
                .parse()
                .map_err(|_| format!("'{}' is not a header index", value))?;
            let removed = store.remove_custom_header(index).map_err(|e| e.to_string())?;
            Ok(format!("Removed header {}: {}", removed.name, removed.value))
        }
        "headers.clear" => {
            store.set_custom_headers(Vec::new());
            Ok("Cleared custom headers".to_string())
        }
        _ => Err(format!("unknown key '{}'. Type /set to list keys", key)),
    }
}

fn require(value: &str) -> Result<(), String> {
    if value.is_empty() {
        Err("a value is required".to_string())
    } else {
        Ok(())
    }
}

fn bool_arg(value: &str) -> Result<bool, String> {
    parse_bool(value).ok_or_else(|| format!("expected on/off, got '{}'", value))
}

fn seconds(value: &str) -> Result<Duration, String> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| format!("'{}' is not a number of seconds", value))
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn keys_message() -> String {
    r#"Settings keys:

  server <url>              Inference server base URL
  chat_path <path>          Chat endpoint path
  model <name>              Model name
  multimodal <on|off>       Whether the model accepts images
  connect_timeout <secs>    Connect timeout
  write_timeout <secs>      Write timeout
  read_timeout <secs>       Read timeout
  proxy <on|off|host:port>  Route requests through an HTTP proxy
  proxy_host <host>         Proxy host
  proxy_port <port>         Proxy port (1-65535)
  use_system_prompt <on|off>
  system_prompt <text>      System prompt (empty to clear)
  header <Name: value>      Add a custom header
  header.remove <index>     Remove a custom header
  headers.clear             Remove all custom headers"#
        .to_string()
}
