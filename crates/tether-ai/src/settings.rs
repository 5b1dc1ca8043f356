//! The settings record that parameterizes the transport and chat requests

use std::time::Duration;

use crate::error::ConfigError;

/// Default inference server
pub const DEFAULT_SERVER_BASE_URL: &str = "http://localhost:11434";
/// Default chat endpoint path
pub const DEFAULT_CHAT_PATH: &str = "/api/chat";
/// Default model name
pub const DEFAULT_MODEL: &str = "deepseek-r1:1.5b";
/// Default proxy port
pub const DEFAULT_PROXY_PORT: u16 = 8080;

/// A custom HTTP header attached to every chat request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomHeader {
    pub name: String,
    pub value: String,
}

impl CustomHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Header name as sent, or `None` when the trimmed name is empty
    pub fn sendable_name(&self) -> Option<&str> {
        let name = self.name.trim();
        if name.is_empty() { None } else { Some(name) }
    }
}

/// Point-in-time copy of every configurable field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_base_url: String,
    /// Always starts with `/` once normalized
    pub chat_path: String,
    pub model: String,
    pub multimodal: bool,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub read_timeout: Duration,
    pub use_proxy: bool,
    pub proxy_host: String,
    pub proxy_port: u16,
    /// Names need not be unique
    pub custom_headers: Vec<CustomHeader>,
    pub use_system_prompt: bool,
    pub system_prompt: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_base_url: DEFAULT_SERVER_BASE_URL.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            model: DEFAULT_MODEL.to_string(),
            multimodal: false,
            connect_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            use_proxy: false,
            proxy_host: String::new(),
            proxy_port: DEFAULT_PROXY_PORT,
            custom_headers: Vec::new(),
            use_system_prompt: false,
            system_prompt: String::new(),
        }
    }
}

impl Settings {
    /// Full URL of the chat endpoint
    pub fn chat_url(&self) -> String {
        format!(
            "{}{}",
            self.server_base_url.trim_end_matches('/'),
            self.chat_path
        )
    }

    /// The system prompt to send, if enabled and non-empty
    pub fn effective_system_prompt(&self) -> Option<&str> {
        if self.use_system_prompt && !self.system_prompt.is_empty() {
            Some(&self.system_prompt)
        } else {
            None
        }
    }

    /// Proxy URL when proxying is enabled and the host is usable
    pub fn proxy_url(&self) -> Option<String> {
        let host = self.proxy_host.trim();
        if self.use_proxy && !host.is_empty() && self.proxy_port > 0 {
            Some(format!("http://{}:{}", host, self.proxy_port))
        } else {
            None
        }
    }

    /// Headers that will actually be attached, in order
    pub fn sendable_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.custom_headers
            .iter()
            .filter_map(|h| h.sendable_name().map(|name| (name, h.value.as_str())))
    }

    /// Normalize free-form fields and check every constraint.
    ///
    /// Used for batch updates: either the whole draft is valid or none of it
    /// is applied.
    pub fn normalize(&mut self) -> Result<(), ConfigError> {
        self.chat_path = normalize_chat_path(&self.chat_path)?;
        self.proxy_host = self.proxy_host.trim().to_string();
        check_timeout("connect", self.connect_timeout)?;
        check_timeout("write", self.write_timeout)?;
        check_timeout("read", self.read_timeout)?;
        check_port(u32::from(self.proxy_port))?;
        Ok(())
    }
}

/// Trim and prefix a chat path with `/`
pub fn normalize_chat_path(path: &str) -> Result<String, ConfigError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(ConfigError::EmptyChatPath);
    }
    if path.starts_with('/') {
        Ok(path.to_string())
    } else {
        Ok(format!("/{}", path))
    }
}

pub(crate) fn check_timeout(field: &'static str, timeout: Duration) -> Result<(), ConfigError> {
    if timeout.is_zero() {
        Err(ConfigError::ZeroTimeout { field })
    } else {
        Ok(())
    }
}

pub(crate) fn check_port(port: u32) -> Result<u16, ConfigError> {
    match u16::try_from(port) {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(ConfigError::InvalidPort(port)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.chat_url(), "http://localhost:11434/api/chat");
        assert_eq!(s.read_timeout, Duration::from_secs(60));
        assert!(s.effective_system_prompt().is_none());
        assert!(s.proxy_url().is_none());
    }

    #[test]
    fn test_chat_path_normalization() {
        assert_eq!(normalize_chat_path("api/chat").unwrap(), "/api/chat");
        assert_eq!(normalize_chat_path("  /v1/chat  ").unwrap(), "/v1/chat");
        assert_eq!(normalize_chat_path("   "), Err(ConfigError::EmptyChatPath));
    }

    #[test]
    fn test_chat_url_drops_trailing_slash() {
        let s = Settings {
            server_base_url: "http://10.0.0.5:11434/".into(),
            ..Default::default()
        };
        assert_eq!(s.chat_url(), "http://10.0.0.5:11434/api/chat");
    }

    #[test]
    fn test_port_bounds() {
        assert_eq!(check_port(1), Ok(1));
        assert_eq!(check_port(65535), Ok(65535));
        assert_eq!(check_port(0), Err(ConfigError::InvalidPort(0)));
        assert_eq!(check_port(65536), Err(ConfigError::InvalidPort(65536)));
    }

    #[test]
    fn test_proxy_url_requires_host() {
        let mut s = Settings {
            use_proxy: true,
            proxy_host: "  ".into(),
            ..Default::default()
        };
        assert!(s.proxy_url().is_none());
        s.proxy_host = " 127.0.0.1 ".into();
        assert_eq!(s.proxy_url().as_deref(), Some("http://127.0.0.1:8080"));
        s.use_proxy = false;
        assert!(s.proxy_url().is_none());
    }

    #[test]
    fn test_sendable_headers_skip_blank_names() {
        let s = Settings {
            custom_headers: vec![
                CustomHeader::new(" X-Trace ", "abc"),
                CustomHeader::new("   ", "ignored"),
                CustomHeader::new("X-Empty", ""),
                CustomHeader::new("X-Trace", "def"),
            ],
            ..Default::default()
        };
        let headers: Vec<_> = s.sendable_headers().collect();
        assert_eq!(
            headers,
            vec![("X-Trace", "abc"), ("X-Empty", ""), ("X-Trace", "def")]
        );
    }

    #[test]
    fn test_effective_system_prompt() {
        let mut s = Settings {
            system_prompt: "be brief".into(),
            ..Default::default()
        };
        assert!(s.effective_system_prompt().is_none());
        s.use_system_prompt = true;
        assert_eq!(s.effective_system_prompt(), Some("be brief"));
        s.system_prompt.clear();
        assert!(s.effective_system_prompt().is_none());
    }

    #[test]
    fn test_normalize_rejects_zero_timeout() {
        let mut s = Settings {
            write_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(
            s.normalize(),
            Err(ConfigError::ZeroTimeout { field: "write" })
        );
    }
}
