//! Shared utilities

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;
use tether_ai::CustomHeader;

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Read a file and base64-encode it for the `images` field
pub fn encode_image(path: &Path) -> anyhow::Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
    Ok(STANDARD.encode(bytes))
}

/// Parse `Name: value`. The value may be empty; the name may not.
pub fn parse_header(s: &str) -> Option<CustomHeader> {
    let (name, value) = s.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(CustomHeader::new(name, value.trim()))
}

/// Parse `host:port`
pub fn parse_proxy(s: &str) -> Option<(String, u32)> {
    let (host, port) = s.trim().rsplit_once(':')?;
    let port = port.parse().ok()?;
    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), port))
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("X-Api-Key: abc:def"),
            Some(CustomHeader::new("X-Api-Key", "abc:def"))
        );
        assert_eq!(parse_header("X-Empty:"), Some(CustomHeader::new("X-Empty", "")));
        assert_eq!(parse_header(": value"), None);
        assert_eq!(parse_header("no separator"), None);
    }

    #[test]
    fn test_parse_proxy() {
        assert_eq!(parse_proxy("127.0.0.1:8080"), Some(("127.0.0.1".into(), 8080)));
        assert_eq!(parse_proxy("burp.local:70000"), Some(("burp.local".into(), 70000)));
        assert_eq!(parse_proxy("localhost"), None);
        assert_eq!(parse_proxy(":8080"), None);
        assert_eq!(parse_proxy("host:http"), None);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_encode_image() {
        let path = std::env::temp_dir().join(format!("tether-image-{}.bin", std::process::id()));
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        assert_eq!(encode_image(&path).unwrap(), "iVBORw==");
        let _ = std::fs::remove_file(&path);

        assert!(encode_image(Path::new("/nonexistent/tether.png")).is_err());
    }
}
