//! Chat endpoint wire protocol: request envelope, headers, and dispatch

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::stream::{StreamEventStream, decode_lines};
use crate::transport::HttpTransport;
use crate::types::{Message, Role};

/// Request body for the chat endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub stream: bool,
    pub messages: Vec<WireMessage>,
}

/// One message as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl WireMessage {
    /// Copy a message onto the wire; images only go out for multimodal models
    fn from_message(message: &Message, multimodal: bool) -> Self {
        let images = if multimodal && message.role == Role::User && message.has_images() {
            Some(message.images.clone())
        } else {
            None
        };
        Self {
            role: message.role,
            content: message.content.clone(),
            images,
        }
    }
}

impl ChatRequest {
    /// Assemble the message list: system prompt, then `history`, then `user`.
    ///
    /// Everything is copied; the request never shares storage with the
    /// caller's history.
    pub fn build(
        settings: &Settings,
        system_prompt: Option<&str>,
        history: &[Message],
        user: &Message,
    ) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 2);

        if let Some(prompt) = system_prompt.filter(|p| !p.is_empty()) {
            messages.push(WireMessage {
                role: Role::System,
                content: prompt.to_string(),
                images: None,
            });
        }

        messages.extend(
            history
                .iter()
                .map(|m| WireMessage::from_message(m, settings.multimodal)),
        );
        messages.push(WireMessage::from_message(user, settings.multimodal));

        Self {
            model: settings.model.clone(),
            stream: true,
            messages,
        }
    }
}

/// Custom headers to attach. Blank names are skipped; repeated names are all kept.
pub fn build_headers(settings: &Settings) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in settings.sendable_headers() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::warn!("Skipping custom header '{}': not a valid HTTP header", name),
        }
    }
    headers
}

/// POST `request` to the configured chat endpoint and decode the streamed reply
pub async fn open_stream(
    transport: &HttpTransport,
    settings: &Settings,
    request: &ChatRequest,
) -> Result<StreamEventStream> {
    let url = settings.chat_url();
    tracing::debug!(
        "POST {} model={} messages={}",
        url,
        request.model,
        request.messages.len()
    );

    let response = transport
        .post_json(&url, build_headers(settings), request)
        .await?;

    let body = response.bytes_stream().map(|chunk| chunk.map_err(Error::from));
    Ok(decode_lines(body))
}
