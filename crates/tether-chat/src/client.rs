//! Streaming chat client with conversation memory.
//!
//! The client owns the conversation history and a transport built from the
//! shared [`SettingsStore`]. A settings observer rebuilds the transport inside
//! the change notification, so any call issued after a settings write returns
//! uses a transport reflecting that write.
//!
//! Chat turns (not analysis turns) are serialized by an internal lock around
//! the history read-modify-append, so concurrent callers cannot interleave
//! their exchanges. Chunk callbacks run inline on the task driving the stream;
//! callers that need delivery on a UI thread must forward chunks themselves.

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use tether_ai::protocol::{self, ChatRequest};
use tether_ai::{
    HttpTransport, Message, ObserverId, Settings, SettingsStore, StreamEvent, TransportProfile,
    Usage,
};
use tokio::sync::broadcast;

use crate::analysis;
use crate::conversation::History;
use crate::error::Result;
use crate::events::{ChatEvent, TurnKind};

/// The live transport, or why the latest settings could not produce one
type TransportSlot = std::result::Result<Arc<HttpTransport>, String>;

/// Client for a streaming chat endpoint
pub struct ChatClient {
    store: Arc<SettingsStore>,
    transport: Arc<RwLock<TransportSlot>>,
    history: Mutex<History>,
    turn_lock: tokio::sync::Mutex<()>,
    event_tx: broadcast::Sender<ChatEvent>,
    observer: ObserverId,
}

impl ChatClient {
    /// Build the initial transport and start following settings changes
    pub fn new(store: Arc<SettingsStore>) -> Result<Self> {
        let initial = HttpTransport::build(&store.snapshot())?;
        let transport = Arc::new(RwLock::new(Ok(Arc::new(initial))));

        // A failed rebuild empties the slot; the old client never outlives
        // the settings it was built from.
        let slot = Arc::downgrade(&transport);
        let observer = store.subscribe(move |settings| {
            let Some(slot) = slot.upgrade() else {
                return Ok(());
            };
            match HttpTransport::build(settings) {
                Ok(rebuilt) => {
                    *slot.write() = Ok(Arc::new(rebuilt));
                    Ok(())
                }
                Err(e) => {
                    let reason = match e {
                        tether_ai::Error::InvalidConfig(ref msg) => msg.clone(),
                        ref other => other.to_string(),
                    };
                    *slot.write() = Err(reason);
                    Err(e)
                }
            }
        });

        let (event_tx, _) = broadcast::channel(256);
        Ok(Self {
            store,
            transport,
            history: Mutex::new(History::new()),
            turn_lock: tokio::sync::Mutex::new(()),
            event_tx,
            observer,
        })
    }

    /// Subscribe to chat events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    /// The settings store this client follows
    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.store
    }

    /// Configuration the current transport was built from, or `None` when the
    /// latest settings could not be turned into a transport
    pub fn transport_profile(&self) -> Option<TransportProfile> {
        self.transport
            .read()
            .as_ref()
            .ok()
            .map(|t| t.profile().clone())
    }

    /// The transport for the next request; fails while the settings are unusable
    pub(crate) fn current_transport(&self) -> tether_ai::Result<Arc<HttpTransport>> {
        match &*self.transport.read() {
            Ok(transport) => Ok(Arc::clone(transport)),
            Err(reason) => Err(tether_ai::Error::InvalidConfig(reason.clone())),
        }
    }

    /// Copies of the remembered messages
    pub fn history(&self) -> Vec<Message> {
        self.history.lock().messages()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    /// Forget the conversation
    pub fn clear_history(&self) {
        self.history.lock().clear();
        let _ = self.event_tx.send(ChatEvent::HistoryCleared);
    }

    /// Run a chat turn, delivering each content chunk to `on_chunk` as it arrives.
    ///
    /// Returns the full reply. A non-empty reply is remembered together with
    /// the prompt; a failed or empty turn leaves history untouched. Images are
    /// sent only when the model is configured as multimodal.
    pub async fn chat_with<F>(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        images: Vec<String>,
        on_chunk: F,
    ) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        self.run_turn(TurnKind::Chat, prompt.to_string(), system_prompt, images, on_chunk)
            .await
    }

    /// Run a chat turn and return the buffered reply
    pub async fn chat(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        images: Vec<String>,
    ) -> Result<String> {
        self.chat_with(prompt, system_prompt, images, |_| {}).await
    }

    /// Ask a question about an HTTP exchange, streaming the answer.
    ///
    /// Analysis turns neither read nor write history. The system prompt comes
    /// from the settings store.
    pub async fn analyze_with<F>(
        &self,
        request_text: &str,
        response_text: &str,
        question: &str,
        images: Vec<String>,
        on_chunk: F,
    ) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        let prompt = analysis::format_prompt(request_text, response_text, question);
        let system_prompt = self.store.effective_system_prompt();
        self.run_turn(
            TurnKind::Analysis,
            prompt,
            system_prompt.as_deref(),
            images,
            on_chunk,
        )
        .await
    }

    /// Ask a question about an HTTP exchange and return the buffered answer
    pub async fn analyze(
        &self,
        request_text: &str,
        response_text: &str,
        question: &str,
        images: Vec<String>,
    ) -> Result<String> {
        self.analyze_with(request_text, response_text, question, images, |_| {})
            .await
    }

    async fn run_turn<F>(
        &self,
        kind: TurnKind,
        prompt: String,
        system_prompt: Option<&str>,
        images: Vec<String>,
        mut on_chunk: F,
    ) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        let _turn = match kind {
            TurnKind::Chat => Some(self.turn_lock.lock().await),
            TurnKind::Analysis => None,
        };

        let settings = self.store.snapshot();
        let transport = match self.current_transport() {
            Ok(transport) => transport,
            Err(e) => {
                tracing::debug!("{:?} turn not sent: {}", kind, e);
                let _ = self.event_tx.send(ChatEvent::Error {
                    kind,
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let images = if settings.multimodal {
            images
        } else {
            if !images.is_empty() {
                tracing::debug!(
                    "Dropping {} image(s): model is not configured as multimodal",
                    images.len()
                );
            }
            Vec::new()
        };
        let user = Message::user_with_images(prompt, images);

        let history = match kind {
            TurnKind::Chat => self.history.lock().messages(),
            TurnKind::Analysis => Vec::new(),
        };
        let request = ChatRequest::build(&settings, system_prompt, &history, &user);

        let _ = self.event_tx.send(ChatEvent::TurnStart { kind });

        match self
            .stream_reply(&transport, &settings, &request, kind, &mut on_chunk)
            .await
        {
            Ok((text, usage)) => {
                let recorded = kind == TurnKind::Chat
                    && !text.is_empty()
                    && self
                        .history
                        .lock()
                        .record_turn(user, Message::assistant(text.clone()));
                let _ = self.event_tx.send(ChatEvent::TurnEnd {
                    kind,
                    text: text.clone(),
                    usage,
                    recorded,
                });
                Ok(text)
            }
            Err(e) => {
                tracing::debug!("{:?} turn failed: {}", kind, e);
                let _ = self.event_tx.send(ChatEvent::Error {
                    kind,
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Issue the request and fold the stream into the full reply
    async fn stream_reply<F>(
        &self,
        transport: &HttpTransport,
        settings: &Settings,
        request: &ChatRequest,
        kind: TurnKind,
        on_chunk: &mut F,
    ) -> tether_ai::Result<(String, Option<Usage>)>
    where
        F: FnMut(&str) + Send,
    {
        let mut events = protocol::open_stream(transport, settings, request).await?;
        let mut full_text = String::new();
        let mut usage = None;

        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::Delta(chunk) => {
                    on_chunk(&chunk);
                    full_text.push_str(&chunk);
                    let _ = self.event_tx.send(ChatEvent::Chunk { kind, text: chunk });
                }
                StreamEvent::Skipped { line, reason } => {
                    tracing::warn!("Skipping response line {}: {}", line, reason);
                }
                StreamEvent::Finished(stats) => usage = Some(stats),
            }
        }

        Ok((full_text, usage))
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        self.store.unsubscribe(self.observer);
    }
}
