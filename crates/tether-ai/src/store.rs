//! Observable settings store.
//!
//! Every successful write notifies the registered observers synchronously, in
//! registration order, after the write is fully applied. Observers receive the
//! post-write snapshot. Rejected writes change nothing and notify nobody.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::error::{ConfigError, Result};
use crate::settings::{self, CustomHeader, Settings};

/// Handle returned by [`SettingsStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Arc<dyn Fn(&Settings) -> Result<()> + Send + Sync>;

/// Process-wide mutable settings with change notification
pub struct SettingsStore {
    settings: RwLock<Settings>,
    observers: Mutex<Vec<(ObserverId, Observer)>>,
    /// Held from write through notification so observers see writes in commit order
    write_order: ReentrantMutex<()>,
    next_id: AtomicU64,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::from_valid(Settings::default())
    }
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("settings", &*self.settings.read())
            .field("observers", &self.observers.lock().len())
            .finish()
    }
}

impl SettingsStore {
    /// Create a store holding the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from initial settings, normalizing them first
    pub fn with_settings(mut settings: Settings) -> std::result::Result<Self, ConfigError> {
        settings.normalize()?;
        Ok(Self::from_valid(settings))
    }

    fn from_valid(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
            observers: Mutex::new(Vec::new()),
            write_order: ReentrantMutex::new(()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Owned copy of the current settings
    pub fn snapshot(&self) -> Settings {
        self.settings.read().clone()
    }

    // ---- observers ----

    /// Register an observer. It is not called for the current state.
    pub fn subscribe(
        &self,
        observer: impl Fn(&Settings) -> Result<()> + Send + Sync + 'static,
    ) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    fn dispatch(&self, snapshot: &Settings) {
        // Copy the list so observers may (un)subscribe while being notified.
        let observers: Vec<(ObserverId, Observer)> = self.observers.lock().clone();
        for (id, observer) in observers {
            match catch_unwind(AssertUnwindSafe(|| observer(snapshot))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("Settings observer {:?} failed: {}", id, e),
                Err(_) => tracing::warn!("Settings observer {:?} panicked", id),
            }
        }
    }

    // ---- write paths ----

    fn apply(&self, f: impl FnOnce(&mut Settings)) {
        let _order = self.write_order.lock();
        let snapshot = {
            let mut settings = self.settings.write();
            f(&mut settings);
            settings.clone()
        };
        self.dispatch(&snapshot);
    }

    /// `f` must return `Err` before touching the record if it rejects.
    fn try_apply<T>(
        &self,
        f: impl FnOnce(&mut Settings) -> std::result::Result<T, ConfigError>,
    ) -> std::result::Result<T, ConfigError> {
        let _order = self.write_order.lock();
        let (value, snapshot) = {
            let mut settings = self.settings.write();
            match f(&mut settings) {
                Ok(value) => (value, settings.clone()),
                Err(e) => {
                    tracing::debug!("Rejected settings write: {}", e);
                    return Err(e);
                }
            }
        };
        self.dispatch(&snapshot);
        Ok(value)
    }

    /// Apply several changes and notify once.
    ///
    /// The closure edits a draft; the draft is normalized and validated as a
    /// whole. If any field is invalid nothing is applied. The closure must not
    /// call back into this store.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) -> std::result::Result<(), ConfigError> {
        let _order = self.write_order.lock();
        let mut draft = self.snapshot();
        f(&mut draft);
        if let Err(e) = draft.normalize() {
            tracing::debug!("Rejected batch settings update: {}", e);
            return Err(e);
        }
        *self.settings.write() = draft.clone();
        self.dispatch(&draft);
        Ok(())
    }

    // ---- getters ----

    pub fn server_base_url(&self) -> String {
        self.settings.read().server_base_url.clone()
    }

    pub fn chat_path(&self) -> String {
        self.settings.read().chat_path.clone()
    }

    pub fn model(&self) -> String {
        self.settings.read().model.clone()
    }

    pub fn is_multimodal(&self) -> bool {
        self.settings.read().multimodal
    }

    pub fn connect_timeout(&self) -> Duration {
        self.settings.read().connect_timeout
    }

    pub fn write_timeout(&self) -> Duration {
        self.settings.read().write_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.settings.read().read_timeout
    }

    pub fn use_proxy(&self) -> bool {
        self.settings.read().use_proxy
    }

    pub fn proxy_host(&self) -> String {
        self.settings.read().proxy_host.clone()
    }

    pub fn proxy_port(&self) -> u16 {
        self.settings.read().proxy_port
    }

    /// Copy of the custom headers
    pub fn custom_headers(&self) -> Vec<CustomHeader> {
        self.settings.read().custom_headers.clone()
    }

    pub fn use_system_prompt(&self) -> bool {
        self.settings.read().use_system_prompt
    }

    pub fn system_prompt(&self) -> String {
        self.settings.read().system_prompt.clone()
    }

    /// System prompt to send, if enabled and non-empty
    pub fn effective_system_prompt(&self) -> Option<String> {
        self.settings
            .read()
            .effective_system_prompt()
            .map(str::to_string)
    }

    // ---- setters ----

    pub fn set_server_base_url(&self, url: impl Into<String>) {
        let url = url.into();
        self.apply(|s| s.server_base_url = url);
    }

    /// Trims and prefixes `/`; rejects an empty path
    pub fn set_chat_path(&self, path: &str) -> std::result::Result<(), ConfigError> {
        let path = settings::normalize_chat_path(path);
        self.try_apply(|s| {
            s.chat_path = path?;
            Ok(())
        })
    }

    pub fn set_model(&self, model: impl Into<String>) {
        let model = model.into();
        self.apply(|s| s.model = model);
    }

    pub fn set_multimodal(&self, multimodal: bool) {
        self.apply(|s| s.multimodal = multimodal);
    }

    pub fn set_connect_timeout(&self, timeout: Duration) -> std::result::Result<(), ConfigError> {
        self.try_apply(|s| {
            settings::check_timeout("connect", timeout)?;
            s.connect_timeout = timeout;
            Ok(())
        })
    }

    pub fn set_write_timeout(&self, timeout: Duration) -> std::result::Result<(), ConfigError> {
        self.try_apply(|s| {
            settings::check_timeout("write", timeout)?;
            s.write_timeout = timeout;
            Ok(())
        })
    }

    pub fn set_read_timeout(&self, timeout: Duration) -> std::result::Result<(), ConfigError> {
        self.try_apply(|s| {
            settings::check_timeout("read", timeout)?;
            s.read_timeout = timeout;
            Ok(())
        })
    }

    pub fn set_use_proxy(&self, use_proxy: bool) {
        self.apply(|s| s.use_proxy = use_proxy);
    }

    /// Stored trimmed
    pub fn set_proxy_host(&self, host: &str) {
        let host = host.trim().to_string();
        self.apply(|s| s.proxy_host = host);
    }

    /// Accepts 1..=65535
    pub fn set_proxy_port(&self, port: u32) -> std::result::Result<(), ConfigError> {
        self.try_apply(|s| {
            s.proxy_port = settings::check_port(port)?;
            Ok(())
        })
    }

    pub fn add_custom_header(&self, header: CustomHeader) {
        self.apply(|s| s.custom_headers.push(header));
    }

    /// Replace the header at `index`
    pub fn set_custom_header(
        &self,
        index: usize,
        header: CustomHeader,
    ) -> std::result::Result<(), ConfigError> {
        self.try_apply(|s| {
            let slot = s
                .custom_headers
                .get_mut(index)
                .ok_or(ConfigError::HeaderIndex(index))?;
            *slot = header;
            Ok(())
        })
    }

    /// Remove and return the header at `index`
    pub fn remove_custom_header(
        &self,
        index: usize,
    ) -> std::result::Result<CustomHeader, ConfigError> {
        self.try_apply(|s| {
            if index >= s.custom_headers.len() {
                return Err(ConfigError::HeaderIndex(index));
            }
            Ok(s.custom_headers.remove(index))
        })
    }

    pub fn set_custom_headers(&self, headers: Vec<CustomHeader>) {
        self.apply(|s| s.custom_headers = headers);
    }

    pub fn set_use_system_prompt(&self, enabled: bool) {
        self.apply(|s| s.use_system_prompt = enabled);
    }

    pub fn set_system_prompt(&self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.apply(|s| s.system_prompt = prompt);
    }
}
