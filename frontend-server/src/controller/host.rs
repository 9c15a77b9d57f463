// frontend-server/src/controller/host.rs
//! Capabilities the controller needs from whatever runs the page.
use common::HandshakeMessage;
use thiserror::Error;

/// Identity of a window, used to match `MessageEvent.source`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// How the provider is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    /// Separate window; messages must come from that window while it is open
    Popup,
    /// Embedded frame; no source check
    Frame,
}

pub trait ProviderWindow {
    fn id(&self) -> WindowId;
    fn is_closed(&self) -> bool;
    fn close(&mut self);
}

pub trait BrowserHost {
    type Window: ProviderWindow;

    /// `None` when the window could not be opened (e.g. a popup blocker)
    fn open_provider(&mut self, url: &str, mode: ProviderMode) -> Option<Self::Window>;

    /// Equivalent of assigning `document.cookie`
    fn set_document_cookie(&mut self, cookie: &str);

    /// Origin of the page itself
    fn origin(&self) -> String;
}

/// Sender of an inbound message; replies go back through it
pub trait MessageSource {
    fn id(&self) -> Option<WindowId>;
    fn post_message(&self, message: &HandshakeMessage, target_origin: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage failure: {0}")]
pub struct StorageError(pub String);

/// Durable string storage, `localStorage` in a browser
pub trait KeyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}
