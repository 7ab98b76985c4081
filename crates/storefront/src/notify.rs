//! User-facing effects: toast notifications and login redirects.
//!
//! Stores and auth contexts never talk to a UI directly. They report what
//! the user should see through a [`Notifier`]; the embedding application
//! decides how to show it.

use std::sync::Arc;

use tokio::sync::broadcast;

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    /// A mutation went through.
    Success,
    /// Something failed; the message is safe to show.
    Error,
    /// Neutral information.
    Info,
}

/// A short message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Severity.
    pub level: ToastLevel,
    /// Text to show.
    pub message: String,
}

impl Toast {
    /// A success toast.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    /// An error toast.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }

    /// An informational toast.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            message: message.into(),
        }
    }
}

/// Sink for user-facing effects.
pub trait Notifier: Send + Sync {
    /// Show a toast.
    fn notify(&self, toast: Toast);

    /// Send the user to `route` (e.g. the login page after a session expires).
    fn redirect(&self, route: &str) {
        tracing::info!(route, "Redirect requested");
    }
}

/// Shared handle to a notifier.
pub type SharedNotifier = Arc<dyn Notifier>;

/// Notifier that writes toasts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Error => tracing::warn!(message = %toast.message, "toast"),
            ToastLevel::Success | ToastLevel::Info => {
                tracing::info!(message = %toast.message, "toast");
            }
        }
    }
}

/// An effect delivered through a [`ChannelNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// A toast to show.
    Toast(Toast),
    /// A route to navigate to.
    Redirect(String),
}

/// Notifier that broadcasts effects to subscribers.
///
/// Events sent while nobody is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: broadcast::Sender<UiEvent>,
}

impl ChannelNotifier {
    /// Create a notifier buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, toast: Toast) {
        let _ = self.tx.send(UiEvent::Toast(toast));
    }

    fn redirect(&self, route: &str) {
        let _ = self.tx.send(UiEvent::Redirect(route.to_string()));
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::{Notifier, Toast, UiEvent};

    /// Notifier that records every effect for assertions.
    #[derive(Default)]
    pub struct RecordingNotifier {
        events: Mutex<Vec<UiEvent>>,
    }

    impl RecordingNotifier {
        pub fn events(&self) -> Vec<UiEvent> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }

        pub fn toasts(&self) -> Vec<Toast> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    UiEvent::Toast(t) => Some(t),
                    UiEvent::Redirect(_) => None,
                })
                .collect()
        }

        pub fn redirects(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    UiEvent::Redirect(r) => Some(r),
                    UiEvent::Toast(_) => None,
                })
                .collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, toast: Toast) {
            if let Ok(mut events) = self.events.lock() {
                events.push(UiEvent::Toast(toast));
            }
        }

        fn redirect(&self, route: &str) {
            if let Ok(mut events) = self.events.lock() {
                events.push(UiEvent::Redirect(route.to_string()));
            }
        }
    }
}
