use tokio::sync::watch;

/// Holds the session's bearer token and broadcasts changes to observers.
///
/// The token's presence or absence is the sole driver of the events channel
/// lifecycle: publishing a token connects, clearing it disconnects. Token
/// absence is an ordinary state (signed out), not an error.
#[derive(Clone)]
pub struct SessionStore {
    sender: watch::Sender<Option<String>>,
}

impl SessionStore {
    pub fn new(initial: Option<String>) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Store a freshly issued token (login or refresh).
    pub fn set_token(&self, token: String) {
        self.sender.send_replace(Some(token));
    }

    /// Clear the token (logout or invalidation).
    pub fn clear(&self) {
        self.sender.send_replace(None);
    }

    pub fn token(&self) -> Option<String> {
        self.sender.borrow().clone()
    }

    /// A receiver that yields the current token and every change after it.
    pub fn watch(&self) -> watch::Receiver<Option<String>> {
        self.sender.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(None)
    }
}
