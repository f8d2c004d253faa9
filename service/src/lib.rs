use config::Config;
use session::SessionStore;

pub mod config;
pub mod logging;
pub mod session;

// Service-level state containing only infrastructure concerns
// Needs to implement Clone to be able to be shared across tasks
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub session: SessionStore,
}

impl AppState {
    pub fn new(app_config: Config) -> Self {
        let session = SessionStore::new(app_config.session_token());
        Self {
            config: app_config,
            session,
        }
    }
}
