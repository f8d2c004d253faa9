use log::{error, info};
use realtime::{ClientConfig, EventsClient, EventsEndpoint};
use service::{config::Config, logging::Logger, AppState};

mod consumers;

use consumers::badges::UnreadBadges;
use consumers::notifications::NotificationFeed;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    let endpoint = match EventsEndpoint::parse(config.backend_base_url()) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            error!("Cannot derive an events endpoint: {e}");
            std::process::exit(1);
        }
    };

    info!("Events endpoint: {}", endpoint.as_str());

    let client_config = ClientConfig::new(endpoint).with_reconnect_delay(config.reconnect_delay());
    let history_limit = config.notification_history_limit;

    let state = AppState::new(config);

    let client = EventsClient::spawn(client_config);

    // Consumers attach before the channel opens so the first envelopes land.
    let feed = NotificationFeed::attach(client.registry(), history_limit);
    let badges = UnreadBadges::attach(client.registry());

    // The session store drives the channel: token present connects, token
    // absent disconnects.
    let mut tokens = state.session.watch();
    client.set_token(tokens.borrow_and_update().clone());

    if state.session.token().is_none() {
        info!("No session token configured; waiting for one before connecting");
    }

    let token_client = client.clone();
    tokio::spawn(async move {
        while tokens.changed().await.is_ok() {
            token_client.set_token(tokens.borrow_and_update().clone());
        }
    });

    info!("Tailing live events (Ctrl-C to exit)");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }

    info!(
        "Shutting down: {} notification(s) seen, {} unread message(s), {} unread email(s)",
        feed.seen(),
        badges.unread_messages(),
        badges.unread_emails()
    );

    client.disconnect();
    feed.detach();
    badges.detach();
}
