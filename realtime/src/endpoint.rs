//! Derivation of the events URL from the configured backend base URL.

use crate::error::Error;
use url::Url;

const EVENTS_PATH: &str = "events/connect";

/// The resolved WebSocket endpoint for the events channel.
///
/// The ws scheme mirrors the base URL's scheme: a backend reached over
/// `https` gets `wss`, plain `http` gets `ws`. Already-websocket schemes
/// are accepted as-is. Any path prefix on the base URL (for backends
/// mounted under a subpath) is preserved ahead of `/events/connect`.
#[derive(Debug, Clone)]
pub struct EventsEndpoint {
    url: Url,
}

impl EventsEndpoint {
    pub fn parse(base_url: &str) -> Result<Self, Error> {
        let mut url = Url::parse(base_url)?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(Error::config(format!(
                    "Unsupported backend URL scheme '{other}' (expected http, https, ws, or wss)"
                )))
            }
        };

        url.set_scheme(scheme)
            .map_err(|_| Error::config(format!("Cannot derive a websocket URL from {base_url}")))?;

        let path = format!("{}/{}", url.path().trim_end_matches('/'), EVENTS_PATH);
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self { url })
    }

    /// The endpoint with the bearer token attached as a query parameter.
    pub fn url_with_token(&self, token: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("token", token);
        url
    }

    /// The endpoint without credentials, for logging.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_base_becomes_wss() {
        let endpoint = EventsEndpoint::parse("https://app.example.com").unwrap();
        assert_eq!(endpoint.as_str(), "wss://app.example.com/events/connect");
    }

    #[test]
    fn http_base_becomes_ws() {
        let endpoint = EventsEndpoint::parse("http://localhost:4000").unwrap();
        assert_eq!(endpoint.as_str(), "ws://localhost:4000/events/connect");
    }

    #[test]
    fn websocket_schemes_pass_through() {
        let endpoint = EventsEndpoint::parse("wss://app.example.com").unwrap();
        assert_eq!(endpoint.as_str(), "wss://app.example.com/events/connect");
    }

    #[test]
    fn path_prefix_is_preserved() {
        let endpoint = EventsEndpoint::parse("https://example.com/api/").unwrap();
        assert_eq!(endpoint.as_str(), "wss://example.com/api/events/connect");
    }

    #[test]
    fn token_is_attached_as_query_parameter() {
        let endpoint = EventsEndpoint::parse("https://app.example.com").unwrap();
        let url = endpoint.url_with_token("abc123");
        assert_eq!(
            url.as_str(),
            "wss://app.example.com/events/connect?token=abc123"
        );
    }

    #[test]
    fn token_is_percent_encoded() {
        let endpoint = EventsEndpoint::parse("https://app.example.com").unwrap();
        let url = endpoint.url_with_token("a b&c");
        assert_eq!(url.query(), Some("token=a+b%26c"));
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let err = EventsEndpoint::parse("ftp://example.com").unwrap_err();
        assert!(err.message().contains("Unsupported backend URL scheme"));
    }

    #[test]
    fn garbage_base_url_is_rejected() {
        assert!(EventsEndpoint::parse("not a url").is_err());
    }
}
