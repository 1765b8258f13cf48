//! Shared HTTP session used for every catalog, node-tree and asset request.
use reqwest::{Client, Response};
use std::fmt;
use tracing::debug;

#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<hidden>")
            .finish()
    }
}

/// A reusable client plus the credentials to send with each request.
///
/// Requests never mutate the session, so one instance is shared (behind an
/// `Arc`) by all workers of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Session {
    client: Client,
    credentials: Option<Credentials>,
}

impl Session {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            credentials: None,
        }
    }

    pub fn with_credentials(client: Client, user: &str, password: &str) -> Self {
        let credentials = Credentials {
            user: user.to_owned(),
            password: password.to_owned(),
        };
        Self {
            client,
            credentials: Some(credentials),
        }
    }

    /// GET `url`, following redirects, and fail on any non-success status.
    ///
    /// The body is not read here: callers either collect it or stream it, and
    /// dropping the returned `Response` releases the connection.
    pub async fn get(&self, url: &str) -> reqwest::Result<Response> {
        debug!(url, "GET");
        let mut request = self.client.get(url);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.user, Some(&credentials.password));
        }
        request.send().await?.error_for_status()
    }

    pub async fn get_text(&self, url: &str) -> reqwest::Result<String> {
        self.get(url).await?.text().await
    }
}
