//! reqwest-backed transport sharing one cookie jar with the auth client.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Response, StatusCode, Url};

use super::transport::NoteTransport;
use crate::config::ServerEndpoint;
use crate::error::{NotesError, Result};
use crate::types::{SealedFolder, SealedNote};

/// Build a client that stores and replays session cookies through `jar`.
///
/// Redirects are not followed: the server answers logout with a redirect to
/// its web UI, which is meaningless here.
pub(crate) fn build_client(jar: Arc<Jar>) -> Result<Client> {
    Client::builder()
        .cookie_provider(jar)
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(concat!("cipherpad/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| NotesError::Network(format!("Failed to build HTTP client: {}", e)))
}

/// Map a non-success status to the matching error, keeping the body text.
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() || status.is_redirection() {
        return Ok(response);
    }
    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    let detail = if body.trim().is_empty() || body.trim() == "\"\"" {
        format!("{} {}", status, url)
    } else {
        format!("{} {}: {}", status, url, body.trim())
    };
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => NotesError::NotAuthenticated,
        StatusCode::NOT_FOUND => NotesError::NotFound(detail),
        s if s.is_server_error() => NotesError::Network(detail),
        _ => NotesError::Protocol(detail),
    })
}

/// Cookie header the jar would send to `url`.
///
/// Query with the REST base, not the `ws://` socket URL: HttpOnly cookies
/// only match http(s) URLs.
pub fn cookie_header(jar: &Jar, url: &Url) -> Option<String> {
    jar.cookies(url)
        .and_then(|value| value.to_str().ok().map(str::to_string))
}

/// Load a previously saved `name=value; name2=value2` header back into `jar`.
pub fn restore_cookies(jar: &Jar, url: &Url, header: &str) {
    for pair in header.split(';').map(str::trim).filter(|p| p.contains('=')) {
        jar.add_cookie_str(&format!("{}; Path=/", pair), url);
    }
}

/// HTTP implementation of [`NoteTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: ServerEndpoint,
}

impl HttpTransport {
    pub fn new(endpoint: ServerEndpoint, jar: Arc<Jar>) -> Result<Self> {
        Ok(Self {
            client: build_client(jar)?,
            endpoint,
        })
    }

    async fn get_folders(&self) -> Result<Vec<SealedFolder>> {
        let response = self.client.get(self.endpoint.notes()?).send().await?;
        let response = check_status(response).await?;
        let folders: Option<Vec<SealedFolder>> = response.json().await?;
        Ok(folders.unwrap_or_default())
    }

    async fn post_note(&self, note: SealedNote) -> Result<SealedNote> {
        let response = self
            .client
            .post(self.endpoint.note()?)
            .json(&note)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn remove_note(&self, id: String) -> Result<String> {
        let response = self
            .client
            .delete(self.endpoint.note_by_id(&id)?)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body = response.text().await?;
        let echoed = body.trim().trim_matches('"');
        Ok(if echoed.is_empty() { id } else { echoed.to_string() })
    }
}

impl NoteTransport for HttpTransport {
    fn fetch_folders(&self) -> BoxFuture<'_, Result<Vec<SealedFolder>>> {
        Box::pin(self.get_folders())
    }

    fn create_note(&self, note: SealedNote) -> BoxFuture<'_, Result<SealedNote>> {
        Box::pin(self.post_note(note))
    }

    fn delete_note(&self, id: String) -> BoxFuture<'_, Result<String>> {
        Box::pin(self.remove_note(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header_round_trip() {
        let url = Url::parse("http://localhost:3000/api/notes").unwrap();
        let jar = Jar::default();
        assert_eq!(cookie_header(&jar, &url), None);

        restore_cookies(&jar, &url, "session=abc123");
        assert_eq!(cookie_header(&jar, &url).as_deref(), Some("session=abc123"));

        let fresh = Jar::default();
        restore_cookies(&fresh, &url, &cookie_header(&jar, &url).unwrap());
        assert_eq!(cookie_header(&fresh, &url), cookie_header(&jar, &url));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let endpoint = ServerEndpoint::parse("http://127.0.0.1:9/api").unwrap();
        let transport = HttpTransport::new(endpoint, Arc::new(Jar::default())).unwrap();
        let err = transport.fetch_folders().await.unwrap_err();
        assert!(matches!(err, NotesError::Network(_)));
    }
}
