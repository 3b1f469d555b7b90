//! Session-cookie authentication against the note server.
//!
//! Login and signup take the note key, not the credential: the server's
//! `password` field carries [`login_secret`], so neither the credential nor
//! the note key itself is ever sent.

use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::http::{build_client, check_status, cookie_header};
use crate::config::ServerEndpoint;
use crate::crypto::{login_secret, SecretKey};
use crate::error::{NotesError, Result};

/// Account as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub email: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    email: &'a str,
    password: &'a str,
}

pub struct AuthClient {
    client: Client,
    jar: Arc<Jar>,
    endpoint: ServerEndpoint,
}

impl AuthClient {
    pub fn new(endpoint: ServerEndpoint, jar: Arc<Jar>) -> Result<Self> {
        Ok(Self {
            client: build_client(jar.clone())?,
            jar,
            endpoint,
        })
    }

    /// `POST /login`. Unknown account or wrong credential is `NotAuthenticated`.
    pub async fn login(&self, email: &str, key: &SecretKey) -> Result<User> {
        let secret = login_secret(key)?;
        let body = Credentials {
            name: None,
            email,
            password: secret.expose_secret(),
        };
        match self.post_credentials("login", &body).await {
            Err(NotesError::NotFound(_)) => Err(NotesError::NotAuthenticated),
            other => other,
        }
    }

    /// `POST /signup`. An existing account is rejected as invalid input.
    pub async fn signup(&self, name: &str, email: &str, key: &SecretKey) -> Result<User> {
        let secret = login_secret(key)?;
        let body = Credentials {
            name: Some(name),
            email,
            password: secret.expose_secret(),
        };
        self.post_credentials("signup", &body).await
    }

    /// `GET /user`: the logged-in account, or `None` when the session is gone.
    pub async fn current_user(&self) -> Result<Option<User>> {
        let response = self.client.get(self.endpoint.url("user")?).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let response = check_status(response).await?;
        Ok(Some(response.json().await?))
    }

    /// `GET /logout`.
    pub async fn logout(&self) -> Result<()> {
        let response = self.client.get(self.endpoint.url("logout")?).send().await?;
        check_status(response).await?;
        tracing::debug!("server session ended");
        Ok(())
    }

    /// Current session cookie header, for persisting or the socket upgrade.
    pub fn session_cookie(&self) -> Option<String> {
        cookie_header(&self.jar, self.endpoint.base())
    }

    async fn post_credentials(&self, route: &str, body: &Credentials<'_>) -> Result<User> {
        let response = self
            .client
            .post(self.endpoint.url(route)?)
            .json(body)
            .send()
            .await?;
        if response.status() == StatusCode::CONFLICT {
            return Err(NotesError::InvalidInput(format!(
                "An account for {} already exists",
                body.email
            )));
        }
        let response = check_status(response).await?;
        let user: User = response.json().await?;
        tracing::debug!(route, "authenticated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_wire_shape() {
        let user: User = serde_json::from_str(
            r#"{"_id":"64b7","name":"Tester","email":"me@example.com"}"#,
        )
        .unwrap();
        assert_eq!(user.id, "64b7");
        assert_eq!(user.email, "me@example.com");
    }

    #[test]
    fn test_login_body_has_no_name() {
        let body = Credentials {
            name: None,
            email: "me@example.com",
            password: "p@55word",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("name").is_none());
        assert_eq!(json["email"], "me@example.com");
    }
}
