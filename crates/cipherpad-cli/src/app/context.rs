//! Application context for the Cipherpad CLI.
//!
//! Bundles the parsed arguments with the lazily-loaded config and the cookie
//! jar shared by every HTTP client and the socket upgrade of one invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::unsync::OnceCell;

use cipherpad_core::config::ServerEndpoint;
use cipherpad_core::keys::{FileKeyStore, KeyStore};
use cipherpad_core::remote::{
    cookie_header, restore_cookies, AuthClient, CookieJar, HttpTransport,
};
use cipherpad_core::sync::WsConnector;
use cipherpad_core::{KeyManager, NotesSession, SessionOptions};

use crate::cli::Cli;
use crate::config::{
    config_path, default_keyfile_path, default_session_path, load_config, write_config,
    CipherpadConfig, KeystoreBackend,
};
use crate::errors::CliError;
use crate::security::{clear_session, read_session, write_session, KeychainStore, SavedSession};
use crate::ui::UiContext;

pub struct AppContext<'a> {
    cli: &'a Cli,
    config_path: OnceCell<PathBuf>,
    config: OnceCell<CipherpadConfig>,
    jar: Arc<CookieJar>,
}

impl<'a> AppContext<'a> {
    pub fn new(cli: &'a Cli) -> Self {
        Self {
            cli,
            config_path: OnceCell::new(),
            config: OnceCell::new(),
            jar: Arc::new(CookieJar::default()),
        }
    }

    pub fn quiet(&self) -> bool {
        self.cli.quiet
    }

    /// UI context for this invocation; `json` is the command's `--json` flag.
    pub fn ui(&self, json: bool) -> UiContext {
        UiContext::from_env(json, self.cli.no_color, self.cli.ascii)
    }

    pub fn config_path(&self) -> anyhow::Result<&Path> {
        self.config_path
            .get_or_try_init(config_path)
            .map(PathBuf::as_path)
    }

    /// Get the configuration, loading it lazily if needed.
    pub fn config(&self) -> anyhow::Result<&CipherpadConfig> {
        self.config
            .get_or_try_init(|| load_config(self.config_path()?))
    }

    /// Server endpoint from `--server`/`CIPHERPAD_SERVER`, else the config.
    pub fn endpoint(&self) -> anyhow::Result<ServerEndpoint> {
        let url = match &self.cli.server {
            Some(url) => url.as_str(),
            None => self.config()?.server.url.as_str(),
        };
        Ok(ServerEndpoint::parse(url)?)
    }

    pub fn configured_account(&self) -> anyhow::Result<Option<String>> {
        Ok(self.config()?.account.email.clone())
    }

    /// Account of the last login, or a not-logged-in error.
    pub fn account(&self) -> anyhow::Result<String> {
        self.configured_account()?
            .ok_or_else(|| CliError::not_logged_in().into())
    }

    /// Record (or clear) the logged-in account in the config file.
    pub fn remember_account(&self, account: Option<&str>) -> anyhow::Result<()> {
        let path = self.config_path()?;
        let mut config = load_config(path)?;
        config.account.email = account.map(str::to_string);
        write_config(path, &config)
    }

    fn key_store(&self) -> anyhow::Result<Box<dyn KeyStore>> {
        let keystore = &self.config()?.keystore;
        let store: Box<dyn KeyStore> = match keystore.backend {
            KeystoreBackend::Keychain => Box::new(KeychainStore),
            KeystoreBackend::File => {
                let path = match &keystore.path {
                    Some(path) => PathBuf::from(path),
                    None => default_keyfile_path()?,
                };
                Box::new(FileKeyStore::new(path))
            }
        };
        Ok(store)
    }

    pub fn key_manager(&self) -> anyhow::Result<KeyManager> {
        Ok(KeyManager::new(self.key_store()?))
    }

    /// Auth client sharing this context's cookie jar.
    pub fn auth_client(&self) -> anyhow::Result<AuthClient> {
        Ok(AuthClient::new(self.endpoint()?, self.jar.clone())?)
    }

    /// Load the saved server session into the jar if it was issued by the
    /// current server for `account`.
    pub fn restore_server_session(&self, account: &str) -> anyhow::Result<bool> {
        let Some(saved) = read_session(&default_session_path()?)? else {
            return Ok(false);
        };
        let endpoint = self.endpoint()?;
        if saved.account != account || saved.server != endpoint.base().as_str() {
            tracing::debug!("saved session belongs to another account or server");
            return Ok(false);
        }
        restore_cookies(&self.jar, endpoint.base(), &saved.cookie);
        Ok(true)
    }

    /// Persist the jar's session cookie for the next invocation.
    pub fn save_server_session(&self, account: &str) -> anyhow::Result<()> {
        let endpoint = self.endpoint()?;
        let Some(cookie) = cookie_header(&self.jar, endpoint.base()) else {
            tracing::warn!("server issued no session cookie");
            return Ok(());
        };
        let saved = SavedSession {
            account: account.to_string(),
            server: endpoint.base().to_string(),
            cookie,
        };
        write_session(&default_session_path()?, &saved)
    }

    pub fn clear_server_session(&self) -> anyhow::Result<()> {
        clear_session(&default_session_path()?)
    }

    /// Start a notes session for the logged-in account, after checking with
    /// the server that the saved session is still live.
    pub async fn open_session(&self) -> anyhow::Result<NotesSession> {
        let account = self.account()?;
        let keys = Arc::new(self.key_manager()?);
        if !keys.restore(&account)? {
            return Err(CliError::not_logged_in().into());
        }
        if !self.restore_server_session(&account)? {
            return Err(CliError::auth_failed_with_hint(
                "No server session for this account",
                "Run: cipherpad login",
            )
            .into());
        }
        if self.auth_client()?.current_user().await?.is_none() {
            return Err(CliError::auth_failed_with_hint(
                "Server session expired",
                "Run: cipherpad login",
            )
            .into());
        }

        let endpoint = self.endpoint()?;
        let transport = Arc::new(HttpTransport::new(endpoint.clone(), self.jar.clone())?);
        let connector = Arc::new(
            WsConnector::new(endpoint.socket()?)
                .with_cookie(cookie_header(&self.jar, endpoint.base())),
        );
        let config = self.config()?;
        let options = SessionOptions {
            sync: config.sync_config()?,
            debounce: config.debounce_config()?,
        };
        Ok(NotesSession::start(keys, transport, connector, options)?)
    }
}
