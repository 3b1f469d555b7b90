//! Everything that talks to the note server over HTTP.

mod auth;
mod fetcher;
mod http;
mod transport;

pub use auth::{AuthClient, User};
pub use fetcher::{FetchOutcome, RemoteFetcher};
pub use http::{cookie_header, restore_cookies, HttpTransport};
pub use transport::NoteTransport;

/// Cookie jar shared by the HTTP clients of one session.
pub use reqwest::cookie::Jar as CookieJar;
