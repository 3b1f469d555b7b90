//! `login`, `signup` and `logout`.

use secrecy::ExposeSecret;

use cipherpad_core::crypto::SecretKey;
use cipherpad_core::remote::AuthClient;
use cipherpad_core::{KeyManager, NotesError};

use crate::app::AppContext;
use crate::cli::{LoginArgs, SignupArgs};
use crate::errors::CliError;
use crate::security::{read_credential, value_or_prompt};
use crate::ui::{self, Badge};

pub async fn handle_login(ctx: &AppContext<'_>, args: &LoginArgs) -> anyhow::Result<()> {
    let email = match args.email.clone() {
        Some(email) => email,
        None => value_or_prompt(ctx.configured_account()?, "Email")?,
    };
    let credential = read_credential(false)?;
    let keys = ctx.key_manager()?;
    let key = keys.derive(&email, credential.expose_secret())?;

    let auth = ctx.auth_client()?;
    let user = auth
        .login(&email, &key)
        .await
        .map_err(|e| match e {
            NotesError::NotAuthenticated => anyhow::Error::new(CliError::auth_failed_with_hint(
                "Invalid email or password",
                "No account yet? Run: cipherpad signup",
            )),
            other => other.into(),
        })?;

    finish(ctx, &auth, &keys, &email, key)?;

    let ui_ctx = ctx.ui(false);
    if !ctx.quiet() {
        ui::print(
            &ui_ctx,
            &ui::receipt(
                &ui_ctx,
                "Logged in",
                &[("Account", user.email.as_str()), ("Name", user.name.as_str())],
            ),
        );
    }
    Ok(())
}

pub async fn handle_signup(ctx: &AppContext<'_>, args: &SignupArgs) -> anyhow::Result<()> {
    let email = value_or_prompt(args.email.clone(), "Email")?;
    let name = value_or_prompt(args.name.clone(), "Name")?;
    let credential = read_credential(true)?;
    let keys = ctx.key_manager()?;
    let key = keys.derive(&email, credential.expose_secret())?;

    let auth = ctx.auth_client()?;
    let user = auth.signup(&name, &email, &key).await?;

    finish(ctx, &auth, &keys, &email, key)?;

    let ui_ctx = ctx.ui(false);
    if !ctx.quiet() {
        ui::print(
            &ui_ctx,
            &ui::receipt(
                &ui_ctx,
                "Account created",
                &[("Account", user.email.as_str()), ("Name", user.name.as_str())],
            ),
        );
    }
    Ok(())
}

/// Store the note key, then persist the session and account.
fn finish(
    ctx: &AppContext<'_>,
    auth: &AuthClient,
    keys: &KeyManager,
    email: &str,
    key: SecretKey,
) -> anyhow::Result<()> {
    keys.set_key(email, key)?;
    if auth.session_cookie().is_none() {
        tracing::warn!("login succeeded without a session cookie");
    }
    ctx.save_server_session(email)?;
    ctx.remember_account(Some(email))?;
    Ok(())
}

pub async fn handle_logout(ctx: &AppContext<'_>) -> anyhow::Result<()> {
    let ui_ctx = ctx.ui(false);
    let Some(account) = ctx.configured_account()? else {
        ui::print(&ui_ctx, &ui::badge(&ui_ctx, Badge::Info, "Not logged in"));
        return Ok(());
    };

    if ctx.restore_server_session(&account)? {
        let auth = ctx.auth_client()?;
        if let Err(e) = auth.logout().await {
            tracing::warn!(error = %e, "server logout failed; clearing local state anyway");
        }
    }

    let keys = ctx.key_manager()?;
    if keys.restore(&account)? {
        keys.forget()?;
    }
    ctx.clear_server_session()?;
    ctx.remember_account(None)?;

    if !ctx.quiet() {
        ui::print(&ui_ctx, &ui::receipt(&ui_ctx, "Logged out", &[("Account", account.as_str())]));
    }
    Ok(())
}
