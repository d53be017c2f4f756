//! Command handlers.
//!
//! Data commands restore the session first, and when the service still
//! answers 401 they ask for credentials once and retry the request once.

use anyhow::{anyhow, bail, Result};
use tracing::{debug, warn};

use pucktual_core::utils::{format_grams, format_seconds, truncate_string};
use pucktual_core::views::{load_beans, load_extractions};
use pucktual_core::{AppContext, AuthError, BeanListState, Bean, Credentials, Extraction, ExtractionState};

use crate::prompt;
use crate::Command;

/// Column width for bean names in the table
const NAME_WIDTH: usize = 32;

pub async fn run(ctx: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Setup { url, username } => setup(ctx, &url, username).await,
        Command::Login { username } => {
            require_setup(ctx)?;
            let credentials = prompt::credentials(ctx.session.store().as_ref(), username)?;
            login(ctx, credentials).await?;
            println!("Login successful.");
            Ok(())
        }
        Command::Logout => {
            ctx.session.logout().await?;
            println!("Logged out. Stored token and credentials removed.");
            Ok(())
        }
        Command::Status => status(ctx),
        Command::Beans { json } => {
            require_setup(ctx)?;
            restore_session(ctx).await?;
            beans(ctx, json).await
        }
        Command::Extractions { bean_id, json } => {
            require_setup(ctx)?;
            restore_session(ctx).await?;
            extractions(ctx, bean_id, json).await
        }
    }
}

fn require_setup(ctx: &AppContext) -> Result<()> {
    if !ctx.urls.is_configured() {
        bail!("No server URL configured. Run `pucktual setup <url>` first.");
    }
    Ok(())
}

/// Automatic login; a missing or failed login is not an error here
async fn restore_session(ctx: &AppContext) -> Result<()> {
    match ctx.session.perform_auto_login().await {
        Ok(source) => debug!(?source, "Session restored"),
        Err(AuthError::NoCredentials) => debug!("No stored session"),
        Err(AuthError::LoginFailed(e)) => {
            eprintln!("Automatic login failed: {}", e.user_message());
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn login(ctx: &AppContext, credentials: Credentials) -> Result<()> {
    match ctx.session.manual_login(credentials).await {
        Ok(()) => Ok(()),
        Err(AuthError::LoginFailed(e)) => Err(anyhow!("Login failed: {}", e.user_message())),
        Err(e) => Err(e.into()),
    }
}

async fn reauthenticate(ctx: &AppContext) -> Result<()> {
    eprintln!("Please log in to continue.");
    let credentials = prompt::credentials(ctx.session.store().as_ref(), None)?;
    login(ctx, credentials).await
}

async fn setup(ctx: &AppContext, url: &str, username: Option<String>) -> Result<()> {
    let saved = ctx.urls.save_base_url(url)?;
    println!("Server URL set to {}", saved);

    if let Some(username) = username {
        let credentials = Credentials::new(username.trim(), prompt::password()?);
        prompt::validate(&credentials)?;
        ctx.session
            .store()
            .save_credentials(&credentials.username, &credentials.password)?;
        debug!(username = %credentials.username, "Credentials stored during setup");
    }

    match ctx.session.perform_auto_login().await {
        Ok(_) => println!("Logged in."),
        Err(AuthError::NoCredentials) => {
            println!("Not logged in. Run `pucktual login` to sign in.")
        }
        Err(AuthError::LoginFailed(e)) => {
            warn!(error = %e, "Login after setup failed");
            println!("Automatic login failed: {}", e.user_message());
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn status(ctx: &AppContext) -> Result<()> {
    let config = ctx.urls.snapshot();
    let store = ctx.session.store();

    println!(
        "Server:   {}",
        ctx.urls.base_url().unwrap_or_else(|| "not configured".to_string())
    );
    println!("Store:    {}", config.credential_backend);
    println!(
        "Session:  {}",
        if store.token()?.is_some() { "token stored" } else { "none" }
    );
    println!(
        "Username: {}",
        store.username()?.unwrap_or_else(|| "none".to_string())
    );
    Ok(())
}

async fn beans(ctx: &AppContext, json: bool) -> Result<()> {
    let mut state = load_beans(&ctx.api).await;
    if state.needs_login() {
        reauthenticate(ctx).await?;
        state = load_beans(&ctx.api).await;
    }

    match &state {
        BeanListState::Loaded(beans) if json => {
            println!("{}", serde_json::to_string_pretty(beans)?);
        }
        BeanListState::Loaded(beans) => print_beans(beans),
        BeanListState::Error(message) => bail!("{}", message),
        other => bail!("Could not load beans ({:?})", other),
    }
    Ok(())
}

fn print_beans(beans: &[Bean]) {
    if beans.is_empty() {
        println!("No beans yet.");
        return;
    }
    println!("My beans");
    for bean in beans {
        println!(
            "{:>5}  {:<width$}  {}",
            bean.id,
            truncate_string(&bean.display_name(), NAME_WIDTH),
            bean.manufacturer,
            width = NAME_WIDTH
        );
    }
}

async fn extractions(ctx: &AppContext, bean_id: i64, json: bool) -> Result<()> {
    let mut state = load_extractions(&ctx.api, bean_id).await;
    if state.needs_login() {
        reauthenticate(ctx).await?;
        state = load_extractions(&ctx.api, bean_id).await;
    }

    match &state {
        ExtractionState::Loaded(extractions) if json => {
            println!("{}", serde_json::to_string_pretty(extractions)?);
        }
        ExtractionState::Loaded(_) => print_extractions(&state),
        ExtractionState::Empty if json => println!("[]"),
        ExtractionState::Empty => println!("No extractions recorded for this bean."),
        ExtractionState::Error(message) => bail!("{}", message),
        other => bail!("Could not load extractions ({:?})", other),
    }
    Ok(())
}

fn print_extractions(state: &ExtractionState) {
    if let Some(recipe) = state.latest() {
        println!("Recipe (#{})", recipe.id);
        println!("  In:     {}", format_grams(recipe.in_grams));
        println!("  Out:    {}", format_grams(recipe.out_grams));
        println!("  Ratio:  {}", recipe.ratio_display());
        println!("  Time:   {}", format_seconds(recipe.time_seconds));
        println!("  Grind:  {}", recipe.grind_display());
        if let Some(hint) = recipe.hint() {
            println!("  Hint:   {}", hint);
        }
    }

    let history = state.history();
    if !history.is_empty() {
        println!();
        println!("History");
        for extraction in history {
            println!("  {}", history_line(extraction));
        }
    }
}

fn history_line(e: &Extraction) -> String {
    format!(
        "#{:<5} {} -> {}  {}  {}  grind {}",
        e.id,
        format_grams(e.in_grams),
        format_grams(e.out_grams),
        e.ratio_display(),
        format_seconds(e.time_seconds),
        e.grind_display()
    )
}
