//! CLI auth command handlers for login, status, and logout.

use super::{CliContext, LoginArgs};
use crate::error::BidlinkError;

/// Handle `bidlink auth login <email>`.
pub async fn handle_login(ctx: &CliContext, args: &LoginArgs) -> Result<(), BidlinkError> {
    let user = ctx
        .client
        .auth(&ctx.session)
        .login(&args.email, &args.password)
        .await?;
    println!("Logged in as {}", display_name(&user).unwrap_or(&args.email));
    Ok(())
}

/// Handle `bidlink auth status`.
pub async fn handle_status(ctx: &CliContext) -> Result<(), BidlinkError> {
    let profile = &ctx.client.config().profile;
    let Some(token) = ctx.store.load(profile)? else {
        println!("Not logged in (profile {profile})");
        return Ok(());
    };
    if let Some(refreshed) = token.last_refresh {
        println!("Session stored for profile {profile}, last refreshed {refreshed}");
    } else {
        println!("Session stored for profile {profile}");
    }
    match ctx.client.auth(&ctx.session).current_user().await {
        Ok(user) => println!("Current user: {}", display_name(&user).unwrap_or("(unnamed)")),
        Err(e) if e.refresh_cause().is_some() => println!("Session expired: {e}"),
        Err(e) => return Err(e),
    }
    Ok(())
}

/// Handle `bidlink auth logout`.
pub async fn handle_logout(ctx: &CliContext) -> Result<(), BidlinkError> {
    if let Err(e) = ctx.client.auth(&ctx.session).logout().await {
        tracing::warn!(error = %e, "server logout failed; local session cleared");
    }
    println!("Logged out");
    Ok(())
}

fn display_name(user: &serde_json::Value) -> Option<&str> {
    ["name", "username", "email"]
        .iter()
        .find_map(|key| user.get(key).and_then(|v| v.as_str()))
}
