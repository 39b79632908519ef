pub mod account;
pub mod categories;
pub mod events;
pub mod maintenance;
pub mod new;
pub mod register;
pub mod update;

use anyhow::Result;
use ripple_core::{Ripple, User};

/// Resolve the `--user` argument to an existing account.
pub fn require_user(ripple: &Ripple, user_id: &str) -> Result<User> {
    match ripple.users().get(user_id) {
        Some(user) => Ok(user),
        None => anyhow::bail!(
            "Unknown user '{}'.\n\n\
            Create an account with:\n  \
            ripple signup <name> <email>\n\n\
            or look up your id with:\n  \
            ripple login <email>",
            user_id
        ),
    }
}
