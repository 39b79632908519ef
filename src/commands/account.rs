use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use ripple_core::{NewUser, Ripple};

use crate::render::Render;

const PASSWORD_ENV: &str = "RIPPLE_PASSWORD";

fn read_password(prompt: &str) -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    rpassword::prompt_password(prompt).context("Failed to read password")
}

pub fn signup(
    ripple: &Ripple,
    name: &str,
    email: &str,
    username: Option<String>,
    phone: Option<String>,
) -> Result<()> {
    let password = read_password("  Password: ")?;
    if std::env::var(PASSWORD_ENV).is_err() {
        let confirm = read_password("  Confirm password: ")?;
        if confirm != password {
            anyhow::bail!("Passwords do not match");
        }
    }

    let user = ripple.users().create(NewUser {
        username,
        phone,
        ..NewUser::new(name, email, &password)
    })?;

    println!("{} Welcome to Ripple, {}!", "✓".green(), user.name.bold());
    println!();
    println!("Act as this account by passing:");
    println!("  --user {}", user.id);

    Ok(())
}

pub fn login(ripple: &Ripple, login: &str) -> Result<()> {
    let password = read_password("  Password: ")?;

    let Some(user) = ripple.users().authenticate(login, &password) else {
        anyhow::bail!("Invalid email/username or password");
    };

    println!("{} Logged in as {}", "✓".green(), user.render());
    println!("  --user {}", user.id);

    Ok(())
}
