use anyhow::Result;
use owo_colors::OwoColorize;
use ripple_core::Ripple;

use super::events::print_events;
use super::require_user;
use crate::render::Render;

pub fn register(ripple: &Ripple, user_id: &str, event_id: &str) -> Result<()> {
    require_user(ripple, user_id)?;

    let registration = ripple.registrations().register_user(user_id, event_id)?;
    println!(
        "{} Registered for {} on {}",
        "✓".green(),
        registration.event_title.bold(),
        registration.event_date
    );
    Ok(())
}

pub fn unregister(ripple: &Ripple, user_id: &str, event_id: &str) -> Result<()> {
    ripple.registrations().cancel(user_id, event_id)?;
    println!("{} Registration cancelled", "✓".green());
    Ok(())
}

pub fn mine(ripple: &Ripple, user_id: &str) -> Result<()> {
    let user = require_user(ripple, user_id)?;
    println!("{}", user.render());
    println!();

    println!("{}", "Registered".bold());
    print_events(&ripple.registrations().registered_events(&user.id));
    println!();

    println!("{}", "Organizing".bold());
    print_events(&ripple.events().by_creator(&user.id));

    Ok(())
}
