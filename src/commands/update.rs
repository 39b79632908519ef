use anyhow::Result;
use owo_colors::OwoColorize;
use ripple_core::{Event, Ripple};
use serde_json::{Map, Value};

use crate::render::Render;

/// The event, provided `user_id` created it.
fn owned_event(ripple: &Ripple, user_id: &str, event_id: &str) -> Result<Event> {
    let Some(event) = ripple.events().get(event_id) else {
        anyhow::bail!("Event '{}' not found", event_id);
    };
    if event.creator_id != user_id {
        anyhow::bail!("Only the organizer can change '{}'", event.title);
    }
    Ok(event)
}

/// Parse `FIELD=VALUE`. Values that read as JSON (numbers, booleans,
/// quoted strings) keep their type; anything else is a plain string.
fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let Some((field, raw)) = assignment.split_once('=') else {
        anyhow::bail!("Expected FIELD=VALUE, got '{}'", assignment);
    };
    let field = field.trim();
    if field.is_empty() {
        anyhow::bail!("Missing field name in '{}'", assignment);
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((field.to_string(), value))
}

pub fn run(ripple: &Ripple, user_id: &str, event_id: &str, assignments: &[String]) -> Result<()> {
    owned_event(ripple, user_id, event_id)?;

    let mut patch = Map::new();
    for assignment in assignments {
        let (field, value) = parse_assignment(assignment)?;
        patch.insert(field, value);
    }

    let event = ripple.events().update(event_id, patch)?;
    println!("{} Updated {}", "✓".green(), event.render());
    Ok(())
}

pub fn cancel(ripple: &Ripple, user_id: &str, event_id: &str) -> Result<()> {
    let event = owned_event(ripple, user_id, event_id)?;
    ripple.events().cancel(event_id)?;

    let registered = ripple.registrations().count_for_event(event_id);
    println!("{} Cancelled {}", "✓".red(), event.title.bold());
    if registered > 0 {
        println!(
            "{}",
            format!("  {} registrations kept for the record", registered).dimmed()
        );
    }
    Ok(())
}
