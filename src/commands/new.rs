use anyhow::Result;
use owo_colors::OwoColorize;
use ripple_core::{NewEvent, Ripple};

use super::require_user;
use crate::render::render_details;

pub struct NewArgs {
    pub title: String,
    pub date: String,
    pub location: String,
    pub description: String,
    pub time: Option<String>,
    pub category: Option<String>,
    pub max: Option<u32>,
    pub coordinates: Option<(f64, f64)>,
    pub city: Option<String>,
    pub country: Option<String>,
}

pub fn run(ripple: &Ripple, user_id: &str, args: NewArgs) -> Result<()> {
    let user = require_user(ripple, user_id)?;

    if let Some(category) = &args.category
        && !ripple.categories().list().contains(category)
    {
        anyhow::bail!(
            "Unknown category '{}'. See `ripple categories`, or add it with `ripple add-category`",
            category
        );
    }

    let new_event = NewEvent {
        time: args.time.unwrap_or_default(),
        category: args.category,
        max_participants: args.max,
        creator_name: user.name.clone(),
        latitude: args.coordinates.map(|(lat, _)| lat),
        longitude: args.coordinates.map(|(_, lon)| lon),
        city: args.city.unwrap_or_default(),
        country: args.country.unwrap_or_default(),
        ..NewEvent::new(
            &args.title,
            &args.description,
            &args.date,
            &args.location,
            &user.id,
        )
    };

    let event = ripple.events().create(new_event)?;

    println!("{} Created event", "✓".green());
    println!();
    for line in render_details(&event) {
        println!("  {}", line);
    }
    println!();
    println!("  {}", format!("id: {}", event.id).dimmed());

    Ok(())
}
