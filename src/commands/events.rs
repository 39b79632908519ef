use anyhow::Result;
use chrono::Local;
use owo_colors::OwoColorize;
use ripple_core::{Event, Location, Ripple};

use crate::render::{Render, pluralize, render_details};

/// Which listing `ripple events` shows. At most one of `creator`,
/// `popular`, `upcoming` and `range` is set; otherwise a search is run.
pub struct Filter {
    pub query: Option<String>,
    pub category: Option<String>,
    pub creator: Option<String>,
    pub popular: Option<usize>,
    pub upcoming: Option<i64>,
    pub range: Option<(String, String)>,
}

pub fn list(ripple: &Ripple, filter: Filter) -> Result<()> {
    let events = ripple.events();

    let mut found = if let Some(limit) = filter.popular {
        events.popular(limit)
    } else if let Some(days) = filter.upcoming {
        events.upcoming(Local::now().date_naive(), days)
    } else if let Some((from, to)) = &filter.range {
        events.by_date_range(from, to)
    } else if let Some(creator) = &filter.creator {
        events.by_creator(creator)
    } else {
        events.search(
            filter.query.as_deref().unwrap_or_default(),
            filter.category.as_deref(),
        )
    };

    // Listings other than search narrow by query and category afterwards.
    let searched = filter.popular.is_none()
        && filter.upcoming.is_none()
        && filter.range.is_none()
        && filter.creator.is_none();
    if !searched {
        if let Some(category) = &filter.category {
            found.retain(|e| &e.category == category);
        }
        if let Some(query) = &filter.query {
            let query = query.to_lowercase();
            found.retain(|e| matches_query(e, &query));
        }
    }

    print_events(&found);
    Ok(())
}

fn matches_query(event: &Event, query: &str) -> bool {
    [&event.title, &event.description, &event.location]
        .iter()
        .any(|field| field.to_lowercase().contains(query))
}

pub fn print_events(events: &[Event]) {
    if events.is_empty() {
        println!("{}", "No events found".dimmed());
        return;
    }

    for event in events {
        println!("  {}", event.render());
    }
    println!();
    println!(
        "{}",
        format!("{} {}", events.len(), pluralize("event", events.len())).dimmed()
    );
}

pub fn show(ripple: &Ripple, event_id: &str, user_id: Option<&str>) -> Result<()> {
    let Some(event) = ripple.events().all().into_iter().find(|e| e.id == event_id) else {
        anyhow::bail!("Event '{}' not found", event_id);
    };

    for line in render_details(&event) {
        println!("{}", line);
    }

    let Some(user_id) = user_id else {
        return Ok(());
    };

    println!();
    if event.creator_id == user_id {
        let attendees = ripple.registrations().for_event(event_id);
        println!(
            "{}",
            format!(
                "{} {} registered",
                attendees.len(),
                pluralize("attendee", attendees.len())
            )
            .bold()
        );
        for attendee in &attendees {
            println!("  {} {}", attendee.name, format!("<{}>", attendee.email).dimmed());
        }
    } else if ripple.registrations().is_registered(user_id, event_id) {
        println!("{} You are registered", "✓".green());
    } else if event.is_active && !event.is_full() {
        println!(
            "{}",
            format!("Register with: ripple register {} --user {}", event_id, user_id).dimmed()
        );
    }

    Ok(())
}

pub fn nearby(ripple: &Ripple, lat: f64, lon: f64, radius: Option<f64>, all: bool) -> Result<()> {
    let here = Location::new(lat, lon);

    let found = if all {
        ripple.events().sorted_by_distance(&here)
    } else {
        let radius = radius.unwrap_or(ripple.config().search_radius_km);
        println!("{}", format!("Within {} km of {:.4}, {:.4}", radius, lat, lon).dimmed());
        ripple.events().nearby(&here, radius)
    };

    if found.is_empty() {
        println!("{}", "No events found".dimmed());
        return Ok(());
    }

    for nearby in &found {
        println!("{}", nearby.render());
    }
    Ok(())
}
