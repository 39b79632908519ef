//! Terminal rendering for Ripple types.
//!
//! Extension traits that add colored output to ripple-core types using
//! owo_colors.

use owo_colors::OwoColorize;
use ripple_core::{Event, Nearby, User};

pub trait Render {
    fn render(&self) -> String;
}

impl Render for Event {
    fn render(&self) -> String {
        let when = if self.time.is_empty() {
            self.date.clone()
        } else {
            format!("{} {}", self.date, self.time)
        };

        let seats = format!("{}/{}", self.current_participants, self.max_participants);
        let seats = if self.is_full() {
            seats.red().to_string()
        } else {
            seats.green().to_string()
        };

        let title = if self.is_active {
            self.title.clone()
        } else {
            format!("{} (cancelled)", self.title.strikethrough())
        };

        format!(
            "{} {} {} {} {}",
            when.bold(),
            title,
            format!("@ {}", self.location).dimmed(),
            seats,
            format!("[{}]", self.id).dimmed()
        )
    }
}

impl Render for Nearby {
    fn render(&self) -> String {
        let distance = if self.distance_km.is_finite() {
            format!("{:>8.1} km", self.distance_km)
        } else {
            format!("{:>11}", "?")
        };
        format!("{} {}", distance.cyan(), self.event.render())
    }
}

impl Render for User {
    fn render(&self) -> String {
        let handle = self
            .username
            .as_ref()
            .map(|u| format!(" @{u}"))
            .unwrap_or_default();
        format!(
            "{}{} <{}> {}",
            self.name.bold(),
            handle,
            self.email,
            format!("[{}]", self.id).dimmed()
        )
    }
}

/// Multi-line view of a single event.
pub fn render_details(event: &Event) -> Vec<String> {
    let mut lines = vec![event.title.bold().to_string()];

    let status = if event.is_active {
        "active".green().to_string()
    } else {
        "cancelled".red().to_string()
    };
    lines.push(format!("  {:<12} {}", "Status", status));
    lines.push(format!("  {:<12} {}", "Category", event.category));

    let when = if event.time.is_empty() {
        event.date.clone()
    } else {
        format!("{} at {}", event.date, event.time)
    };
    lines.push(format!("  {:<12} {}", "When", when));

    let mut place = event.location.clone();
    for part in [&event.city, &event.country] {
        if !part.is_empty() {
            place.push_str(", ");
            place.push_str(part);
        }
    }
    lines.push(format!("  {:<12} {}", "Where", place));

    if let (Some(lat), Some(lon)) = (event.latitude, event.longitude) {
        lines.push(format!("  {:<12} {:.4}, {:.4}", "Coordinates", lat, lon));
    }

    lines.push(format!(
        "  {:<12} {}/{}",
        "Attendees", event.current_participants, event.max_participants
    ));
    if !event.creator_name.is_empty() {
        lines.push(format!("  {:<12} {}", "Organizer", event.creator_name));
    }

    if !event.description.is_empty() {
        lines.push(String::new());
        lines.extend(event.description.lines().map(|l| format!("  {l}")));
    }
    lines
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}
