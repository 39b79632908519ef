use anyhow::{Context, Result};
use chrono::Local;
use owo_colors::OwoColorize;
use ripple_core::{Collection, Ripple};

use crate::render::pluralize;

pub fn stats(ripple: &Ripple) -> Result<()> {
    let stats = ripple.maintenance().stats();

    println!("{}", ripple.data_path().display().to_string().bold());
    let rows = [
        ("Users", stats.users, Collection::Users),
        ("Events", stats.events, Collection::Events),
        ("Registrations", stats.registrations, Collection::Registrations),
        ("Categories", stats.categories, Collection::Categories),
    ];
    for (label, count, collection) in rows {
        let size = stats
            .file_bytes
            .get(collection.name())
            .map(|bytes| format!("{:.1} KB", *bytes as f64 / 1024.0))
            .unwrap_or_else(|| "missing".to_string());
        println!("  {:<14} {:>6}  {}", label, count, size.dimmed());
    }
    println!(
        "{}",
        format!(
            "  {} {}, {:.1} KB",
            stats.total_files,
            pluralize("file", stats.total_files),
            stats.total_bytes as f64 / 1024.0
        )
        .dimmed()
    );
    Ok(())
}

pub fn backup(ripple: &Ripple) -> Result<()> {
    let dir = ripple.maintenance().backup(Local::now().naive_local())?;
    println!("{} Backed up to {}", "✓".green(), dir.display());
    Ok(())
}

pub fn cleanup(ripple: &Ripple, days: i64) -> Result<()> {
    let removed = ripple
        .maintenance()
        .cleanup_old_events(Local::now().naive_local(), days)?;

    if removed == 0 {
        println!("{}", "Nothing to clean up".dimmed());
    } else {
        println!(
            "{} Removed {} old cancelled {}",
            "✓".green(),
            removed,
            pluralize("event", removed)
        );
    }
    Ok(())
}

pub fn export(ripple: &Ripple, user_id: &str) -> Result<()> {
    let export = ripple
        .maintenance()
        .export_user_data(user_id, Local::now().naive_local());
    if export.user.is_none() {
        anyhow::bail!("Unknown user '{}'", user_id);
    }

    let json = serde_json::to_string_pretty(&export).context("Failed to serialize export")?;
    println!("{}", json);
    Ok(())
}

pub fn erase(ripple: &Ripple, user_id: &str, confirmed: bool) -> Result<()> {
    if !confirmed {
        anyhow::bail!(
            "This permanently deletes the account and its registrations.\n\
            Run again with --yes to confirm."
        );
    }

    let summary = ripple.maintenance().delete_user_data(user_id)?;
    if summary.users == 0 {
        anyhow::bail!("Unknown user '{}'", user_id);
    }

    println!("{} Account deleted", "✓".green());
    println!(
        "  {} {} removed, {} {} cancelled",
        summary.registrations,
        pluralize("registration", summary.registrations),
        summary.events_deactivated,
        pluralize("event", summary.events_deactivated)
    );
    Ok(())
}
