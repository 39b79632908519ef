use anyhow::Result;
use owo_colors::OwoColorize;
use ripple_core::Ripple;

pub fn list(ripple: &Ripple) -> Result<()> {
    for category in ripple.categories().list() {
        let count = ripple.events().by_category(&category).len();
        if count > 0 {
            println!("  {} {}", category, format!("({})", count).dimmed());
        } else {
            println!("  {}", category);
        }
    }
    Ok(())
}

pub fn add(ripple: &Ripple, name: &str) -> Result<()> {
    if ripple.categories().add(name)? {
        println!("{} Added category {}", "✓".green(), name.trim().bold());
    } else {
        println!("{}", format!("Category '{}' already exists", name.trim()).dimmed());
    }
    Ok(())
}
