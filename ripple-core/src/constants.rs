/// Category assigned to events created without one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Capacity assigned to events created without one.
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 50;

/// Categories written to a fresh categories file.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Technology",
    "Business",
    "Education",
    "Health & Wellness",
    "Arts & Culture",
    "Sports & Fitness",
    "Food & Drink",
    "Music & Entertainment",
    "Community",
    "Professional Development",
    "Travel",
    "Gaming",
    "Photography",
    "Science",
    "Environment",
];

/// Creator name written onto events whose creator erased their account.
pub const DELETED_USER_NAME: &str = "Deleted User";

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
