mod commands;
mod render;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ripple_core::{
    Event, EventNotifier, HttpMirror, NoMirror, ReplicationSink, Ripple, RippleConfig,
    RippleResult,
};
use tokio::runtime::Handle;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "ripple")]
#[command(about = "Browse, create and register for community events")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account (password is prompted, or read from RIPPLE_PASSWORD)
    Signup {
        name: String,
        email: String,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },
    /// Check credentials and print the user id to pass as --user
    Login {
        /// Email or username
        login: String,
    },
    /// List active events
    Events {
        /// Match title, description or location
        #[arg(short, long)]
        query: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        /// Only events created by this user
        #[arg(long, conflicts_with_all = ["popular", "upcoming", "from"])]
        creator: Option<String>,

        /// The N events with the most participants
        #[arg(long, conflicts_with_all = ["upcoming", "from"])]
        popular: Option<usize>,

        /// Events in the next N days
        #[arg(long, conflicts_with = "from")]
        upcoming: Option<i64>,

        /// Start of a date range (YYYY-MM-DD), requires --to
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// End of a date range (YYYY-MM-DD), inclusive
        #[arg(long, requires = "from")]
        to: Option<String>,
    },
    /// Show one event in full
    Show {
        event_id: String,

        #[arg(short, long)]
        user: Option<String>,
    },
    /// Create an event
    New {
        title: String,

        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        #[arg(short, long)]
        location: String,

        #[arg(short, long)]
        user: String,

        #[arg(long)]
        description: String,

        /// Time of day (e.g. "18:30")
        #[arg(short, long)]
        time: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        max: Option<u32>,

        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        country: Option<String>,
    },
    /// Change fields of an event you created
    Update {
        event_id: String,

        #[arg(short, long)]
        user: String,

        /// Field assignment, e.g. --set title="Rust meetup" --set max_participants=30
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        sets: Vec<String>,
    },
    /// Cancel an event you created
    CancelEvent {
        event_id: String,

        #[arg(short, long)]
        user: String,
    },
    /// Register for an event using your account's contact details
    Register {
        event_id: String,

        #[arg(short, long)]
        user: String,
    },
    /// Withdraw a registration
    Unregister {
        event_id: String,

        #[arg(short, long)]
        user: String,
    },
    /// Events you registered for and events you created
    Mine {
        #[arg(short, long)]
        user: String,
    },
    /// List event categories
    Categories,
    /// Add an event category
    AddCategory { name: String },
    /// Events near a location, closest first
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Search radius in km (defaults to search_radius_km from config)
        #[arg(short, long, conflicts_with = "all")]
        radius: Option<f64>,

        /// Every active event, including those without coordinates
        #[arg(long)]
        all: bool,
    },
    /// Record counts and file sizes
    Stats,
    /// Copy all data files into a timestamped backup directory
    Backup,
    /// Remove old cancelled events nobody attended
    Cleanup {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Print everything stored about a user as JSON
    Export {
        #[arg(short, long)]
        user: String,
    },
    /// Delete a user account and release its registrations
    Erase {
        #[arg(short, long)]
        user: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Logs every newly published event.
struct LogNotifier;

impl EventNotifier for LogNotifier {
    fn event_created(&self, event: &Event) -> RippleResult<()> {
        info!(event_id = %event.id, title = %event.title, "published new event");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RippleConfig::load()?;

    let mirror = config
        .mirror
        .as_ref()
        .map(|m| Arc::new(HttpMirror::from_config(m, Handle::current())));
    let sink: Arc<dyn ReplicationSink> = match &mirror {
        Some(mirror) => mirror.clone(),
        None => Arc::new(NoMirror),
    };
    let ripple = Ripple::open_with(config, sink, Arc::new(LogNotifier))?;

    let result = run(&ripple, cli.command);

    if let Some(mirror) = mirror {
        mirror.drain().await;
    }
    result
}

fn run(ripple: &Ripple, command: Commands) -> Result<()> {
    match command {
        Commands::Signup {
            name,
            email,
            username,
            phone,
        } => commands::account::signup(ripple, &name, &email, username, phone),
        Commands::Login { login } => commands::account::login(ripple, &login),
        Commands::Events {
            query,
            category,
            creator,
            popular,
            upcoming,
            from,
            to,
        } => {
            let filter = commands::events::Filter {
                query,
                category,
                creator,
                popular,
                upcoming,
                range: from.zip(to),
            };
            commands::events::list(ripple, filter)
        }
        Commands::Show { event_id, user } => {
            commands::events::show(ripple, &event_id, user.as_deref())
        }
        Commands::New {
            title,
            date,
            location,
            user,
            description,
            time,
            category,
            max,
            lat,
            lon,
            city,
            country,
        } => {
            let args = commands::new::NewArgs {
                title,
                date,
                location,
                description,
                time,
                category,
                max,
                coordinates: lat.zip(lon),
                city,
                country,
            };
            commands::new::run(ripple, &user, args)
        }
        Commands::Update {
            event_id,
            user,
            sets,
        } => commands::update::run(ripple, &user, &event_id, &sets),
        Commands::CancelEvent { event_id, user } => {
            commands::update::cancel(ripple, &user, &event_id)
        }
        Commands::Register { event_id, user } => {
            commands::register::register(ripple, &user, &event_id)
        }
        Commands::Unregister { event_id, user } => {
            commands::register::unregister(ripple, &user, &event_id)
        }
        Commands::Mine { user } => commands::register::mine(ripple, &user),
        Commands::Categories => commands::categories::list(ripple),
        Commands::AddCategory { name } => commands::categories::add(ripple, &name),
        Commands::Nearby {
            lat,
            lon,
            radius,
            all,
        } => commands::events::nearby(ripple, lat, lon, radius, all),
        Commands::Stats => commands::maintenance::stats(ripple),
        Commands::Backup => commands::maintenance::backup(ripple),
        Commands::Cleanup { days } => commands::maintenance::cleanup(ripple, days),
        Commands::Export { user } => commands::maintenance::export(ripple, &user),
        Commands::Erase { user, yes } => commands::maintenance::erase(ripple, &user, yes),
    }
}
