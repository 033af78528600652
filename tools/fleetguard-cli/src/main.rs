use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fleetguard_core::session::{AuthSession, SessionStore, open_session_store};
use fleetguard_core::{FleetGuardConfig, GraphQlClient};
use tracing::Level;
use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod account;
mod booking;
mod output;
mod track;

#[derive(Parser, Debug)]
#[command(
    name = "fleetguard",
    author,
    version,
    about = "Search, book and follow intercity bus trips",
    long_about = "Passenger client for the FleetGuard booking backend.\n\n\
                  Trips are searched and booked over GraphQL. The `track` command \
                  simulates the bus position along the road route between the two \
                  cities, assuming an on-time departure and constant speed."
)]
struct Args {
    /// Configuration file (.toml or .json); built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output (show debug messages)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List trips between two cities on a date
    Search {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Service date (YYYY-MM-DD), today when omitted
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List the cities served
    Cities,
    /// Sign in and remember the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "FLEETGUARD_PASSWORD")]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Create a passenger account
    Register(account::RegisterArgs),
    /// Email a password reset link
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Set a new password with the token from the reset email
    ResetPassword {
        #[arg(long)]
        token: String,
        #[arg(long, env = "FLEETGUARD_NEW_PASSWORD")]
        new_password: String,
    },
    /// List your reservations
    Reservations,
    /// Book seats on a trip
    Reserve(booking::ReserveArgs),
    /// Cancel one of your reservations
    Cancel {
        #[arg(long)]
        reservation: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Rate a completed trip
    Rate {
        #[arg(long)]
        reservation: String,
        /// 1 to 5
        #[arg(long)]
        score: u8,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Follow the simulated position of a bus
    Track(track::TrackArgs),
}

/// Services shared by every command.
pub struct App {
    pub config: FleetGuardConfig,
    pub api: GraphQlClient,
    pub store: Arc<dyn SessionStore>,
}

impl App {
    fn new(config: FleetGuardConfig) -> Result<Self> {
        let http = config.http_client().context("Failed to build HTTP client")?;
        let api = GraphQlClient::from_config(http, &config)
            .context("Invalid GraphQL configuration")?;
        let store = open_session_store(&config.session);
        Ok(Self {
            config,
            api,
            store,
        })
    }

    /// The stored session, or an error asking the user to sign in.
    pub async fn require_session(&self) -> Result<AuthSession> {
        AuthSession::restore(self.store.as_ref())
            .await
            .context("Failed to read session")?
            .context("Not signed in; run `fleetguard login` first")
    }
}

fn setup_logging(verbose: bool) {
    let max_level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = FilterFn::new(move |meta| {
        meta.module_path().unwrap_or_default().starts_with("fleetguard") && *meta.level() <= max_level
    });
    let layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(verbose)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry().with(layer).with(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let config = match &args.config {
        Some(path) => FleetGuardConfig::try_from(path.as_path())
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FleetGuardConfig::default(),
    };
    tracing::debug!(endpoint = %config.graphql_endpoint, "configuration loaded");

    let app = App::new(config)?;

    match args.command {
        Command::Search { from, to, date } => booking::search(&app, &from, &to, date).await,
        Command::Cities => booking::cities(&app).await,
        Command::Login { username, password } => account::login(&app, &username, &password).await,
        Command::Logout => account::logout(&app).await,
        Command::Register(register) => account::register(&app, register).await,
        Command::ForgotPassword { email } => account::forgot_password(&app, &email).await,
        Command::ResetPassword {
            token,
            new_password,
        } => account::reset_password(&app, &token, &new_password).await,
        Command::Reservations => booking::reservations(&app).await,
        Command::Reserve(reserve) => booking::reserve(&app, reserve).await,
        Command::Cancel {
            reservation,
            reason,
        } => booking::cancel(&app, &reservation, reason.as_deref()).await,
        Command::Rate {
            reservation,
            score,
            comment,
        } => booking::rate(&app, &reservation, score, comment.as_deref()).await,
        Command::Track(track) => track::run(&app, track).await,
    }
}
