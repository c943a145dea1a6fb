//! Command-line surface. One invocation runs one command against the
//! backend configured through `CABIN_*` environment variables.

use std::path::PathBuf;

use cabin_core::account::OAuthProvider;
use cabin_core::resources::{DocumentCategory, EventTime, Priority};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "cabin", about = "Family cabin from the terminal", version)]
pub struct Cli {
    /// Print results as JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CABIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with an access token from an external provider.
    Oauth {
        provider: OAuthProvider,
        #[arg(long = "access-token", env = "CABIN_OAUTH_TOKEN", hide_env_values = true)]
        access_token: String,
    },
    /// Create an account (does not sign in).
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "CABIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored credential.
    Logout,
    /// Show the signed-in member.
    Whoami,
    /// Edit your profile.
    Profile(ProfileArgs),
    /// Change your password.
    Password {
        #[arg(long)]
        current: String,
        #[arg(long = "new")]
        new_password: String,
        #[arg(long)]
        confirm: String,
    },
    /// Summary cards: upcoming events and the latest of everything else.
    Dashboard,
    /// Resolve a path the way the app's router would and report the outcome.
    Open { path: String },
    #[command(subcommand)]
    Calendar(CalendarCommand),
    #[command(subcommand)]
    Notices(NoticeCommand),
    #[command(subcommand)]
    Documents(DocumentCommand),
    #[command(subcommand)]
    Messages(MessageCommand),
    /// Moderate the guest book (members).
    #[command(subcommand)]
    Guestbook(GuestBookCommand),
    /// Guest access with a shared PIN; lists entries, or signs with `sign`.
    Guest(GuestArgs),
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub bio: Option<String>,
    /// Image file to upload as the new avatar.
    #[arg(long, value_name = "path")]
    pub avatar: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct EventArgs {
    #[arg(long)]
    pub title: String,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    #[arg(long)]
    pub start: EventTime,
    #[arg(long)]
    pub end: EventTime,
    #[arg(long)]
    pub description: Option<String>,
    /// The booking has times rather than whole days.
    #[arg(long)]
    pub timed: bool,
}

#[derive(Debug, Subcommand)]
pub enum CalendarCommand {
    List,
    Create(EventArgs),
    Update {
        id: String,
        #[command(flatten)]
        event: EventArgs,
    },
    Delete { id: String },
}

#[derive(Debug, Args)]
pub struct NoticeArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub content: String,
    #[arg(long, default_value = "medium")]
    pub priority: Priority,
}

#[derive(Debug, Subcommand)]
pub enum NoticeCommand {
    List,
    Create(NoticeArgs),
    Update {
        id: String,
        #[command(flatten)]
        notice: NoticeArgs,
    },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum DocumentCommand {
    List {
        /// Only show one category.
        #[arg(long)]
        category: Option<DocumentCategory>,
    },
    Upload {
        file: PathBuf,
        /// Defaults to the file name without its extension.
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "general")]
        category: DocumentCategory,
    },
    Update {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: DocumentCategory,
    },
    Delete { id: String },
    /// Save a document into a directory.
    Download {
        id: String,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum MessageCommand {
    List,
    Send {
        content: String,
        /// Photo to attach.
        #[arg(long, value_name = "path")]
        image: Option<PathBuf>,
    },
    Edit { id: String, content: String },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum GuestBookCommand {
    List,
    Approve { id: String },
    Delete { id: String },
}

#[derive(Debug, Args)]
pub struct GuestArgs {
    pub pin: String,
    #[command(subcommand)]
    pub action: Option<GuestAction>,
}

#[derive(Debug, Subcommand)]
pub enum GuestAction {
    Sign {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        message: String,
        #[arg(long, default_value_t = 5)]
        rating: u8,
        #[arg(long = "visit-date")]
        visit_date: NaiveDate,
    },
}
