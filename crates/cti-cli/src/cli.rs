use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ctiv",
    about = "CTI Vault -- STIX object and TAXII collection storage",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Store configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path, overriding the configuration file
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the database tables
    Init,
    /// Register and manage collections
    Collection(CollectionArgs),
    /// Manage which objects belong to a collection
    Content(ContentArgs),
    /// Create, version and inspect STIX objects
    Object(ObjectArgs),
}

#[derive(Args)]
pub struct CollectionArgs {
    #[command(subcommand)]
    pub action: CollectionAction,
}

#[derive(Subcommand)]
pub enum CollectionAction {
    /// Register a new collection
    Create {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Use this id instead of generating one
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        read: bool,
        #[arg(long)]
        write: bool,
    },
    /// List every collection
    List,
    /// Show one collection
    Show { id: String },
    Enable { id: String },
    Disable { id: String },
    /// Show accepted media types, or add to them when any are given
    MediaTypes {
        id: String,
        media_types: Vec<String>,
    },
}

#[derive(Args)]
pub struct ContentArgs {
    #[command(subcommand)]
    pub action: ContentAction,
}

#[derive(Subcommand)]
pub enum ContentAction {
    /// Add an object identity to a collection
    Add {
        collection: String,
        stix_id: String,
        /// RFC 3339 time the object was added; defaults to now
        #[arg(long)]
        date_added: Option<String>,
    },
    /// List the distinct identities in a collection
    List {
        collection: String,
        /// Only identities added strictly after this RFC 3339 time
        #[arg(long)]
        added_after: Option<String>,
        /// Print the latest stored version of each identity
        #[arg(long)]
        objects: bool,
    },
}

#[derive(Args)]
pub struct ObjectArgs {
    #[command(subcommand)]
    pub action: ObjectAction,
}

/// Field edits applied when creating or versioning an object.
#[derive(Args, Debug, Default)]
pub struct ObjectEdits {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long = "label")]
    pub labels: Vec<String>,
    #[arg(long)]
    pub confidence: Option<u8>,
}

#[derive(Subcommand)]
pub enum ObjectAction {
    /// Create and store a new object
    New {
        /// STIX type, e.g. attack-pattern
        object_type: String,
        #[command(flatten)]
        edits: ObjectEdits,
        /// Also add the object to this collection
        #[arg(long)]
        collection: Option<String>,
    },
    /// Store a new version of the latest stored version
    Version {
        id: String,
        #[command(flatten)]
        edits: ObjectEdits,
        #[arg(long)]
        revoke: bool,
        #[arg(long)]
        collection: Option<String>,
    },
    /// Store an object from its JSON form
    Import {
        file: PathBuf,
        #[arg(long)]
        collection: Option<String>,
    },
    /// Show the latest version, or the one modified at the given time
    Show {
        id: String,
        #[arg(long)]
        modified: Option<String>,
    },
    /// List every stored version of an object
    History { id: String },
}
