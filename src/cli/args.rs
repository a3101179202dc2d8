use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// spotify-backup - keep a local JSON copy of your Spotify library
///
/// Saves playlists, saved albums/tracks/episodes/shows, top artists and
/// tracks and followed artists, one JSON file per category. Files are only
/// rewritten when their content changes.
#[derive(Parser, Debug)]
#[command(name = "spotify-backup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file (defaults to config.toml in the state directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory receiving the backup files
    #[arg(long, global = true)]
    pub backup_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Back up the library (default)
    Backup {
        /// Only back up these categories (repeatable)
        #[arg(long = "only", value_name = "NAME")]
        only: Vec<String>,
    },
    /// Authorize access to your Spotify account
    Auth,
    /// Delete cached credentials
    Logout,
    /// Show the authenticated user
    Whoami,
    /// Show the run history
    Log,
    /// List category names and their backup files
    Categories,
}
