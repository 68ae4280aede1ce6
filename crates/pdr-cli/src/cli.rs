use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pdr_crypto::HashAlgorithm;

#[derive(Parser)]
#[command(
    name = "pdr",
    about = "PDR: per-identity personal data repositories with a content-addressed commit log",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// SQLite database file (local commands default to ./pdr.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Hash algorithm used to build and verify commit ids
    #[arg(long, global = true, default_value = "blake3")]
    pub hash: HashAlgorithm,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Create a post in a repository
    Post(PostArgs),
    /// List a repository's posts, newest first
    Posts(DidArgs),
    /// Show commit history, newest first
    Log(LogArgs),
    /// Verify commit chain integrity
    Verify(VerifyArgs),
    /// Rebuild documents from commit history
    Replay(DidArgs),
    /// List known repositories
    Repos,
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Listen address (overrides the config file)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct PostArgs {
    pub did: String,
    pub content: String,
}

#[derive(Args)]
pub struct DidArgs {
    pub did: String,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub did: String,
    /// Hex Ed25519 public key every commit must be signed with
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Args)]
pub struct LogArgs {
    pub did: String,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}
