use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use pdr_crypto::{ContentHasher, HashAlgorithm, VerifyingKey};
use pdr_repo::{CommitChain, RepositoryManager, SqliteStore};
use pdr_server::{PdrServer, ServerConfig, StorageConfig};
use serde::Serialize;

use crate::cli::*;

const DEFAULT_DB: &str = "pdr.db";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let ctx = Globals {
        db: cli.db,
        hash: cli.hash,
        format: cli.format,
    };
    match cli.command {
        Command::Serve(args) => cmd_serve(&ctx, args),
        Command::Post(args) => cmd_post(&ctx, args),
        Command::Posts(args) => cmd_posts(&ctx, args),
        Command::Log(args) => cmd_log(&ctx, args),
        Command::Verify(args) => cmd_verify(&ctx, args),
        Command::Replay(args) => cmd_replay(&ctx, args),
        Command::Repos => cmd_repos(&ctx),
    }
}

/// Global options every command sees.
struct Globals {
    db: Option<PathBuf>,
    hash: HashAlgorithm,
    format: OutputFormat,
}

impl Globals {
    fn db_path(&self) -> &Path {
        self.db.as_deref().unwrap_or(Path::new(DEFAULT_DB))
    }

    fn manager(&self) -> anyhow::Result<RepositoryManager> {
        let path = self.db_path();
        let store = SqliteStore::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        Ok(RepositoryManager::new(
            Arc::new(store),
            CommitChain::new(ContentHasher::new(self.hash)),
        ))
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_serve(ctx: &Globals, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(db) = &ctx.db {
        config.storage = StorageConfig::Sqlite { path: db.clone() };
    }

    let server = PdrServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_post(ctx: &Globals, args: PostArgs) -> anyhow::Result<()> {
    let manager = ctx.manager()?;
    let doc = manager.create_post(&args.did, &args.content)?;
    if ctx.json() {
        return print_json(&doc);
    }
    let repo = manager.repository(&args.did)?;
    println!("{} Created {}", "✓".green().bold(), doc.id.yellow());
    println!("  Repository: {}", doc.repository_did.to_string().cyan());
    println!("  Head: {}", repo.head.short_hex().yellow());
    Ok(())
}

fn cmd_posts(ctx: &Globals, args: DidArgs) -> anyhow::Result<()> {
    let posts = ctx.manager()?.list_posts(&args.did)?;
    if ctx.json() {
        return print_json(&posts);
    }
    if posts.is_empty() {
        println!("No posts for {}.", args.did.cyan());
        return Ok(());
    }
    for post in &posts {
        let text = post.value.get("text").and_then(|v| v.as_str()).unwrap_or("");
        println!(
            "{}  {}  {}",
            post.id.yellow(),
            post.created_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            text
        );
    }
    Ok(())
}

fn cmd_log(ctx: &Globals, args: LogArgs) -> anyhow::Result<()> {
    let history = ctx.manager()?.history(&args.did, args.limit)?;
    if ctx.json() {
        return print_json(&history);
    }
    if history.is_empty() {
        println!("No commits for {}.", args.did.cyan());
        return Ok(());
    }
    for commit in &history {
        let signed = if commit.signed { " signed".green().to_string() } else { String::new() };
        println!(
            "{}  {}{}",
            commit.id.short_hex().yellow().bold(),
            commit.created_at.to_rfc3339().dimmed(),
            signed
        );
        println!(
            "  {} {}",
            commit.op.as_deref().unwrap_or("?"),
            commit.path.as_deref().unwrap_or("(opaque payload)")
        );
    }
    Ok(())
}

fn cmd_verify(ctx: &Globals, args: VerifyArgs) -> anyhow::Result<()> {
    let key = args
        .key
        .as_deref()
        .map(VerifyingKey::from_hex)
        .transpose()
        .context("parsing --key")?;
    let report = ctx.manager()?.verify_with_key(&args.did, key.as_ref())?;
    if ctx.json() {
        print_json(&report)?;
    } else if report.is_valid() {
        println!("{} Commit chain integrity verified", "✓".green().bold());
        println!("  Head: {}", report.head.short_hex().yellow());
        println!(
            "  Commits: {} walked, {} stored",
            report.commits_walked, report.commits_stored
        );
        println!("  Hashes ({}): {}", ctx.hash, "valid".green());
        if let Some(key) = &key {
            println!("  Signatures ({}): {}", key.to_hex().dimmed(), "valid".green());
        }
    } else {
        println!(
            "{} Commit chain has {} violation(s)",
            "✗".red().bold(),
            report.violations.len()
        );
        for v in &report.violations {
            println!("  {} {:?}: {}", v.commit.short_hex().yellow(), v.kind, v.description);
        }
    }
    if !report.is_valid() {
        anyhow::bail!("verification failed for {}", args.did);
    }
    Ok(())
}

fn cmd_replay(ctx: &Globals, args: DidArgs) -> anyhow::Result<()> {
    let result = ctx.manager()?.replay(&args.did)?;
    if ctx.json() {
        return print_json(&result);
    }
    println!(
        "{} Replayed {} commit(s) into {} document(s)",
        "✓".green().bold(),
        result.applied_commits,
        result.state.len()
    );
    for path in result.state.keys() {
        println!("  {}", path.yellow());
    }
    Ok(())
}

fn cmd_repos(ctx: &Globals) -> anyhow::Result<()> {
    let dids = ctx.manager()?.list_repositories()?;
    if ctx.json() {
        return print_json(&dids);
    }
    if dids.is_empty() {
        println!("No repositories.");
    }
    for did in dids {
        println!("{}", did.to_string().cyan());
    }
    Ok(())
}
