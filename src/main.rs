mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Command, ConfigCommand, RepoCommand};
use tracko::config::{AppConfig, ConfigField, default_config_path};
use tracko::import::{Importer, open_store};
use tracko::repository::{GitSource, VerboseProgress};
use tracko::util::format_marker;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracko::logging::init_subscriber(&cli.log_level);

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };

    match cli.command {
        Command::Import { quiet } => import(&config_path, quiet).await,
        Command::Status => status(&config_path).await,
        Command::Config(command) => config(&config_path, command),
    }
}

fn load_config(config_path: &Path) -> Result<AppConfig> {
    let config = AppConfig::load(config_path)?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;
    Ok(config)
}

async fn import(config_path: &Path, quiet: bool) -> Result<()> {
    let config = load_config(config_path)?;

    if config.tracked_repos.is_empty() {
        println!("No tracked repositories. Add one with 'tracko config repo add <path>'.");
        return Ok(());
    }

    if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create database directory {}", parent.display()))?;
    }
    let db = open_store(&config.db_location()).await?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping import");
                cancel.cancel();
            }
        }
    });

    let report = Importer::new(Arc::new(db), Arc::new(GitSource), config.author_filter())
        .with_batch_size(config.import.batch_size)
        .with_channel_capacity(config.import.channel_capacity)
        .with_cancellation(cancel)
        .with_progress(Arc::new(VerboseProgress::new(!quiet)))
        .run_detailed(&config.tracked_repos)
        .await;

    println!(
        "Imported {} new commits from {} repositories ({} scanned)",
        report.inserted, report.repositories, report.scanned
    );

    if !report.is_success() {
        for err in &report.errors {
            eprintln!("error: {}", err);
        }
        bail!("Import {} with {} errors", report.phase, report.errors.len());
    }
    Ok(())
}

async fn status(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let db = open_store(&config.db_location()).await?;

    println!("Author: {} <{}>", config.author.name, config.author.emails.join(", "));
    println!("Database: {}", config.db_path.display());
    println!();

    for path in &config.tracked_repos {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
        let tracked = db.get_tracked_repo(&key.to_string_lossy()).await?;

        let (last_scanned, resume_marker, commits) = match tracked {
            Some(repo) => (repo.last_scanned, repo.resume_marker, db.count_repo_commits(repo.id).await?),
            None => (None, None, 0),
        };
        println!(
            "{:<60} {:>8} commits   last commit {}   resumes from {}",
            path.display(),
            commits,
            format_marker(last_scanned),
            format_marker(resume_marker)
        );
    }

    println!();
    println!("Total: {} commits", db.count_commits().await?);
    Ok(())
}

fn config(config_path: &Path, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Init { name, emails, db_path, target_repo, force } => {
            if config_path.exists() && !force {
                bail!(
                    "Configuration already exists at {}, pass --force to overwrite",
                    config_path.display()
                );
            }

            let mut config = AppConfig::new(name, emails);
            if let Some(db_path) = db_path {
                config.db_path = db_path;
            }
            if let Some(target_repo) = target_repo {
                config.target_repo = target_repo;
            }
            config.validate()?;
            config.save(config_path)?;
            println!("Initialized configuration at {}", config_path.display());
        }
        ConfigCommand::Get { key } => {
            let field: ConfigField = key.parse()?;
            let config = AppConfig::load(config_path)?;
            println!("{}", config.get(field));
        }
        ConfigCommand::Set { key, value } => {
            let field: ConfigField = key.parse()?;
            let mut config = AppConfig::load(config_path)?;
            config.set(field, &value)?;
            config.save(config_path)?;
            println!("{} = {}", field, config.get(field));
        }
        ConfigCommand::Repo(RepoCommand::Add { path }) => {
            let mut config = AppConfig::load(config_path)?;
            let added = config.add_tracked_repo(&path)?;
            config.save(config_path)?;
            println!("Tracking {}", added.display());
        }
        ConfigCommand::Repo(RepoCommand::Remove { path }) => {
            let mut config = AppConfig::load(config_path)?;
            let removed = config.remove_tracked_repo(&path)?;
            config.save(config_path)?;
            println!("No longer tracking {}", removed.display());
        }
        ConfigCommand::Repo(RepoCommand::List) => {
            let config = AppConfig::load(config_path)?;
            if config.tracked_repos.is_empty() {
                println!("No tracked repositories");
            }
            for path in &config.tracked_repos {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}
