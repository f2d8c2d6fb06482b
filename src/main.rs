//! mirrorsync - mirror a remote directory listing into object storage

use clap::Parser;
use mirrorsync::cli::{Cli, Commands, ConfigArgs};
use mirrorsync::config::Config;
use mirrorsync::fetch::Fetcher;
use mirrorsync::retry::RetryConfig;
use mirrorsync::source::SourceLister;
use mirrorsync::storage::StorageBackend;
use mirrorsync::sync::SyncEngine;
use mirrorsync::Error;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json);

    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Sync(args) => {
            args.apply(&mut config);
            config.validate()?;

            let cancel = setup_shutdown_handler();
            let engine = build_engine(&config).await?;
            let source = lister(&config)?.list().await?;

            tracing::info!(
                store = %config.store,
                directory = %config.directory,
                manifest = %config.manifest_key,
                dry_run = config.dry_run,
                "Starting sync"
            );

            if config.dry_run {
                let plan = engine.plan(&source).await?;
                mirrorsync::progress::print_plan(&plan);
                return Ok(());
            }

            match engine.run(source, &cancel).await {
                Ok(report) => {
                    mirrorsync::progress::print_summary(&report.stats, report.state);
                    if !config.snapshots.is_empty() {
                        let bytes = engine.run_snapshots().await?;
                        tracing::info!(
                            snapshots = config.snapshots.len(),
                            bytes,
                            "Snapshots mirrored"
                        );
                    }
                    println!("{}", serde_json::to_string(&report.result())?);
                }
                Err(Error::RunFailed {
                    uploaded,
                    deleted,
                    failures,
                }) => {
                    for failure in &failures {
                        eprintln!("failed: {}: {}", failure.name, failure.reason);
                    }
                    anyhow::bail!(
                        "sync failed: {} operations failed ({} uploaded, {} deleted); manifest not updated",
                        failures.len(),
                        uploaded,
                        deleted
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::List(args) => {
            args.apply(&mut config);
            let files = lister(&config)?.list().await?;
            println!("{}", serde_json::to_string_pretty(&files)?);
        }

        Commands::Plan(args) => {
            args.apply(&mut config);
            config.validate()?;
            let engine = build_engine(&config).await?;
            let source = lister(&config)?.list().await?;
            let plan = engine.plan(&source).await?;
            mirrorsync::progress::print_plan(&plan);
        }

        Commands::Manifest(args) => {
            args.apply(&mut config);
            let store = StorageBackend::from_config(&config).await?;
            let manifest = mirrorsync::manifest::ManifestStore::new(store, config.manifest_key.clone())
                .load()
                .await?;
            println!("{}", String::from_utf8_lossy(&manifest.to_json()?));
        }

        Commands::Config(args) => {
            handle_config_command(args, &config)?;
        }
    }

    Ok(())
}

async fn build_engine(config: &Config) -> anyhow::Result<SyncEngine> {
    let store = StorageBackend::from_config(config).await?;
    tracing::debug!(backend = store.name(), "Store ready");
    let fetcher = Fetcher::from_config(config)?;
    Ok(SyncEngine::new(config.clone(), store, fetcher))
}

fn lister(config: &Config) -> anyhow::Result<SourceLister> {
    let fetcher = Fetcher::from_config(config)?;
    Ok(SourceLister::new(
        fetcher,
        config.source.clone(),
        RetryConfig::from(config),
    ))
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::new("mirrorsync=info"),
        1 => EnvFilter::new("mirrorsync=debug"),
        2 => EnvFilter::new("mirrorsync=trace"),
        _ => EnvFilter::new("trace"),
    };

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn setup_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received Ctrl+C, aborting before the manifest is written...");
            child.cancel();
        }
    });

    token
}

fn handle_config_command(args: ConfigArgs, config: &Config) -> anyhow::Result<()> {
    if args.path {
        match Config::default_config_path() {
            Ok(path) => println!("{}", path.display()),
            Err(e) => eprintln!("Error: {}", e),
        }
    } else if args.init {
        let config = Config::default();
        config.save()?;
        println!(
            "Created default configuration at {}",
            Config::default_config_path()?.display()
        );
    } else {
        println!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}
