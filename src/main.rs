mod cli;
mod error;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use audiohub_cache::{Database, LibraryStore, SortKey, StoreHandle};
use audiohub_config::Config;
use audiohub_library::scan::ScanOptions;
use audiohub_library::{AbortReason, ChannelObserver, ScanEvent, ScanOutcome, ScanSummary, Scanner};
use audiohub_storage::BackendHandle;
use audiohub_storage::backend::LocalBackend;
use audiohub_storage::lease::{LeaseRef, LocalLease};
use clap::Parser;
use exn::ResultExt;
use std::sync::Arc;
use time::UtcDateTime;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    cli.apply(&mut config);
    config.validate().or_raise(|| ErrorKind::Config)?;

    match cli.command {
        Command::Scan { dry_run, .. } => scan(&config, dry_run).await,
        Command::List { sort, files } => list(&config, sort.into(), files).await,
        Command::Status => status(&config).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn open_database(config: &Config) -> Result<Database> {
    let path = config.cache_path().or_raise(|| ErrorKind::Config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Database)?;
    }
    tracing::debug!(path = %path.display(), "opening library database");
    Database::connect(&path).await.or_raise(|| ErrorKind::Database)
}

async fn scan(config: &Config, dry_run: bool) -> Result<()> {
    let root = config.root().or_raise(|| ErrorKind::Config)?;
    let backend: BackendHandle =
        Arc::new(LocalBackend::new(&config.library.name, root).or_raise(|| ErrorKind::Storage)?);
    let lease: LeaseRef = Arc::new(LocalLease::new(root));
    let db = open_database(config).await?;
    let store: StoreHandle = Arc::new(db.repository().dry_run(dry_run));
    let options = ScanOptions {
        concurrency: config.scan.concurrency,
        extract_timeout: config.extract_timeout(),
    };
    if dry_run {
        tracing::info!("dry run: nothing will be written");
    }

    let scanner = Scanner::new(backend, lease, store, options);
    let (observer, mut events) = ChannelObserver::new();
    let handle = scanner.start(Arc::new(observer)).await;
    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, stopping after the current file");
            cancel.cancel();
        }
    });
    // Ends once the scan task drops the observer.
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event);
        }
    });

    let outcome = handle.outcome().await.or_raise(|| ErrorKind::Scan)?;
    _ = printer.await;
    db.close().await;
    match outcome {
        ScanOutcome::Completed(summary) => {
            print_summary(&summary);
            Ok(())
        },
        ScanOutcome::Aborted(AbortReason::Cancelled) => {
            println!("Scan cancelled; everything reconciled so far has been kept.");
            Ok(())
        },
        ScanOutcome::Aborted(reason) => exn::bail!(ErrorKind::Reconnect(reason.to_string())),
    }
}

fn print_event(event: &ScanEvent) {
    match event {
        ScanEvent::Progress { completed, total } => {
            eprint!("\rReading files: {completed}/{total}");
            if completed == total {
                eprintln!();
            }
        },
        ScanEvent::Error(message) => eprintln!("\rwarning: {message}"),
        ScanEvent::Complete(_) | ScanEvent::Aborted(_) => {},
    }
}

fn print_summary(summary: &ScanSummary) {
    println!("Scanned {} books, {} files.", summary.books, summary.files);
    if summary.failures > 0 {
        println!("{} files had unreadable metadata.", summary.failures);
    }
    if summary.skipped > 0 {
        println!("{} files were skipped.", summary.skipped);
    }
    if let Some(message) = &summary.last_error {
        println!("Last problem: {message}");
    }
}

async fn list(config: &Config, sort: SortKey, files: bool) -> Result<()> {
    let db = open_database(config).await?;
    let repo = db.repository();
    let books = repo.list_books(sort).await.or_raise(|| ErrorKind::Database)?;
    if books.is_empty() {
        println!("No books yet. Run `audiohub scan` first.");
    }
    for book in &books {
        let by = book.author.as_deref().or(book.artist.as_deref()).unwrap_or("unknown");
        println!("{} ({by})  [{}]", book.display_title(), book.id.display());
        if !files {
            continue;
        }
        for file in repo.list_files(&book.id).await.or_raise(|| ErrorKind::Database)? {
            let title = file.title.as_deref().unwrap_or(&file.name);
            println!("    {title}.{}  {} bytes  {:.0}s", file.extension, file.size, file.duration);
        }
    }
    db.close().await;
    Ok(())
}

async fn status(config: &Config) -> Result<()> {
    let db = open_database(config).await?;
    let repo = db.repository();
    let last_scan = repo.last_scan().await.or_raise(|| ErrorKind::Database)?;
    let counts = repo.count().await.or_raise(|| ErrorKind::Database)?;
    println!("{}", last_scan.describe(UtcDateTime::now()));
    println!("{} books, {} files", counts.books, counts.files);
    db.close().await;
    Ok(())
}
