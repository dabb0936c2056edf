use audiohub_cache::SortKey;
use audiohub_config::Config;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "audiohub", version)]
#[command(about = "Scan an audiobook library and reconcile it into a local cache", long_about = None)]
pub struct Cli {
    /// Config file, instead of the one in the platform config directory
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Library root, overriding `library.root`
    #[arg(long, global = true, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Library database, overriding `cache.path`
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan the library and reconcile it into the database
    Scan {
        /// Most files to read at once, overriding `scan.concurrency`
        #[arg(long)]
        concurrency: Option<usize>,
        /// Walk and extract, but don't write anything
        #[arg(long)]
        dry_run: bool,
    },
    /// List the books in the database
    List {
        #[arg(long, value_enum, default_value_t = Sort::Added)]
        sort: Sort,
        /// Also list each book's files
        #[arg(long)]
        files: bool,
    },
    /// Show when the library was last scanned
    Status,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sort {
    Added,
    Modified,
    Title,
    Artist,
}
impl From<Sort> for SortKey {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Added => Self::Added,
            Sort::Modified => Self::Modified,
            Sort::Title => Self::Title,
            Sort::Artist => Self::Artist,
        }
    }
}

impl Cli {
    /// Command line flags beat every config layer.
    pub fn apply(&self, config: &mut Config) {
        if let Some(root) = &self.root {
            config.library.root = Some(root.clone());
        }
        if let Some(database) = &self.database {
            config.cache.path = Some(database.clone());
        }
        if let Command::Scan {
            concurrency: Some(concurrency),
            ..
        } = self.command
        {
            config.scan.concurrency = concurrency;
        }
    }
}
