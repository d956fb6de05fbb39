use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use windowfetch::window::Bound;

#[derive(Parser, Debug)]
#[command(name = "windowfetch", version)]
#[command(about = "Time-windowed bulk ingestion", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $WINDOWFETCH_CONFIG or config/windowfetch.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download manifest shards in (after, before] into one artifact and upload it
    Shards(ShardsArgs),
    /// Page through the search API for a publication date range
    Search(SearchArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShardsArgs {
    /// Exclusive lower bound, YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS
    #[arg(long)]
    pub after: Bound,

    /// Inclusive upper bound, YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS
    #[arg(long)]
    pub before: Bound,

    /// Manifest cache file
    #[arg(long)]
    pub manifest_cache: Option<PathBuf>,

    /// Reuse the cached manifest when present
    #[arg(long)]
    pub no_refresh_manifest: bool,

    /// Destination folder in storage
    #[arg(long)]
    pub folder: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// First publication date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: NaiveDate,

    /// Last publication date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: NaiveDate,

    /// JSON credentials file
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Directory for page files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Skip pages already written by an earlier run
    #[arg(long)]
    pub resume: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shards() {
        let cli = Cli::parse_from([
            "windowfetch",
            "-v",
            "shards",
            "--after",
            "2024-01-01",
            "--before",
            "2024-01-02T06:00:00",
            "--no-refresh-manifest",
            "--folder",
            "run-42",
        ]);

        assert!(cli.verbose);
        let Commands::Shards(args) = cli.command else {
            panic!("expected shards");
        };
        assert_eq!(args.after.to_string(), "2024-01-01");
        assert_eq!(args.before.to_string(), "2024-01-02T060000");
        assert!(args.no_refresh_manifest);
        assert_eq!(args.folder.as_deref(), Some("run-42"));
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::parse_from([
            "windowfetch",
            "search",
            "--start-date",
            "2024-01-01",
            "--end-date",
            "2024-01-31",
            "--resume",
            "--config",
            "other.toml",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("other.toml")));
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert!(args.resume);
        assert_eq!(args.start_date.to_string(), "2024-01-01");
    }

    #[test]
    fn test_rejects_bad_bound() {
        assert!(
            Cli::try_parse_from(["windowfetch", "shards", "--after", "soon", "--before", "2024-01-02"])
                .is_err()
        );
    }
}
