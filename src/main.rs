mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use tracing::info;
use windowfetch::config::Config;
use windowfetch::fetch::{DateRange, HttpClient, RetryPolicy};
use windowfetch::ingest::{SearchIngest, SearchRunOptions, ShardIngest, ShardRunOptions};
use windowfetch::observability;
use windowfetch::sink::PersistenceSink;
use windowfetch::storage::StorageClient;
use windowfetch::window::TimeWindow;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    observability::init_logging(cli.verbose);

    let config = Config::load_with(cli.config)?;
    let http = HttpClient::new(&config.http, RetryPolicy::from(&config.retry))?;

    match cli.command {
        Commands::Shards(args) => {
            let window = TimeWindow::new(args.after, args.before)?;
            let sink = PersistenceSink::new(StorageClient::from_config(&config.storage)?);
            let options = ShardRunOptions::builder()
                .window(window)
                .refresh_manifest(!args.no_refresh_manifest)
                .maybe_manifest_cache(args.manifest_cache)
                .maybe_folder(args.folder)
                .progress(true)
                .build();

            let report = ShardIngest::new(&config, &http, &sink).run(options).await?;
            info!(
                run_id = %report.run_id,
                shards = report.shards,
                rows = report.artifact.rows,
                key = %report.receipt.key,
                "Shard run complete"
            );
        }
        Commands::Search(args) => {
            let range = DateRange::new(args.start_date, args.end_date)?;
            let options = SearchRunOptions::builder()
                .range(range)
                .maybe_credentials(args.credentials)
                .maybe_output_dir(args.output_dir)
                .resume(args.resume)
                .build();

            let report = SearchIngest::new(&config, &http).run(options).await?;
            info!(
                run_id = %report.run_id,
                offset = report.final_offset,
                files = report.files.len(),
                "Search run complete"
            );
        }
    }

    Ok(())
}
