use anyhow::Result;
use answer_scraper::date::get_origin;
use answer_scraper::logging;
use answer_scraper::quora::{AnswerScraperBuilder, DEFAULT_BASE_URL};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Download a user's answers and name each file by the date it was written.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Saved HTML of the user's answers page, scrolled to the very bottom
    input: PathBuf,
    /// Directory the answer pages are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
    /// Origin for relative dates, in milliseconds since the Unix epoch [default: now]
    #[arg(long)]
    timestamp: Option<i64>,
    /// Timezone offset in minutes west of UTC, e.g. 480 for UTC-8 [default: system timezone]
    #[arg(long, allow_negative_numbers = true)]
    timezone: Option<i32>,
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,
    /// Maximum number of answer pages fetched at once
    #[arg(short, long, default_value_t = 1)]
    concurrency: usize,
    /// Don't write index.html
    #[arg(long)]
    no_index: bool,
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose)?;

    let origin = get_origin(args.timestamp, args.timezone)?;
    let scraper = AnswerScraperBuilder::default()
        .input(args.input)
        .output_dir(args.output_dir)
        .origin(origin)
        .base_url(args.base_url.trim_end_matches('/'))
        .write_index(!args.no_index)
        .concurrency(args.concurrency)
        .build()?;

    let ret = scraper.scrape().await?;
    info!("saved {} answers", ret.entries.len());
    Ok(())
}
