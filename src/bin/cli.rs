// src/bin/cli.rs
use raingauge_scrape::cli;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();
    cli::run()
}
