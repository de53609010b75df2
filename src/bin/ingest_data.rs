use std::{error::Error, io};

use clap::Parser;
use csv_ingest::{config::Args, ingest, sink::DuckDbSink};
use log::error;

/// Download a csv file and load it into a postgres table, one chunk at a time.
fn main() -> Result<(), Box<dyn Error>> {
    // a .env file, if there is one, can supply the PG* connection settings
    dotenvy::dotenv().ok();
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let target = args.connection_target();
    let config = args.ingest_config();
    let stdout = io::stdout();
    let res = ingest::run(
        &config,
        || Ok(DuckDbSink::attach_postgres(&target)?),
        &mut stdout.lock(),
    );
    if let Err(e) = &res {
        error!("ingesting {} into {} failed: {}", config.url, config.table_name, e);
    }
    res?;

    Ok(())
}
