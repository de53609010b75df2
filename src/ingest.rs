use std::io::Write;

use log::info;

use crate::{
    batch::BatchReader,
    config::IngestConfig,
    error::IngestError,
    fetch::{download_file, output_filename},
    loader::{load, LoadReport},
    sink::TableSink,
};

/// Download the file, then load it into the table.
///
/// `connect` is only called once the download succeeded, so a failed fetch
/// never opens a database connection.  The sink is dropped, and the
/// connection with it, on every way out of this function.
pub fn run<S, F, W>(config: &IngestConfig, connect: F, out: &mut W) -> Result<LoadReport, IngestError>
where
    S: TableSink,
    F: FnOnce() -> Result<S, IngestError>,
    W: Write,
{
    let output = config.output_dir.join(output_filename(&config.url));

    writeln!(out, "Downloading data from {}...", config.url)?;
    match download_file(&config.url, &output) {
        Ok(n) => {
            writeln!(out, "Downloaded: {}", output.display())?;
            info!("saved {} bytes to {}", n, output.display());
        }
        Err(e) => {
            writeln!(out, "Error downloading {}: {}", config.url, e)?;
            return Err(e.into());
        }
    }

    let batches = BatchReader::open(&output, config.chunk_size)?;
    let mut sink = connect()?;
    load(
        batches,
        &mut sink,
        &config.table_name,
        &config.timestamp_columns,
        out,
    )
}
