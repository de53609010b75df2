use std::{fs, path::Path};

use log::debug;
use reqwest::{blocking::Client, header::USER_AGENT, Url};

use crate::error::FetchError;

/// Name of the local copy of the file at `url`.  Gzipped csv files keep their
/// extension so the batch reader knows to decompress them.
pub fn output_filename(url: &str) -> &'static str {
    let gzipped = match Url::parse(url) {
        Ok(parsed) => parsed.path().ends_with(".csv.gz"),
        Err(_) => url.ends_with(".csv.gz"),
    };
    if gzipped {
        "output.csv.gz"
    } else {
        "output.csv"
    }
}

/// Download `url` into `file_path`, overwriting whatever is there.  The whole
/// body is held in memory before it is written.  Return the number of bytes
/// written.
pub fn download_file(url: &str, file_path: &Path) -> Result<u64, FetchError> {
    let client = Client::new();
    let response = client
        .get(url)
        .header(USER_AGENT, concat!("csv-ingest/", env!("CARGO_PKG_VERSION")))
        .send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }
    let body = response.bytes()?;
    debug!("received {} bytes from {}", body.len(), url);

    let io_err = |source| FetchError::Io {
        path: file_path.to_path_buf(),
        source,
    };
    if let Some(dir) = file_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    fs::write(file_path, &body).map_err(io_err)?;
    Ok(body.len() as u64)
}
