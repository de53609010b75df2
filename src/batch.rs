use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use csv::{StringRecord, StringRecordsIntoIter};
use flate2::read::GzDecoder;
use log::debug;

use crate::error::IngestError;

/// A group of consecutive csv records, written to the table as one unit.
/// Never empty.
#[derive(Debug, Clone)]
pub struct RowBatch {
    /// 0-based position of the batch in the file
    pub index: usize,
    pub records: Vec<StringRecord>,
}

impl RowBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Forward-only reader handing out a csv file in batches of at most
/// `batch_size` records.  Batches come in file order and don't overlap.  To
/// read the file again, open a new reader.
pub struct BatchReader<R: Read> {
    headers: StringRecord,
    records: StringRecordsIntoIter<R>,
    batch_size: usize,
    next_index: usize,
    exhausted: bool,
}

impl BatchReader<Box<dyn Read>> {
    /// Open a csv file.  Files ending in `.gz` are decompressed on the fly.
    pub fn open(path: &Path, batch_size: usize) -> Result<Self, IngestError> {
        let file = File::open(path)?;
        let gzipped = path.extension().is_some_and(|ext| ext == "gz");
        debug!("opening {} (gzip: {})", path.display(), gzipped);
        let rdr: Box<dyn Read> = if gzipped {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(file)
        };
        BatchReader::from_reader(rdr, batch_size)
    }
}

impl<R: Read> BatchReader<R> {
    pub fn from_reader(rdr: R, batch_size: usize) -> Result<Self, IngestError> {
        if batch_size == 0 {
            return Err(IngestError::InvalidBatchSize);
        }
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(rdr);
        let headers = rdr.headers()?.clone();
        Ok(BatchReader {
            headers,
            records: rdr.into_records(),
            batch_size,
            next_index: 0,
            exhausted: false,
        })
    }

    /// Column names from the first line of the file.  Empty if the file is.
    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }
}

impl<R: Read> Iterator for BatchReader<R> {
    type Item = Result<RowBatch, csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let mut records = Vec::with_capacity(self.batch_size.min(8192));
        while records.len() < self.batch_size {
            match self.records.next() {
                Some(Ok(record)) => records.push(record),
                Some(Err(e)) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
                None => {
                    self.exhausted = true;
                    break;
                }
            }
        }
        if records.is_empty() {
            return None;
        }
        let batch = RowBatch {
            index: self.next_index,
            records,
        };
        self.next_index += 1;
        Some(Ok(batch))
    }
}
