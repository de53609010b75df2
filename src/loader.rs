use std::{
    io::{Read, Write},
    time::Instant,
};

use log::{debug, info};

use crate::{
    batch::BatchReader,
    error::IngestError,
    schema::{Schema, TimestampColumns},
    sink::TableSink,
};

pub const FINISHED_MESSAGE: &str = "Finished ingesting data into the postgres database";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub batches: usize,
    pub rows: usize,
    pub schema: Schema,
}

/// Drain `batches` into `table`.
///
/// The first batch defines the table: its schema is inferred, the table is
/// replaced with an empty one of that shape, then the batch is appended.
/// Every later batch is converted with the same schema and appended.  Running
/// out of batches ends the load; any other error aborts it, leaving whatever
/// was appended so far in the table.
///
/// A source without a single data row is an error and leaves the table
/// untouched.  Progress lines go to `out`.
pub fn load<R, S, W>(
    mut batches: BatchReader<R>,
    sink: &mut S,
    table: &str,
    timestamp_columns: &TimestampColumns,
    out: &mut W,
) -> Result<LoadReport, IngestError>
where
    R: Read,
    S: TableSink,
    W: Write,
{
    let first = match batches.next() {
        Some(batch) => batch?,
        None => return Err(IngestError::EmptySource),
    };
    let schema = Schema::infer(batches.headers(), &first, timestamp_columns)?;
    let rows = schema.typed_rows(&first)?;

    sink.replace_table(table, &schema)?;
    let mut written = sink.append(table, &schema, &rows)?;
    let mut count = 1;
    debug!("batch {}: {} rows", first.index, written);

    loop {
        let t_start = Instant::now();
        let Some(batch) = batches.next() else {
            break;
        };
        let batch = batch?;
        let rows = schema.typed_rows(&batch)?;
        let n = sink.append(table, &schema, &rows)?;
        written += n;
        count += 1;
        debug!("batch {}: {} rows", batch.index, n);
        writeln!(
            out,
            "inserted another chunk, took {:.3} second",
            t_start.elapsed().as_secs_f64()
        )?;
    }

    writeln!(out, "{}", FINISHED_MESSAGE)?;
    info!("{} rows in {} batches written to {}", written, count, table);
    Ok(LoadReport {
        batches: count,
        rows: written,
        schema,
    })
}
