use std::fmt;

use csv::StringRecord;
use jiff::{
    civil::{Date, DateTime, Time},
    tz::TimeZone,
    Timestamp,
};

use crate::{
    batch::RowBatch,
    error::{IngestError, ParseError, WriteError},
};

/// The two columns that get converted to timestamps before every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampColumns {
    pub pickup: String,
    pub dropoff: String,
}

impl Default for TimestampColumns {
    fn default() -> Self {
        TimestampColumns {
            pickup: "tpep_pickup_datetime".to_string(),
            dropoff: "tpep_dropoff_datetime".to_string(),
        }
    }
}

impl TimestampColumns {
    pub fn contains(&self, name: &str) -> bool {
        self.pickup == name || self.dropoff == name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Double,
    Varchar,
    Timestamp,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }

    /// Narrowest type that fits every non-empty cell.  A column with no values
    /// at all is treated as numeric, the same way a column of missing values
    /// ends up as floats in a dataframe.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a str>) -> ColumnType {
        let mut seen = false;
        let mut all_int = true;
        let mut all_float = true;
        for cell in cells.into_iter().map(str::trim).filter(|c| !c.is_empty()) {
            seen = true;
            if all_int && cell.parse::<i64>().is_err() {
                all_int = false;
            }
            if !all_int && cell.parse::<f64>().is_err() {
                all_float = false;
                break;
            }
        }
        match (all_int, all_float) {
            _ if !seen => ColumnType::Double,
            (_, false) => ColumnType::Varchar,
            (false, true) => ColumnType::Double,
            (true, _) => ColumnType::BigInt,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql_type())
    }
}

/// One cell, after conversion to its column type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    /// Convert a raw csv cell.  An empty cell is `Null` whatever the type.
    pub fn value(&self, cell: &str) -> Result<Value, IngestError> {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        let mismatch = || WriteError::TypeMismatch {
            column: self.name.clone(),
            value: cell.to_string(),
            expected: self.ty.sql_type(),
        };
        let value = match self.ty {
            ColumnType::Timestamp => Value::Timestamp(parse_timestamp(trimmed).ok_or_else(
                || ParseError::Timestamp {
                    column: self.name.clone(),
                    value: cell.to_string(),
                },
            )?),
            ColumnType::BigInt => Value::Integer(trimmed.parse().map_err(|_| mismatch())?),
            ColumnType::Double => Value::Float(trimmed.parse().map_err(|_| mismatch())?),
            ColumnType::Varchar => Value::Text(cell.to_string()),
        };
        Ok(value)
    }
}

const US_FORMATS: [&str; 3] = ["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M", "%m/%d/%Y %I:%M:%S %p"];

/// Parse a timestamp cell as a naive datetime.
///
/// Accepts ISO 8601 datetimes (`2021-01-01 00:30:10`, `2021-01-01T00:30:10.5`),
/// plain dates (taken at midnight), instants with an offset (converted to UTC)
/// and the month-first formats found in older taxi files.
pub fn parse_timestamp(s: &str) -> Option<DateTime> {
    // instants first: the civil parser would accept `+05:00` and drop it
    if let Ok(ts) = s.parse::<Timestamp>() {
        return Some(ts.to_zoned(TimeZone::UTC).datetime());
    }
    if let Ok(dt) = s.parse::<DateTime>() {
        return Some(dt);
    }
    if let Ok(date) = s.parse::<Date>() {
        return Some(date.to_datetime(Time::midnight()));
    }
    US_FORMATS
        .iter()
        .find_map(|fmt| DateTime::strptime(fmt, s).ok())
}

/// Explicit table schema, inferred once from the first batch of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Schema {
        Schema { columns }
    }

    pub fn infer(
        headers: &StringRecord,
        batch: &RowBatch,
        timestamp_columns: &TimestampColumns,
    ) -> Result<Schema, ParseError> {
        for name in [&timestamp_columns.pickup, &timestamp_columns.dropoff] {
            if !headers.iter().any(|h| h == name.as_str()) {
                return Err(ParseError::MissingColumn(name.clone()));
            }
        }
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let ty = if timestamp_columns.contains(name) {
                    ColumnType::Timestamp
                } else {
                    ColumnType::infer(batch.records.iter().map(|r| r.get(i).unwrap_or("")))
                };
                Column {
                    name: name.to_string(),
                    ty,
                }
            })
            .collect();
        Ok(Schema { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Convert every record of the batch to typed values.
    pub fn typed_rows(&self, batch: &RowBatch) -> Result<Vec<Vec<Value>>, IngestError> {
        batch
            .records
            .iter()
            .map(|record| -> Result<Vec<Value>, IngestError> {
                if record.len() != self.columns.len() {
                    return Err(WriteError::SchemaMismatch(format!(
                        "record has {} fields, table has {} columns",
                        record.len(),
                        self.columns.len()
                    ))
                    .into());
                }
                self.columns
                    .iter()
                    .zip(record.iter())
                    .map(|(column, cell)| column.value(cell))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;
    use std::error::Error;

    fn batch(rows: &[&[&str]]) -> RowBatch {
        RowBatch {
            index: 0,
            records: rows.iter().map(|r| StringRecord::from(r.to_vec())).collect(),
        }
    }

    #[test]
    fn infer_column_types() {
        assert_eq!(ColumnType::infer(["1", "2", ""]), ColumnType::BigInt);
        assert_eq!(ColumnType::infer(["1", "2.5"]), ColumnType::Double);
        assert_eq!(ColumnType::infer(["2.5", "1"]), ColumnType::Double);
        assert_eq!(ColumnType::infer(["1", "N"]), ColumnType::Varchar);
        assert_eq!(ColumnType::infer(["", ""]), ColumnType::Double);
    }

    #[test]
    fn parse_timestamps() {
        let expected = date(2021, 1, 1).at(0, 30, 10, 0);
        assert_eq!(parse_timestamp("2021-01-01 00:30:10"), Some(expected));
        assert_eq!(parse_timestamp("2021-01-01T00:30:10"), Some(expected));
        assert_eq!(parse_timestamp("01/01/2021 12:30:10 AM"), Some(expected));
        assert_eq!(parse_timestamp("01/01/2021 00:30:10"), Some(expected));
        assert_eq!(parse_timestamp("2021-01-01T00:30:10Z"), Some(expected));
        assert_eq!(
            parse_timestamp("2021-01-01T00:30:10+05:00"),
            Some(date(2020, 12, 31).at(19, 30, 10, 0))
        );
        assert_eq!(
            parse_timestamp("2021-01-01 00:30:10-05:00"),
            Some(date(2021, 1, 1).at(5, 30, 10, 0))
        );
        assert_eq!(
            parse_timestamp("2021-01-01"),
            Some(date(2021, 1, 1).at(0, 0, 0, 0))
        );
        assert_eq!(
            parse_timestamp("2021-01-01 00:30:10.250"),
            Some(date(2021, 1, 1).at(0, 30, 10, 250_000_000))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2021-13-01 00:00:00"), None);
    }

    #[test]
    fn infer_schema() -> Result<(), Box<dyn Error>> {
        let headers = StringRecord::from(vec![
            "VendorID",
            "tpep_pickup_datetime",
            "tpep_dropoff_datetime",
            "trip_distance",
            "store_and_fwd_flag",
        ]);
        let b = batch(&[
            &["1", "2021-01-01 00:30:10", "2021-01-01 00:36:12", "2.10", "N"],
            &["2", "2021-01-01 00:51:20", "2021-01-01 00:52:19", "0", ""],
        ]);
        let schema = Schema::infer(&headers, &b, &TimestampColumns::default())?;
        let types: Vec<ColumnType> = schema.columns().iter().map(|c| c.ty).collect();
        assert_eq!(
            types,
            vec![
                ColumnType::BigInt,
                ColumnType::Timestamp,
                ColumnType::Timestamp,
                ColumnType::Double,
                ColumnType::Varchar
            ]
        );

        let rows = schema.typed_rows(&b)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], Value::Integer(1));
        assert_eq!(
            rows[0][1],
            Value::Timestamp(date(2021, 1, 1).at(0, 30, 10, 0))
        );
        assert_eq!(rows[1][3], Value::Float(0.0));
        assert_eq!(rows[1][4], Value::Null);
        Ok(())
    }

    #[test]
    fn missing_timestamp_column() {
        let headers = StringRecord::from(vec!["VendorID", "tpep_pickup_datetime"]);
        let b = batch(&[&["1", "2021-01-01 00:30:10"]]);
        let res = Schema::infer(&headers, &b, &TimestampColumns::default());
        assert!(matches!(res, Err(ParseError::MissingColumn(name)) if name == "tpep_dropoff_datetime"));
    }

    #[test]
    fn bad_timestamp_is_a_parse_error() {
        let schema = Schema::new(vec![Column {
            name: "tpep_pickup_datetime".to_string(),
            ty: ColumnType::Timestamp,
        }]);
        let res = schema.typed_rows(&batch(&[&["not a date"]]));
        assert!(matches!(
            res,
            Err(IngestError::Parse(ParseError::Timestamp { .. }))
        ));
    }

    #[test]
    fn coerce_later_batches() -> Result<(), Box<dyn Error>> {
        let schema = Schema::new(vec![
            Column {
                name: "fare_amount".to_string(),
                ty: ColumnType::Double,
            },
            Column {
                name: "passenger_count".to_string(),
                ty: ColumnType::BigInt,
            },
        ]);
        let rows = schema.typed_rows(&batch(&[&["7", "1"]]))?;
        assert_eq!(rows[0], vec![Value::Float(7.0), Value::Integer(1)]);

        let res = schema.typed_rows(&batch(&[&["7", "1.5"]]));
        assert!(matches!(
            res,
            Err(IngestError::Write(WriteError::TypeMismatch { .. }))
        ));
        Ok(())
    }

    #[test]
    fn record_arity_must_match() {
        let schema = Schema::new(vec![Column {
            name: "a".to_string(),
            ty: ColumnType::Varchar,
        }]);
        assert!(matches!(
            schema.typed_rows(&batch(&[&["x", "y"]])),
            Err(IngestError::Write(WriteError::SchemaMismatch(_)))
        ));
    }
}
