use duckdb::{
    params_from_iter,
    types::{TimeUnit, ToSqlOutput, Value as DuckValue},
    Connection, ToSql,
};
use itertools::Itertools;
use jiff::tz::TimeZone;
use log::{debug, info};

use crate::{
    config::ConnectionTarget,
    error::WriteError,
    schema::{Schema, Value},
    utils::lib_duckdb::{attach_postgres, quote_ident},
};

/// Catalog name the target postgres database is attached under.
pub const POSTGRES_ALIAS: &str = "pg";

/// Where batches get written.
pub trait TableSink {
    /// Drop `table` if it exists and create it empty with `schema`.
    fn replace_table(&mut self, table: &str, schema: &Schema) -> Result<(), WriteError>;

    /// Append rows to `table`, all or nothing.  Return the number of rows
    /// written.
    fn append(
        &mut self,
        table: &str,
        schema: &Schema,
        rows: &[Vec<Value>],
    ) -> Result<usize, WriteError>;
}

impl<S: TableSink + ?Sized> TableSink for &mut S {
    fn replace_table(&mut self, table: &str, schema: &Schema) -> Result<(), WriteError> {
        (**self).replace_table(table, schema)
    }

    fn append(
        &mut self,
        table: &str,
        schema: &Schema,
        rows: &[Vec<Value>],
    ) -> Result<usize, WriteError> {
        (**self).append(table, schema, rows)
    }
}

/// A single DuckDB connection, used for every write of a run.  Either a local
/// in-memory database or a postgres database attached through DuckDB's
/// postgres extension.  The connection is closed when the sink is dropped.
pub struct DuckDbSink {
    conn: Connection,
    catalog: Option<String>,
}

impl DuckDbSink {
    pub fn open_in_memory() -> Result<DuckDbSink, WriteError> {
        Ok(DuckDbSink {
            conn: Connection::open_in_memory()?,
            catalog: None,
        })
    }

    pub fn attach_postgres(target: &ConnectionTarget) -> Result<DuckDbSink, WriteError> {
        let conn = Connection::open_in_memory()?;
        attach_postgres(&conn, &target.uri(), POSTGRES_ALIAS)?;
        info!(
            "attached postgres database {} at {}:{}",
            target.db, target.host, target.port
        );
        Ok(DuckDbSink {
            conn,
            catalog: Some(POSTGRES_ALIAS.to_string()),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Table name as it needs to appear in SQL, quoted and qualified with the
    /// attached catalog if there is one.
    pub fn qualified_name(&self, table: &str) -> String {
        match &self.catalog {
            Some(catalog) => format!("{}.{}", quote_ident(catalog), quote_ident(table)),
            None => quote_ident(table),
        }
    }

    pub fn close(self) -> Result<(), WriteError> {
        self.conn.close().map_err(|(_, e)| WriteError::Database(e))
    }
}

impl TableSink for DuckDbSink {
    fn replace_table(&mut self, table: &str, schema: &Schema) -> Result<(), WriteError> {
        let name = self.qualified_name(table);
        let columns = schema
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.ty.sql_type()))
            .join(",\n    ");
        let sql = format!(
            r#"
DROP TABLE IF EXISTS {name};
CREATE TABLE {name} (
    {columns}
);
"#
        );
        debug!("{}", sql);

        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)?;
        tx.commit()?;
        info!("created table {} with {} columns", name, schema.len());
        Ok(())
    }

    fn append(
        &mut self,
        table: &str,
        schema: &Schema,
        rows: &[Vec<Value>],
    ) -> Result<usize, WriteError> {
        if let Some(row) = rows.iter().find(|row| row.len() != schema.len()) {
            return Err(WriteError::SchemaMismatch(format!(
                "row has {} values, table has {} columns",
                row.len(),
                schema.len()
            )));
        }
        if rows.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.qualified_name(table),
            schema.columns().iter().map(|c| quote_ident(&c.name)).join(", "),
            (1..=schema.len()).map(|i| format!("${}", i)).join(", "),
        );

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        debug!("appended {} rows to {}", rows.len(), table);
        Ok(rows.len())
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        let out = match self {
            Value::Null => ToSqlOutput::Owned(DuckValue::Null),
            Value::Integer(x) => ToSqlOutput::Owned(DuckValue::BigInt(*x)),
            Value::Float(x) => ToSqlOutput::Owned(DuckValue::Double(*x)),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Timestamp(dt) => {
                let micros = dt
                    .to_zoned(TimeZone::UTC)
                    .map_err(|e| duckdb::Error::ToSqlConversionFailure(Box::new(e)))?
                    .timestamp()
                    .as_microsecond();
                ToSqlOutput::Owned(DuckValue::Timestamp(TimeUnit::Microsecond, micros))
            }
        };
        Ok(out)
    }
}
