use duckdb::Connection;

/// Quote a table or column name for DuckDB, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Load DuckDB's postgres extension and attach the database at `uri` under
/// the catalog name `alias`.  Installing the extension needs network access
/// the first time.
pub fn attach_postgres(conn: &Connection, uri: &str, alias: &str) -> Result<(), duckdb::Error> {
    let sql = format!(
        r#"
INSTALL postgres;
LOAD postgres;
ATTACH {} AS {} (TYPE postgres);
"#,
        quote_literal(uri),
        quote_ident(alias),
    );
    conn.execute_batch(&sql)
}
