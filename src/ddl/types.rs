//! Column type spelling on import and on output.

use super::Dialect;
use crate::model::split_length;

/// Canonical type and length for an imported SQL type.
pub fn map_type(sql_type: &str, dialect: Dialect) -> (String, Option<u32>) {
    let upper = sql_type.trim().to_uppercase();
    let (base, length) = split_length(&upper);

    let mapped = match dialect {
        Dialect::PostgreSQL => map_postgres_type(&base),
        Dialect::MySQL => map_mysql_type(&base, length),
        _ => map_generic_type(&base),
    };
    // TINYINT(1) is a boolean, not a width
    let length = if mapped == "BOOLEAN" { None } else { length };
    (mapped, length)
}

fn map_postgres_type(base: &str) -> String {
    match base {
        "INT" | "INT4" | "INTEGER" | "SERIAL" | "SERIAL4" => "INTEGER".to_string(),
        "INT8" | "BIGINT" | "BIGSERIAL" | "SERIAL8" => "BIGINT".to_string(),
        "INT2" | "SMALLINT" | "SMALLSERIAL" | "SERIAL2" => "SMALLINT".to_string(),
        "FLOAT4" | "REAL" => "REAL".to_string(),
        "FLOAT8" | "DOUBLE PRECISION" => "DOUBLE PRECISION".to_string(),
        "CHARACTER VARYING" => "VARCHAR".to_string(),
        "CHARACTER" => "CHAR".to_string(),
        "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" | "TIMESTAMP WITHOUT TIME ZONE" => "TIMESTAMP".to_string(),
        "TIMETZ" => "TIME".to_string(),
        "BOOL" => "BOOLEAN".to_string(),
        "JSONB" => "JSON".to_string(),
        // Arrays keep their notation
        t if t.ends_with("[]") => format!("{}[]", map_postgres_type(&t[..t.len() - 2])),
        _ => base.to_string(),
    }
}

fn map_mysql_type(base: &str, length: Option<u32>) -> String {
    match base {
        "INT" | "INTEGER" | "MEDIUMINT" => "INT".to_string(),
        "TINYINT" if length == Some(1) => "BOOLEAN".to_string(),
        "LONGTEXT" | "MEDIUMTEXT" | "TINYTEXT" => "TEXT".to_string(),
        "LONGBLOB" | "MEDIUMBLOB" | "TINYBLOB" => "BLOB".to_string(),
        "BOOL" => "BOOLEAN".to_string(),
        _ => base.to_string(),
    }
}

fn map_generic_type(base: &str) -> String {
    match base {
        "INT" => "INTEGER".to_string(),
        "CHARACTER VARYING" => "VARCHAR".to_string(),
        "CHARACTER" => "CHAR".to_string(),
        "BOOL" => "BOOLEAN".to_string(),
        _ => base.to_string(),
    }
}

/// Type as written in generated DDL.
pub fn render_type(data_type: &str, length: Option<u32>, dialect: Dialect) -> String {
    let upper = data_type.trim().to_uppercase();
    let base = match dialect {
        Dialect::PostgreSQL => match upper.as_str() {
            "DATETIME" => "TIMESTAMP",
            "DOUBLE" => "DOUBLE PRECISION",
            "BLOB" | "BINARY" | "VARBINARY" => "BYTEA",
            "TINYINT" => "SMALLINT",
            _ => upper.as_str(),
        },
        Dialect::MySQL => match upper.as_str() {
            "TIMESTAMPTZ" => "DATETIME",
            "BYTEA" => "BLOB",
            "JSONB" => "JSON",
            "UUID" => "CHAR(36)",
            "DOUBLE PRECISION" => "DOUBLE",
            _ => upper.as_str(),
        },
        Dialect::Auto | Dialect::Generic => upper.as_str(),
    };
    match length {
        Some(n) if !base.contains('(') => format!("{}({})", base, n),
        _ => base.to_string(),
    }
}
