//! Result column handling for backups.
//!
//! Columns are classified by their PostgreSQL type name. Types without a
//! native mapping (numeric, json, arrays, enums, ...) are selected with a
//! `::text` cast so the server renders them, and replayed as text literals.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use tokio_postgres::types::{Date, Timestamp};
use tokio_postgres::Row as PgRow;

use crate::core::identifier::quote_pg;
use crate::core::value::{Row, SqlValue};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Text,
    Bytes,
    Uuid,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    /// `numeric`: read as text, rendered unquoted.
    Numeric,
    /// Anything else: read as text, rendered quoted.
    Other,
}

impl ColumnKind {
    pub(crate) fn from_type_name(name: &str) -> Self {
        match name {
            "bool" => ColumnKind::Bool,
            "int2" => ColumnKind::Int2,
            "int4" => ColumnKind::Int4,
            "int8" => ColumnKind::Int8,
            "float4" => ColumnKind::Float4,
            "float8" => ColumnKind::Float8,
            "text" | "varchar" | "bpchar" | "name" => ColumnKind::Text,
            "bytea" => ColumnKind::Bytes,
            "uuid" => ColumnKind::Uuid,
            "timestamp" => ColumnKind::Timestamp,
            "timestamptz" => ColumnKind::TimestampTz,
            "date" => ColumnKind::Date,
            "time" => ColumnKind::Time,
            "numeric" => ColumnKind::Numeric,
            _ => ColumnKind::Other,
        }
    }

    pub(crate) fn needs_text_cast(self) -> bool {
        matches!(self, ColumnKind::Numeric | ColumnKind::Other)
    }
}

/// Build the `SELECT` list, casting columns the session cannot decode natively.
pub(crate) fn select_list(columns: &[String], kinds: &[ColumnKind]) -> Result<String> {
    let mut parts = Vec::with_capacity(columns.len());
    for (name, kind) in columns.iter().zip(kinds) {
        let quoted = quote_pg(name)?;
        if kind.needs_text_cast() {
            parts.push(format!("{}::text", quoted));
        } else {
            parts.push(quoted);
        }
    }
    Ok(parts.join(", "))
}

/// Decode one row according to the column kinds.
pub(crate) fn convert_row(
    row: &PgRow,
    kinds: &[ColumnKind],
) -> std::result::Result<Row, tokio_postgres::Error> {
    kinds
        .iter()
        .enumerate()
        .map(|(idx, kind)| convert_value(row, idx, *kind))
        .collect()
}

fn convert_value(
    row: &PgRow,
    idx: usize,
    kind: ColumnKind,
) -> std::result::Result<SqlValue, tokio_postgres::Error> {
    let value = match kind {
        ColumnKind::Bool => row.try_get::<_, Option<bool>>(idx)?.into(),
        ColumnKind::Int2 => row.try_get::<_, Option<i16>>(idx)?.into(),
        ColumnKind::Int4 => row.try_get::<_, Option<i32>>(idx)?.into(),
        ColumnKind::Int8 => row.try_get::<_, Option<i64>>(idx)?.into(),
        ColumnKind::Float4 => row.try_get::<_, Option<f32>>(idx)?.into(),
        ColumnKind::Float8 => row.try_get::<_, Option<f64>>(idx)?.into(),
        ColumnKind::Text | ColumnKind::Other => row.try_get::<_, Option<String>>(idx)?.into(),
        ColumnKind::Bytes => row.try_get::<_, Option<Vec<u8>>>(idx)?.into(),
        ColumnKind::Uuid => row.try_get::<_, Option<uuid::Uuid>>(idx)?.into(),
        ColumnKind::Timestamp => timestamp(
            row.try_get::<_, Option<Timestamp<NaiveDateTime>>>(idx)?,
            "timestamp",
        ),
        ColumnKind::TimestampTz => timestamp(
            row.try_get::<_, Option<Timestamp<DateTime<FixedOffset>>>>(idx)?,
            "timestamptz",
        ),
        ColumnKind::Date => date(row.try_get::<_, Option<Date<NaiveDate>>>(idx)?),
        ColumnKind::Time => row.try_get::<_, Option<chrono::NaiveTime>>(idx)?.into(),
        ColumnKind::Numeric => match row.try_get::<_, Option<String>>(idx)? {
            Some(n) => SqlValue::Numeric(n.into()),
            None => SqlValue::Null,
        },
    };
    Ok(value)
}

fn timestamp<T: Into<SqlValue>>(value: Option<Timestamp<T>>, pg_type: &'static str) -> SqlValue {
    match value {
        None => SqlValue::Null,
        Some(Timestamp::Value(v)) => v.into(),
        Some(Timestamp::PosInfinity) => SqlValue::Infinity {
            negative: false,
            pg_type,
        },
        Some(Timestamp::NegInfinity) => SqlValue::Infinity {
            negative: true,
            pg_type,
        },
    }
}

fn date(value: Option<Date<NaiveDate>>) -> SqlValue {
    match value {
        None => SqlValue::Null,
        Some(Date::Value(d)) => SqlValue::Date(d),
        Some(Date::PosInfinity) => SqlValue::Infinity {
            negative: false,
            pg_type: "date",
        },
        Some(Date::NegInfinity) => SqlValue::Infinity {
            negative: true,
            pg_type: "date",
        },
    }
}
