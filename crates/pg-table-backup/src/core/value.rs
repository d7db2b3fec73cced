//! SQL value types and their rendering as PostgreSQL literals.
//!
//! Rows read during a backup are held as [`SqlValue`]s only long enough to be
//! rendered into `INSERT` text by [`SqlValue::to_pg_literal`].

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

/// Dynamically typed column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer (smallint).
    I16(i16),

    /// 32-bit signed integer (int).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 32-bit floating point (real/float4).
    F32(f32),

    /// 64-bit floating point (double precision/float8).
    F64(f64),

    /// Arbitrary precision numeric in the server's text form.
    ///
    /// Kept as text so precision beyond any native Rust type survives.
    Numeric(String),

    /// Text/string data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// UUID value.
    Uuid(Uuid),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeOffset(DateTime<FixedOffset>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),

    /// `infinity` or `-infinity` of a `date`, `timestamp` or `timestamptz`
    /// column, which chrono cannot represent.
    Infinity {
        negative: bool,
        pg_type: &'static str,
    },
}

impl SqlValue {
    /// Render this value as a PostgreSQL literal for an `INSERT` statement.
    ///
    /// Text is single-quoted with embedded quotes doubled, which is safe under
    /// `standard_conforming_strings = on` (the server default since 9.1).
    #[must_use]
    pub fn to_pg_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            SqlValue::I16(n) => n.to_string(),
            SqlValue::I32(n) => n.to_string(),
            SqlValue::I64(n) => n.to_string(),
            SqlValue::F32(f) => float_literal(f64::from(*f), f.to_string(), "float4"),
            SqlValue::F64(f) => float_literal(*f, f.to_string(), "float8"),
            SqlValue::Numeric(n) => match n.as_str() {
                "NaN" | "Infinity" | "-Infinity" => format!("'{}'::numeric", n),
                digits => digits.to_string(),
            },
            SqlValue::Text(s) => quote_literal(s),
            SqlValue::Bytes(b) => format!("'\\x{}'::bytea", hex::encode(b)),
            SqlValue::Uuid(u) => format!("'{}'::uuid", u),
            SqlValue::DateTime(dt) => {
                let (date, era) = pg_date(dt.date());
                format!("'{} {}{}'::timestamp", date, dt.format("%H:%M:%S%.6f"), era)
            }
            SqlValue::DateTimeOffset(dto) => {
                let (date, era) = pg_date(dto.date_naive());
                format!("'{} {}{}'::timestamptz", date, dto.format("%H:%M:%S%.6f%:z"), era)
            }
            SqlValue::Date(d) => {
                let (date, era) = pg_date(*d);
                format!("'{}{}'::date", date, era)
            }
            SqlValue::Time(t) => format!("'{}'::time", t.format("%H:%M:%S%.6f")),
            SqlValue::Infinity { negative, pg_type } => {
                format!("'{}infinity'::{}", if *negative { "-" } else { "" }, pg_type)
            }
        }
    }
}

/// ISO date text plus PostgreSQL's era suffix.
///
/// chrono counts 1 BC as year 0; PostgreSQL writes it as `0001 ... BC`.
fn pg_date(date: NaiveDate) -> (String, &'static str) {
    let year = date.year();
    let (shown, era) = if year >= 1 { (year, "") } else { (1 - year, " BC") };
    (format!("{:04}-{}", shown, date.format("%m-%d")), era)
}

/// Quote a string as a standard SQL literal.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn float_literal(value: f64, finite: String, pg_type: &str) -> String {
    if value.is_nan() {
        format!("'NaN'::{}", pg_type)
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            format!("'Infinity'::{}", pg_type)
        } else {
            format!("'-Infinity'::{}", pg_type)
        }
    } else {
        finite
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        SqlValue::I16(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        SqlValue::F32(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for SqlValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        SqlValue::DateTimeOffset(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveTime> for SqlValue {
    fn from(v: NaiveTime) -> Self {
        SqlValue::Time(v)
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// One row of column values, positionally paired with a column list.
pub type Row = Vec<SqlValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_null_and_bool() {
        assert_eq!(SqlValue::Null.to_pg_literal(), "NULL");
        assert_eq!(SqlValue::Bool(true).to_pg_literal(), "true");
        assert_eq!(SqlValue::Bool(false).to_pg_literal(), "false");
        assert_eq!(SqlValue::from(None::<i32>).to_pg_literal(), "NULL");
    }

    #[test]
    fn test_literal_numbers_unquoted() {
        assert_eq!(SqlValue::I16(42).to_pg_literal(), "42");
        assert_eq!(SqlValue::I32(-100).to_pg_literal(), "-100");
        assert_eq!(SqlValue::I64(9_999_999_999).to_pg_literal(), "9999999999");
        assert_eq!(SqlValue::F64(1.5).to_pg_literal(), "1.5");
        assert_eq!(
            SqlValue::Numeric("12345678901234567890.000001".to_string()).to_pg_literal(),
            "12345678901234567890.000001"
        );
    }

    #[test]
    fn test_literal_non_finite() {
        assert_eq!(SqlValue::F32(f32::NAN).to_pg_literal(), "'NaN'::float4");
        assert_eq!(SqlValue::F64(f64::INFINITY).to_pg_literal(), "'Infinity'::float8");
        assert_eq!(
            SqlValue::F64(f64::NEG_INFINITY).to_pg_literal(),
            "'-Infinity'::float8"
        );
        assert_eq!(
            SqlValue::Numeric("NaN".to_string()).to_pg_literal(),
            "'NaN'::numeric"
        );
    }

    #[test]
    fn test_literal_string_escaping() {
        assert_eq!(SqlValue::from("hello").to_pg_literal(), "'hello'");
        assert_eq!(SqlValue::from("it's").to_pg_literal(), "'it''s'");
        assert_eq!(
            SqlValue::from("'); DROP TABLE orders; --").to_pg_literal(),
            "'''); DROP TABLE orders; --'"
        );
        assert_eq!(SqlValue::from("C:\\temp").to_pg_literal(), "'C:\\temp'");
    }

    #[test]
    fn test_literal_bytes_and_uuid() {
        assert_eq!(
            SqlValue::from(vec![0xDE, 0xAD, 0xBE, 0xEF]).to_pg_literal(),
            "'\\xdeadbeef'::bytea"
        );
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(
            SqlValue::Uuid(uuid).to_pg_literal(),
            "'550e8400-e29b-41d4-a716-446655440000'::uuid"
        );
    }

    #[test]
    fn test_literal_temporal() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let time = NaiveTime::from_hms_micro_opt(13, 5, 9, 250).unwrap();
        assert_eq!(SqlValue::Date(date).to_pg_literal(), "'2024-02-29'::date");
        assert_eq!(SqlValue::Time(time).to_pg_literal(), "'13:05:09.000250'::time");
        assert_eq!(
            SqlValue::DateTime(date.and_time(time)).to_pg_literal(),
            "'2024-02-29 13:05:09.000250'::timestamp"
        );

        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let dto = date.and_time(time).and_local_timezone(offset).unwrap();
        assert_eq!(
            SqlValue::DateTimeOffset(dto).to_pg_literal(),
            "'2024-02-29 13:05:09.000250+02:00'::timestamptz"
        );
    }

    #[test]
    fn test_literal_temporal_infinity() {
        let inf = SqlValue::Infinity { negative: false, pg_type: "timestamp" };
        assert_eq!(inf.to_pg_literal(), "'infinity'::timestamp");
        let neg = SqlValue::Infinity { negative: true, pg_type: "date" };
        assert_eq!(neg.to_pg_literal(), "'-infinity'::date");
    }

    #[test]
    fn test_literal_bc_dates() {
        // chrono year -43 is 44 BC
        let date = NaiveDate::from_ymd_opt(-43, 3, 15).unwrap();
        assert_eq!(SqlValue::Date(date).to_pg_literal(), "'0044-03-15 BC'::date");

        let time = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        assert_eq!(
            SqlValue::DateTime(date.and_time(time)).to_pg_literal(),
            "'0044-03-15 12:00:00.000000 BC'::timestamp"
        );

        let one_bc = NaiveDate::from_ymd_opt(0, 1, 1).unwrap();
        assert_eq!(SqlValue::Date(one_bc).to_pg_literal(), "'0001-01-01 BC'::date");

        let offset = FixedOffset::east_opt(0).unwrap();
        let dto = date.and_time(time).and_local_timezone(offset).unwrap();
        assert_eq!(
            SqlValue::DateTimeOffset(dto).to_pg_literal(),
            "'0044-03-15 12:00:00.000000+00:00 BC'::timestamptz"
        );
    }

    #[test]
    fn test_literal_far_future_date_has_no_sign() {
        let date = NaiveDate::from_ymd_opt(12345, 6, 1).unwrap();
        assert_eq!(SqlValue::Date(date).to_pg_literal(), "'12345-06-01'::date");
    }
}
