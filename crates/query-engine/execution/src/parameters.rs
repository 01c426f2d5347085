//! Conversion of textual parameter values to the types of their placeholders.
//!
//! Parameters are configured as strings. A database that reports the type of each
//! placeholder when a statement is prepared expects values of that type on the wire, so
//! each string is parsed before it is bound. Values for placeholders of unknown or
//! unreported types are bound as text and left to the database to coerce.

use std::fmt::Display;
use std::str::FromStr;

use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{BigDecimal, Uuid};

use crate::error::Error;

/// A parameter value, typed for its placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Numeric(BigDecimal),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParameterType {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Uuid,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Json,
    Text,
}

impl ParameterType {
    /// Accepts the Postgres names as well as the common SQL spellings.
    fn from_type_name(type_name: &str) -> Self {
        match type_name.to_ascii_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => ParameterType::Bool,
            "INT2" | "SMALLINT" => ParameterType::Int2,
            "INT4" | "INT" | "INTEGER" => ParameterType::Int4,
            "INT8" | "BIGINT" => ParameterType::Int8,
            "FLOAT4" | "REAL" => ParameterType::Float4,
            "FLOAT8" | "DOUBLE" | "DOUBLE PRECISION" => ParameterType::Float8,
            "NUMERIC" | "DECIMAL" => ParameterType::Numeric,
            "UUID" => ParameterType::Uuid,
            "DATE" => ParameterType::Date,
            "TIME" => ParameterType::Time,
            "TIMESTAMP" | "DATETIME" => ParameterType::Timestamp,
            "TIMESTAMPTZ" => ParameterType::TimestampTz,
            "JSON" | "JSONB" => ParameterType::Json,
            _ => ParameterType::Text,
        }
    }
}

/// Convert the value of the parameter at `position`, counted from 1, for a placeholder of
/// the named type.
pub fn convert(
    position: usize,
    value: Option<&str>,
    type_name: Option<&str>,
) -> Result<Parameter, Error> {
    let Some(value) = value else {
        return Ok(Parameter::Null);
    };
    let Some(type_name) = type_name else {
        return Ok(Parameter::Text(value.to_string()));
    };

    let trimmed = value.trim();
    let converted = match ParameterType::from_type_name(type_name) {
        ParameterType::Bool => parse_bool(trimmed).map(Parameter::Bool),
        ParameterType::Int2 => parse(trimmed).map(Parameter::Int2),
        ParameterType::Int4 => parse(trimmed).map(Parameter::Int4),
        ParameterType::Int8 => parse(trimmed).map(Parameter::Int8),
        ParameterType::Float4 => parse(trimmed).map(Parameter::Float4),
        ParameterType::Float8 => parse(trimmed).map(Parameter::Float8),
        ParameterType::Numeric => parse(trimmed).map(Parameter::Numeric),
        ParameterType::Uuid => parse(trimmed).map(Parameter::Uuid),
        ParameterType::Date => parse(trimmed).map(Parameter::Date),
        ParameterType::Time => parse(trimmed).map(Parameter::Time),
        ParameterType::Timestamp => parse_timestamp(trimmed).map(Parameter::Timestamp),
        ParameterType::TimestampTz => parse_timestamptz(trimmed).map(Parameter::TimestampTz),
        ParameterType::Json => serde_json::from_str(value)
            .map(Parameter::Json)
            .map_err(|err| format!("'{value}' is not JSON: {err}")),
        ParameterType::Text => Ok(Parameter::Text(value.to_string())),
    };

    converted.map_err(|reason| Error::BindValue {
        position,
        type_name: type_name.to_string(),
        reason,
    })
}

fn parse<T>(value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|err| format!("'{value}': {err}"))
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Ok(false),
        _ => Err(format!("'{value}' is not a boolean")),
    }
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| value.parse())
        .map_err(|err| format!("'{value}': {err}"))
}

fn parse_timestamptz(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|err| format!("'{value}': {err}"))
}
