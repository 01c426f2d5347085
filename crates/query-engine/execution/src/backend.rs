//! What differs between the databases sqlx connects to: how typed parameters are bound
//! and how column values become JSON.

use serde_json::Value;
use sqlx::database::HasArguments;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{BigDecimal, Uuid};
use sqlx::{
    Arguments, ColumnIndex, Database, Decode, Encode, MySql, Postgres, Row as _, Sqlite, Type,
    TypeInfo as _, ValueRef as _,
};

use crate::parameters::Parameter;

pub(crate) trait Backend: Database {
    /// The arguments for one execution of a statement.
    fn arguments<'q>(parameters: &[Parameter]) -> <Self as HasArguments<'q>>::Arguments;

    /// The value of column `index` as JSON.
    fn decode_value(row: &Self::Row, index: usize) -> Result<Value, sqlx::Error>;
}

impl Backend for Postgres {
    fn arguments<'q>(parameters: &[Parameter]) -> <Self as HasArguments<'q>>::Arguments {
        let mut arguments = PgArguments::default();
        for parameter in parameters {
            match parameter {
                Parameter::Numeric(value) => arguments.add(value.clone()),
                other => add_parameter(&mut arguments, other.clone()),
            }
        }
        arguments
    }

    fn decode_value(row: &PgRow, index: usize) -> Result<Value, sqlx::Error> {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let type_info = raw.type_info().into_owned();

        Ok(match type_info.name() {
            "BOOL" => row.try_get::<bool, _>(index)?.into(),
            "INT2" => row.try_get::<i16, _>(index)?.into(),
            "INT4" => row.try_get::<i32, _>(index)?.into(),
            "INT8" => row.try_get::<i64, _>(index)?.into(),
            "FLOAT4" => float_value(f64::from(row.try_get::<f32, _>(index)?)),
            "FLOAT8" => float_value(row.try_get::<f64, _>(index)?),
            "NUMERIC" => row.try_get::<BigDecimal, _>(index)?.to_string().into(),
            "UUID" => row.try_get::<Uuid, _>(index)?.to_string().into(),
            "DATE" => row.try_get::<NaiveDate, _>(index)?.to_string().into(),
            "TIME" => row.try_get::<NaiveTime, _>(index)?.to_string().into(),
            "TIMESTAMP" => row.try_get::<NaiveDateTime, _>(index)?.to_string().into(),
            "TIMESTAMPTZ" => row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339().into(),
            "JSON" | "JSONB" => row.try_get::<Value, _>(index)?,
            "BYTEA" => row.try_get::<Vec<u8>, _>(index)?.into(),
            _ => decode_as_text(row, index)?,
        })
    }
}

impl Backend for MySql {
    fn arguments<'q>(parameters: &[Parameter]) -> <Self as HasArguments<'q>>::Arguments {
        let mut arguments = MySqlArguments::default();
        for parameter in parameters {
            match parameter {
                Parameter::Numeric(value) => arguments.add(value.clone()),
                other => add_parameter(&mut arguments, other.clone()),
            }
        }
        arguments
    }

    fn decode_value(row: &MySqlRow, index: usize) -> Result<Value, sqlx::Error> {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let type_info = raw.type_info().into_owned();
        let type_name = type_info.name();
        if type_name.ends_with(" UNSIGNED") {
            return Ok(row.try_get::<u64, _>(index)?.into());
        }

        Ok(match type_name {
            "BOOLEAN" => row.try_get::<bool, _>(index)?.into(),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                row.try_get::<i64, _>(index)?.into()
            }
            "FLOAT" => float_value(f64::from(row.try_get::<f32, _>(index)?)),
            "DOUBLE" => float_value(row.try_get::<f64, _>(index)?),
            "DECIMAL" => row.try_get::<BigDecimal, _>(index)?.to_string().into(),
            "DATE" => row.try_get::<NaiveDate, _>(index)?.to_string().into(),
            "TIME" => row.try_get::<NaiveTime, _>(index)?.to_string().into(),
            "DATETIME" => row.try_get::<NaiveDateTime, _>(index)?.to_string().into(),
            "TIMESTAMP" => row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339().into(),
            "JSON" => row.try_get::<Value, _>(index)?,
            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
                row.try_get::<Vec<u8>, _>(index)?.into()
            }
            _ => decode_as_text(row, index)?,
        })
    }
}

impl Backend for Sqlite {
    fn arguments<'q>(parameters: &[Parameter]) -> SqliteArguments<'q> {
        let mut arguments = SqliteArguments::default();
        for parameter in parameters {
            add_parameter(&mut arguments, parameter.clone());
        }
        arguments
    }

    /// Columns are decoded by the storage class of the value, since expressions have no
    /// declared type.
    fn decode_value(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let type_info = raw.type_info().into_owned();

        Ok(match type_info.name() {
            "INTEGER" => row.try_get_unchecked::<i64, _>(index)?.into(),
            "REAL" => float_value(row.try_get_unchecked::<f64, _>(index)?),
            "BLOB" => row.try_get_unchecked::<Vec<u8>, _>(index)?.into(),
            _ => decode_as_text(row, index)?,
        })
    }
}

/// Add a parameter to the arguments of any backend. Decimals are bound as text here, the
/// backends with a decimal type bind them natively before getting this far.
fn add_parameter<'q, A>(arguments: &mut A, parameter: Parameter)
where
    A: Arguments<'q>,
    Option<String>: Encode<'q, A::Database> + Type<A::Database>,
    bool: Encode<'q, A::Database> + Type<A::Database>,
    i16: Encode<'q, A::Database> + Type<A::Database>,
    i32: Encode<'q, A::Database> + Type<A::Database>,
    i64: Encode<'q, A::Database> + Type<A::Database>,
    f32: Encode<'q, A::Database> + Type<A::Database>,
    f64: Encode<'q, A::Database> + Type<A::Database>,
    String: Encode<'q, A::Database> + Type<A::Database>,
    Uuid: Encode<'q, A::Database> + Type<A::Database>,
    NaiveDate: Encode<'q, A::Database> + Type<A::Database>,
    NaiveTime: Encode<'q, A::Database> + Type<A::Database>,
    NaiveDateTime: Encode<'q, A::Database> + Type<A::Database>,
    DateTime<Utc>: Encode<'q, A::Database> + Type<A::Database>,
    Value: Encode<'q, A::Database> + Type<A::Database>,
{
    match parameter {
        Parameter::Null => arguments.add(None::<String>),
        Parameter::Bool(value) => arguments.add(value),
        Parameter::Int2(value) => arguments.add(value),
        Parameter::Int4(value) => arguments.add(value),
        Parameter::Int8(value) => arguments.add(value),
        Parameter::Float4(value) => arguments.add(value),
        Parameter::Float8(value) => arguments.add(value),
        Parameter::Numeric(value) => arguments.add(value.to_string()),
        Parameter::Uuid(value) => arguments.add(value),
        Parameter::Date(value) => arguments.add(value),
        Parameter::Time(value) => arguments.add(value),
        Parameter::Timestamp(value) => arguments.add(value),
        Parameter::TimestampTz(value) => arguments.add(value),
        Parameter::Json(value) => arguments.add(value),
        Parameter::Text(value) => arguments.add(value),
    }
}

/// Any other type, read as text if its bytes are UTF-8 and as a byte array otherwise.
fn decode_as_text<'r, R>(row: &'r R, index: usize) -> Result<Value, sqlx::Error>
where
    R: sqlx::Row,
    usize: ColumnIndex<R>,
    String: Decode<'r, R::Database>,
    Vec<u8>: Decode<'r, R::Database>,
{
    match row.try_get_unchecked::<String, _>(index) {
        Ok(text) => Ok(text.into()),
        Err(_) => Ok(row.try_get_unchecked::<Vec<u8>, _>(index)?.into()),
    }
}

/// NaN and infinities have no JSON representation.
fn float_value(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
        assert_eq!(float_value(f64::NAN), Value::Null);
        assert_eq!(float_value(f64::INFINITY), Value::Null);
    }
}
