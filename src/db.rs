use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use indexmap::IndexMap;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row as _};
use tracing::warn;

use crate::reading::{Reading, Value};
use crate::schema;

pub async fn new_pool(url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .connect(url)
        .await
        .context("failed to connect to database")
}

/// Creates the readings table if it does not exist yet. Channel columns are
/// DOUBLE PRECISION, unit-label columns TEXT.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let columns: Vec<String> = schema::FIELDS
        .iter()
        .map(|&field| {
            let kind = if schema::is_numeric_field(field) {
                "DOUBLE PRECISION"
            } else {
                "TEXT"
            };
            format!("{field} {kind}")
        })
        .collect();

    let ddl = format!(
        "CREATE TABLE IF NOT EXISTS sensor_readings (\
         id BIGSERIAL PRIMARY KEY, \
         recorded_at TIMESTAMPTZ NOT NULL, \
         {})",
        columns.join(", ")
    );

    sqlx::query(&ddl)
        .execute(pool)
        .await
        .context("failed to create sensor_readings table")?;

    Ok(())
}

/// Inserts one reading. Every schema column is always supplied; missing
/// fields bind NULL, never get omitted. A text value arriving for a numeric
/// channel is a parse anomaly: it is logged, bound NULL, and the insert
/// proceeds.
pub async fn insert_reading(pool: &PgPool, reading: &Reading) -> Result<()> {
    let sql = insert_sql();
    let mut query = sqlx::query(&sql);
    query = query.bind(reading.recorded_at.fixed_offset());

    for &field in schema::FIELDS.iter() {
        let value = reading.get(field).unwrap_or(&Value::Missing);
        if schema::is_numeric_field(field) {
            let number = match value {
                Value::Number(n) => Some(*n),
                Value::Text(s) => {
                    warn!("non-numeric value for channel {field}: {s:?}, storing NULL");
                    None
                }
                Value::Missing => None,
            };
            query = query.bind(number);
        } else {
            let text = match value {
                Value::Text(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Missing => None,
            };
            query = query.bind(text);
        }
    }

    query
        .execute(pool)
        .await
        .context("failed to insert reading")?;

    Ok(())
}

/// Most-recent-N readings, newest first.
pub async fn recent_readings(pool: &PgPool, limit: i64, timezone: Tz) -> Result<Vec<Reading>> {
    let sql = format!(
        "SELECT recorded_at, {} FROM sensor_readings ORDER BY recorded_at DESC LIMIT $1",
        schema::FIELDS.join(", ")
    );

    let rows = sqlx::query(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("failed to query recent readings")?;

    let mut readings = Vec::with_capacity(rows.len());
    for row in rows {
        let recorded_at: DateTime<Utc> = row
            .try_get("recorded_at")
            .context("failed to decode recorded_at")?;

        let mut fields = IndexMap::with_capacity(schema::FIELDS.len());
        for &field in schema::FIELDS.iter() {
            let value = if schema::is_numeric_field(field) {
                let number: Option<f64> = row
                    .try_get(field)
                    .with_context(|| format!("failed to decode column {field}"))?;
                number.map_or(Value::Missing, Value::Number)
            } else {
                let text: Option<String> = row
                    .try_get(field)
                    .with_context(|| format!("failed to decode column {field}"))?;
                text.map_or(Value::Missing, Value::Text)
            };
            fields.insert(field, value);
        }

        readings.push(Reading {
            recorded_at: recorded_at.with_timezone(&timezone),
            fields,
        });
    }

    Ok(readings)
}

fn insert_sql() -> String {
    let columns = schema::FIELDS.join(", ");
    let placeholders: Vec<String> = (2..=schema::FIELDS.len() + 1)
        .map(|i| format!("${i}"))
        .collect();

    format!(
        "INSERT INTO sensor_readings (recorded_at, {columns}) VALUES ($1, {})",
        placeholders.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_sql_binds_every_schema_column() {
        let sql = insert_sql();
        assert_eq!(sql.matches('$').count(), schema::FIELDS.len() + 1);
        for field in schema::FIELDS {
            assert!(sql.contains(field), "missing column {field}");
        }
        assert!(sql.ends_with(&format!("${})", schema::FIELDS.len() + 1)));
    }
}
