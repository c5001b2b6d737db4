use crate::{Error, Result};

/// SQL for an idempotent single-row upsert.
///
/// The row travels as one JSONB parameter and `jsonb_populate_record` turns
/// it into the table's row type, so Postgres coerces text dates, decimals
/// and so on using the column types it already knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertStatement {
    pub sql: String,
}

impl UpsertStatement {
    pub fn build<'a>(
        table: &str,
        key_column: &str,
        columns: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self> {
        let table = quote_table(table)?;
        let key = quote_ident(key_column)?;

        let columns: Vec<&str> = columns.into_iter().collect();
        if !columns.contains(&key_column) {
            return Err(Error::Configuration(format!(
                "record has no value for key column '{}'",
                key_column
            )));
        }

        let quoted = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Result<Vec<_>>>()?;
        let column_list = quoted.join(", ");

        let updates: Vec<String> = columns
            .iter()
            .zip(&quoted)
            .filter(|(name, _)| **name != key_column)
            .map(|(_, q)| format!("{q} = EXCLUDED.{q}"))
            .collect();

        let conflict_action = if updates.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", updates.join(", "))
        };

        let sql = format!(
            "INSERT INTO {table} ({column_list}) \
             SELECT {column_list} FROM jsonb_populate_record(NULL::{table}, $1::jsonb) \
             ON CONFLICT ({key}) {conflict_action}"
        );

        Ok(Self { sql })
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> Result<String> {
    if name.is_empty() || name.contains('\0') {
        return Err(Error::Configuration(format!(
            "invalid identifier: {:?}",
            name
        )));
    }

    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quote a possibly schema-qualified table name (`schema.table`).
pub fn quote_table(name: &str) -> Result<String> {
    let parts = name
        .split('.')
        .map(quote_ident)
        .collect::<Result<Vec<_>>>()?;

    if parts.len() > 2 {
        return Err(Error::Configuration(format!(
            "table name has too many parts: {}",
            name
        )));
    }

    Ok(parts.join("."))
}
