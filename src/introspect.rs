//! Live schema introspection.
//!
//! Pulls column and foreign key metadata for the requested tables into a
//! [`SchemaSnapshot`]. Everything after this point works on the snapshot, so
//! a run sees one consistent view of the database.

use std::collections::{HashMap, HashSet};

use sqlx::Row;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::render::Dialect;
use crate::schema::{ColumnInfo, ForeignKeyInfo, SchemaSnapshot, TableSchema};

/// One row of column metadata.
#[derive(Debug, Clone)]
pub struct ColumnRow {
    pub name: String,
    pub db_type: String,
    pub nullable: bool,
}

/// One row of foreign key metadata: a local column of a constraint.
#[derive(Debug, Clone)]
pub struct KeyRow {
    pub column: String,
    pub constraint_name: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub on_update: String,
    pub on_delete: String,
}

const MYSQL_COLUMNS: &str = "SELECT CAST(COLUMN_NAME AS CHAR) AS column_name,
        CAST(COLUMN_TYPE AS CHAR) AS column_type,
        CAST(IS_NULLABLE AS CHAR) AS is_nullable
     FROM information_schema.COLUMNS
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
     ORDER BY ORDINAL_POSITION";

const MYSQL_KEYS: &str = "SELECT CAST(k.COLUMN_NAME AS CHAR) AS column_name,
        CAST(k.CONSTRAINT_NAME AS CHAR) AS constraint_name,
        CAST(k.REFERENCED_TABLE_NAME AS CHAR) AS referenced_table,
        CAST(k.REFERENCED_COLUMN_NAME AS CHAR) AS referenced_column,
        CAST(r.UPDATE_RULE AS CHAR) AS update_rule,
        CAST(r.DELETE_RULE AS CHAR) AS delete_rule
     FROM information_schema.KEY_COLUMN_USAGE k
     JOIN information_schema.REFERENTIAL_CONSTRAINTS r
       ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
      AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME
      AND r.TABLE_NAME = k.TABLE_NAME
     WHERE k.TABLE_SCHEMA = DATABASE()
       AND k.TABLE_NAME = ?
       AND k.REFERENCED_TABLE_NAME IS NOT NULL
     ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION";

const PG_COLUMNS: &str = "SELECT a.attname::text AS column_name,
        format_type(a.atttypid, a.atttypmod) AS column_type,
        CASE WHEN a.attnotnull THEN 'NO' ELSE 'YES' END AS is_nullable
     FROM pg_attribute a
     JOIN pg_class c ON c.oid = a.attrelid
     JOIN pg_namespace n ON n.oid = c.relnamespace
     WHERE c.relname = $1
       AND n.nspname = current_schema()
       AND a.attnum > 0
       AND NOT a.attisdropped
     ORDER BY a.attnum";

// Read from the catalog: constraint names are only unique per table, so
// information_schema joins on name alone can mix up keys of different tables.
const PG_KEYS: &str = "SELECT a.attname::text AS column_name,
        con.conname::text AS constraint_name,
        rc.relname::text AS referenced_table,
        ra.attname::text AS referenced_column,
        CASE con.confupdtype
            WHEN 'a' THEN 'NO ACTION' WHEN 'r' THEN 'RESTRICT' WHEN 'c' THEN 'CASCADE'
            WHEN 'n' THEN 'SET NULL' WHEN 'd' THEN 'SET DEFAULT'
        END AS update_rule,
        CASE con.confdeltype
            WHEN 'a' THEN 'NO ACTION' WHEN 'r' THEN 'RESTRICT' WHEN 'c' THEN 'CASCADE'
            WHEN 'n' THEN 'SET NULL' WHEN 'd' THEN 'SET DEFAULT'
        END AS delete_rule
     FROM pg_constraint con
     JOIN pg_class c ON c.oid = con.conrelid
     JOIN pg_namespace n ON n.oid = c.relnamespace
     JOIN pg_class rc ON rc.oid = con.confrelid
     CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, ref_attnum, position)
     JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
     JOIN pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.ref_attnum
     WHERE con.contype = 'f'
       AND c.relname = $1
       AND n.nspname = current_schema()
     ORDER BY con.conname, k.position";

/// Detect the backend from a database url.
pub fn backend(url_str: &str) -> Result<Dialect> {
    let url = Url::parse(url_str).map_err(|_| Error::UnsupportedDatabase(url_str.to_string()))?;
    url.scheme().parse()
}

/// Load a snapshot of `tables` from the database at `url`.
///
/// Tables that do not exist are left out of the snapshot. Any connection or
/// query failure is fatal.
pub async fn introspect(url: &str, tables: &[&str]) -> Result<SchemaSnapshot> {
    let dialect = backend(url)?;
    info!(%dialect, tables = tables.len(), "introspecting schema");
    match dialect {
        Dialect::MySql => inspect_mysql(url, tables).await,
        Dialect::Postgres => inspect_postgres(url, tables).await,
    }
}

fn unavailable_all(tables: &[&str], err: sqlx::Error) -> Error {
    Error::unavailable(&tables.join(", "), err)
}

async fn inspect_mysql(url: &str, tables: &[&str]) -> Result<SchemaSnapshot> {
    let pool = MySqlPoolOptions::new()
        .max_connections(1)
        .connect(url)
        .await
        .map_err(|e| unavailable_all(tables, e))?;

    let mut snapshot = SchemaSnapshot::new();
    for &table in tables {
        let columns = sqlx::query(MYSQL_COLUMNS)
            .bind(table)
            .fetch_all(&pool)
            .await
            .map_err(|e| Error::unavailable(table, e))?
            .iter()
            .map(|row| -> std::result::Result<ColumnRow, sqlx::Error> {
                Ok(ColumnRow {
                    name: row.try_get("column_name")?,
                    db_type: row.try_get("column_type")?,
                    nullable: row.try_get::<String, _>("is_nullable")? == "YES",
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::unavailable(table, e))?;

        let keys = sqlx::query(MYSQL_KEYS)
            .bind(table)
            .fetch_all(&pool)
            .await
            .map_err(|e| Error::unavailable(table, e))?
            .iter()
            .map(|row| -> std::result::Result<KeyRow, sqlx::Error> {
                Ok(KeyRow {
                    column: row.try_get("column_name")?,
                    constraint_name: row.try_get("constraint_name")?,
                    referenced_table: row.try_get("referenced_table")?,
                    referenced_column: row.try_get("referenced_column")?,
                    on_update: row.try_get("update_rule")?,
                    on_delete: row.try_get("delete_rule")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::unavailable(table, e))?;

        if let Some(schema) = assemble(table, columns, keys) {
            snapshot.add_table(schema);
        }
    }

    pool.close().await;
    Ok(snapshot)
}

async fn inspect_postgres(url: &str, tables: &[&str]) -> Result<SchemaSnapshot> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(url)
        .await
        .map_err(|e| unavailable_all(tables, e))?;

    let mut snapshot = SchemaSnapshot::new();
    for &table in tables {
        let columns = sqlx::query(PG_COLUMNS)
            .bind(table)
            .fetch_all(&pool)
            .await
            .map_err(|e| Error::unavailable(table, e))?
            .iter()
            .map(|row| -> std::result::Result<ColumnRow, sqlx::Error> {
                Ok(ColumnRow {
                    name: row.try_get("column_name")?,
                    db_type: row.try_get("column_type")?,
                    nullable: row.try_get::<String, _>("is_nullable")? == "YES",
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::unavailable(table, e))?;

        let keys = sqlx::query(PG_KEYS)
            .bind(table)
            .fetch_all(&pool)
            .await
            .map_err(|e| Error::unavailable(table, e))?
            .iter()
            .map(|row| -> std::result::Result<KeyRow, sqlx::Error> {
                Ok(KeyRow {
                    column: row.try_get("column_name")?,
                    constraint_name: row.try_get("constraint_name")?,
                    referenced_table: row.try_get("referenced_table")?,
                    referenced_column: row.try_get("referenced_column")?,
                    on_update: row.try_get("update_rule")?,
                    on_delete: row.try_get("delete_rule")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::unavailable(table, e))?;

        if let Some(schema) = assemble(table, columns, keys) {
            snapshot.add_table(schema);
        }
    }

    pool.close().await;
    Ok(snapshot)
}

/// Combine column and key rows into a table; `None` when the table has no columns.
///
/// A constraint listing more than one local column is marked composite. When
/// a column carries several constraints the first (by name) is kept and the
/// rest are recorded in [`ForeignKeyInfo::other_constraints`].
pub fn assemble(table: &str, columns: Vec<ColumnRow>, keys: Vec<KeyRow>) -> Option<TableSchema> {
    if columns.is_empty() {
        debug!(table, "table not found");
        return None;
    }

    let mut local_columns: HashMap<&str, HashSet<&str>> = HashMap::new();
    for key in &keys {
        local_columns
            .entry(key.constraint_name.as_str())
            .or_default()
            .insert(key.column.as_str());
    }

    let mut by_column: HashMap<&str, ForeignKeyInfo> = HashMap::new();
    for key in &keys {
        match by_column.get_mut(key.column.as_str()) {
            Some(fk) => {
                if fk.constraint_name != key.constraint_name
                    && !fk.other_constraints.contains(&key.constraint_name)
                {
                    fk.other_constraints.push(key.constraint_name.clone());
                }
            }
            None => {
                by_column.insert(
                    key.column.as_str(),
                    ForeignKeyInfo {
                        constraint_name: key.constraint_name.clone(),
                        referenced_table: key.referenced_table.clone(),
                        referenced_column: key.referenced_column.clone(),
                        on_delete: key.on_delete.clone(),
                        on_update: key.on_update.clone(),
                        composite: local_columns
                            .get(key.constraint_name.as_str())
                            .is_some_and(|cols| cols.len() > 1),
                        other_constraints: Vec::new(),
                    },
                );
            }
        }
    }

    let columns = columns
        .into_iter()
        .map(|c| {
            let foreign_key = by_column.remove(c.name.as_str());
            ColumnInfo {
                name: c.name,
                db_type: c.db_type,
                allow_null: c.nullable,
                foreign_key,
            }
        })
        .collect();

    Some(TableSchema {
        name: table.to_string(),
        columns,
    })
}
