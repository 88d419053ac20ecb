//! Transactional single-column accessor over one project connection.
//!
//! # Responsibility
//! - `get`/`set`/`set_current_timestamp` of one column on one row.
//! - Scoped transactions (`begin_transaction`/`commit`/`rollback`) plus the
//!   `with_transaction` helper that rolls back on any error.
//! - Row add/remove and predicate lookups returning `row id -> value`.
//!
//! # Invariants
//! - Values are checked against the declared column kind before writing.
//! - Stored values that do not decode to the declared kind surface as
//!   `TypeMismatch`; nothing is coerced.
//! - The store never retries; a single writer per connection is assumed.

use crate::db::DbError;
use crate::model::schema::{Field, Table};
use crate::model::value::{FieldKind, FieldValue};
use crate::model::RowId;
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from field store operations.
#[derive(Debug)]
pub enum StoreError {
    /// No row with this id exists in the table.
    NotFound { table: Table, row_id: RowId },
    /// Value kind does not match the declared column kind.
    TypeMismatch {
        column: &'static str,
        expected: FieldKind,
        found: &'static str,
    },
    /// A write, begin, commit or rollback failed.
    TransactionFailed { table: Table, source: DbError },
    /// Read-side SQLite failure.
    Db(DbError),
}

impl StoreError {
    /// Stable machine-readable reason key.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "row_not_found",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::TransactionFailed { .. } => "transaction_failed",
            Self::Db(_) => "db_error",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { table, row_id } => {
                write!(f, "row {row_id} not found in {}", table.name())
            }
            Self::TypeMismatch {
                column,
                expected,
                found,
            } => write!(f, "column `{column}` expects {expected}, got {found}"),
            Self::TransactionFailed { table, source } => {
                write!(f, "write on {} failed: {source}", table.name())
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TransactionFailed { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::TypeMismatch { .. } => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Column selector for predicate lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column<F> {
    /// The table's surrogate key.
    Id,
    Field(F),
}

/// Field accessor bound to one connection and one table.
///
/// The table is fixed by the field enum `F`, so a `FieldStore<TagField>` can
/// only ever address `tbl_tag` columns.
pub struct FieldStore<'conn, F: Field> {
    conn: &'conn Connection,
    _field: PhantomData<F>,
}

impl<'conn, F: Field> FieldStore<'conn, F> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            _field: PhantomData,
        }
    }

    pub fn table(&self) -> Table {
        F::TABLE
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Reads one column of one row.
    pub fn get(&self, row_id: RowId, field: F) -> StoreResult<FieldValue> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1;",
            field.column(),
            F::TABLE.name(),
            F::TABLE.id_column()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([row_id])?;
        match rows.next()? {
            Some(row) => decode(row.get_ref(0)?, field.column(), field.kind()),
            None => Err(StoreError::NotFound {
                table: F::TABLE,
                row_id,
            }),
        }
    }

    /// Writes one column of one row.
    ///
    /// Callers updating several fields must wrap the calls in one
    /// transaction and roll back on the first error.
    pub fn set(&self, row_id: RowId, field: F, value: &FieldValue) -> StoreResult<()> {
        ensure_fits(field, value)?;
        let sql = format!(
            "UPDATE {} SET {} = ?1 WHERE {} = ?2;",
            F::TABLE.name(),
            field.column(),
            F::TABLE.id_column()
        );
        let changed = self
            .conn
            .execute(&sql, rusqlite::params![value.to_sql(), row_id])
            .map_err(write_failed::<F>)?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                table: F::TABLE,
                row_id,
            });
        }

        debug!(
            "event=field_set module=store status=ok table={} row_id={} column={}",
            F::TABLE.name(),
            row_id,
            field.column()
        );
        Ok(())
    }

    /// Stamps a timestamp column with the current time (epoch ms).
    pub fn set_current_timestamp(&self, row_id: RowId, field: F) -> StoreResult<()> {
        if field.kind() != FieldKind::Timestamp {
            return Err(StoreError::TypeMismatch {
                column: field.column(),
                expected: field.kind(),
                found: "timestamp",
            });
        }
        let sql = format!(
            "UPDATE {} SET {} = (CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)) WHERE {} = ?1;",
            F::TABLE.name(),
            field.column(),
            F::TABLE.id_column()
        );
        let changed = self
            .conn
            .execute(&sql, [row_id])
            .map_err(write_failed::<F>)?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                table: F::TABLE,
                row_id,
            });
        }
        Ok(())
    }

    /// Inserts one row with the given values and returns its id.
    pub fn add(&self, values: &[(F, FieldValue)]) -> StoreResult<RowId> {
        for (field, value) in values {
            ensure_fits(*field, value)?;
        }

        let sql = if values.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES;", F::TABLE.name())
        } else {
            let columns = values
                .iter()
                .map(|(field, _)| field.column())
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = (1..=values.len())
                .map(|index| format!("?{index}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO {} ({columns}) VALUES ({placeholders});",
                F::TABLE.name()
            )
        };

        self.conn
            .execute(
                &sql,
                params_from_iter(values.iter().map(|(_, value)| value.to_sql())),
            )
            .map_err(write_failed::<F>)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Deletes one row.
    pub fn remove(&self, row_id: RowId) -> StoreResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1;",
            F::TABLE.name(),
            F::TABLE.id_column()
        );
        let changed = self
            .conn
            .execute(&sql, [row_id])
            .map_err(write_failed::<F>)?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                table: F::TABLE,
                row_id,
            });
        }
        Ok(())
    }

    pub fn exists(&self, row_id: RowId) -> StoreResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
            F::TABLE.name(),
            F::TABLE.id_column()
        );
        let exists: i64 = self.conn.query_row(&sql, [row_id], |row| row.get(0))?;
        Ok(exists == 1)
    }

    /// Lists all row ids in ascending order.
    pub fn ids(&self) -> StoreResult<Vec<RowId>> {
        let sql = format!(
            "SELECT {id} FROM {} ORDER BY {id} ASC;",
            F::TABLE.name(),
            id = F::TABLE.id_column()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    /// Returns `row id -> selected value` for rows matching every predicate.
    ///
    /// Predicates compare with `IS`, so a `Null` predicate matches null
    /// columns. Null selected values are kept; callers decide whether a null
    /// means "no row".
    pub fn values_where(
        &self,
        selected: Column<F>,
        predicates: &[(F, FieldValue)],
    ) -> StoreResult<BTreeMap<RowId, FieldValue>> {
        for (field, value) in predicates {
            ensure_fits(*field, value)?;
        }

        let (selected_column, selected_kind) = match selected {
            Column::Id => (F::TABLE.id_column(), FieldKind::Integer),
            Column::Field(field) => (field.column(), field.kind()),
        };
        let mut sql = format!(
            "SELECT {id}, {selected_column} FROM {} WHERE 1 = 1",
            F::TABLE.name(),
            id = F::TABLE.id_column()
        );
        for (index, (field, _)) in predicates.iter().enumerate() {
            sql.push_str(&format!(" AND {} IS ?{}", field.column(), index + 1));
        }
        sql.push_str(&format!(" ORDER BY {} ASC;", F::TABLE.id_column()));

        let bind_values: Vec<Value> = predicates.iter().map(|(_, value)| value.to_sql()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut out = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let row_id: RowId = row.get(0)?;
            let value = decode(row.get_ref(1)?, selected_column, selected_kind)?;
            out.insert(row_id, value);
        }
        Ok(out)
    }

    pub fn begin_transaction(&self) -> StoreResult<()> {
        self.conn
            .execute_batch("BEGIN IMMEDIATE;")
            .map_err(write_failed::<F>)
    }

    pub fn commit(&self) -> StoreResult<()> {
        self.conn
            .execute_batch("COMMIT;")
            .map_err(write_failed::<F>)
    }

    pub fn rollback(&self) -> StoreResult<()> {
        self.conn
            .execute_batch("ROLLBACK;")
            .map_err(write_failed::<F>)
    }

    /// Runs `body` inside one transaction.
    ///
    /// Commits when `body` succeeds; rolls back and returns the original
    /// error otherwise. A failed commit is rolled back as well. Transactions
    /// do not nest: calling this from inside `body` fails at `BEGIN`.
    pub fn with_transaction<T, E>(&self, body: impl FnOnce(&Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        self.begin_transaction()?;
        let outcome = body(self).and_then(|value| match self.commit() {
            Ok(()) => Ok(value),
            Err(err) => Err(E::from(err)),
        });

        if outcome.is_err() && !self.conn.is_autocommit() {
            if let Err(rollback_err) = self.rollback() {
                warn!(
                    "event=transaction_rollback module=store status=error table={} error={}",
                    F::TABLE.name(),
                    rollback_err
                );
            } else {
                debug!(
                    "event=transaction_rollback module=store status=ok table={}",
                    F::TABLE.name()
                );
            }
        }
        outcome
    }
}

fn ensure_fits<F: Field>(field: F, value: &FieldValue) -> StoreResult<()> {
    if value.fits(field.kind()) {
        return Ok(());
    }
    Err(StoreError::TypeMismatch {
        column: field.column(),
        expected: field.kind(),
        found: value.type_name(),
    })
}

fn decode(
    raw: rusqlite::types::ValueRef<'_>,
    column: &'static str,
    kind: FieldKind,
) -> StoreResult<FieldValue> {
    FieldValue::from_sql(raw, kind).map_err(|found| StoreError::TypeMismatch {
        column,
        expected: kind,
        found,
    })
}

fn write_failed<F: Field>(err: rusqlite::Error) -> StoreError {
    StoreError::TransactionFailed {
        table: F::TABLE,
        source: DbError::Sqlite(err),
    }
}
