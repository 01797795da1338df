//! Customer repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create and lookup-by-email over the `customers` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - The repository owns exactly one connection, released by `close` or drop.
//! - Construction never creates schema; it only verifies it.
//! - Email uniqueness is enforced by the schema (unique index), and the
//!   repository refuses to start without it.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::config::RepoConfig;
use crate::context::{ContextDone, OpContext};
use crate::db::{open_db, ConnectionString, DbError};
use crate::model::customer::{Customer, CustomerValidationError};
use log::{debug, error, info, warn};
use rusqlite::{ffi, params, Connection, ErrorCode, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const CUSTOMERS_TABLE: &str = "customers";
const REQUIRED_COLUMNS: [&str; 3] = ["id", "name", "email"];

/// VM instructions between two context checks while a statement runs.
const PROGRESS_CHECK_OPS: i32 = 1_000;

const CUSTOMER_SELECT_SQL: &str = "SELECT id, name, email FROM customers";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for customer persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Input rejected before any I/O.
    Validation(CustomerValidationError),
    /// Transport, open or unexpected storage failure.
    Connection(DbError),
    /// Storage rejected a write on a uniqueness or integrity rule.
    ///
    /// `constraint` is the rule kind (`unique`, `not_null`, `check`, ...).
    ConstraintViolation {
        constraint: &'static str,
        message: String,
    },
    NotFound {
        email: String,
    },
    Cancelled,
    DeadlineExceeded,
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    MissingUniqueEmailIndex,
    /// `customers.id` is not the table's rowid alias, so storage would not
    /// assign it.
    IdNotStorageAssigned,
    InvalidData(String),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    pub fn is_context_done(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Connection(err) => write!(f, "database connection error: {err}"),
            Self::ConstraintViolation { constraint, message } => {
                write!(f, "{constraint} constraint violation: {message}")
            }
            Self::NotFound { email } => write!(f, "customer not found for email `{email}`"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::DeadlineExceeded => write!(f, "operation deadline exceeded"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` does not exist")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` does not exist")
            }
            Self::MissingUniqueEmailIndex => {
                write!(f, "table `customers` has no unique index on `email`")
            }
            Self::IdNotStorageAssigned => {
                write!(f, "column `customers.id` must be the sole `INTEGER PRIMARY KEY`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted customer data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Connection(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CustomerValidationError> for RepoError {
    fn from(value: CustomerValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Connection(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if value.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            return Self::ConstraintViolation {
                constraint: constraint_kind(&value),
                message: value.to_string(),
            };
        }
        match value {
            rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..) => Self::InvalidData(value.to_string()),
            other => Self::Connection(DbError::Sqlite(other)),
        }
    }
}

impl From<ContextDone> for RepoError {
    fn from(value: ContextDone) -> Self {
        match value {
            ContextDone::Cancelled => Self::Cancelled,
            ContextDone::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

/// Repository interface for customer persistence.
pub trait CustomerRepository {
    /// Persists a new customer and returns it with the storage-assigned id.
    ///
    /// Any `id` on input is ignored.
    fn create_customer(&self, ctx: &OpContext, customer: Customer) -> RepoResult<Customer>;

    /// Returns the customer whose email matches exactly.
    fn get_customer_by_email(&self, ctx: &OpContext, email: &str) -> RepoResult<Customer>;
}

/// SQLite-backed customer repository owning its connection.
#[derive(Debug)]
pub struct SqliteCustomerRepository {
    conn: Connection,
    config: RepoConfig,
}

impl SqliteCustomerRepository {
    /// Connects to `connection_string` and verifies the customer schema.
    pub fn open(ctx: &OpContext, connection_string: &str) -> RepoResult<Self> {
        Self::open_with_config(ctx, connection_string, RepoConfig::default())
    }

    pub fn open_with_config(
        ctx: &OpContext,
        connection_string: &str,
        config: RepoConfig,
    ) -> RepoResult<Self> {
        ctx.check()?;
        let conn_str: ConnectionString = connection_string.parse()?;
        let conn = open_db(&conn_str, ctx.bounded(config.effective_busy_timeout()))?;
        let repo = Self::try_new_with_config(conn, config)?;
        debug!("event=repo_open module=repo status=ok mode={}", conn_str.mode());
        Ok(repo)
    }

    /// Wraps an already-open connection after verifying the schema.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        Self::try_new_with_config(conn, RepoConfig::default())
    }

    pub fn try_new_with_config(conn: Connection, config: RepoConfig) -> RepoResult<Self> {
        ensure_customer_connection_ready(&conn)?;
        Ok(Self { conn, config })
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Releases the connection, surfacing any close failure.
    pub fn close(self) -> RepoResult<()> {
        match self.conn.close() {
            Ok(()) => {
                info!("event=db_close module=db status=ok");
                Ok(())
            }
            Err((_conn, err)) => {
                error!("event=db_close module=db status=error error={err}");
                Err(RepoError::Connection(DbError::Sqlite(err)))
            }
        }
    }

    /// Runs `op` with the context's deadline and cancellation wired into
    /// the connection, then restores the connection to its idle state.
    fn with_context<T>(
        &self,
        ctx: &OpContext,
        op: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> RepoResult<T> {
        let ctx = match self.config.default_op_timeout {
            Some(timeout) => ctx.child_with_timeout(timeout),
            None => ctx.clone(),
        };
        ctx.check()?;

        let busy_timeout = self.config.effective_busy_timeout();
        self.conn.busy_timeout(ctx.bounded(busy_timeout))?;
        self.conn.progress_handler(PROGRESS_CHECK_OPS, Some(ctx.watcher()));

        let result = op(&self.conn);

        self.conn.progress_handler(0, None::<fn() -> bool>);
        self.conn.busy_timeout(busy_timeout)?;

        result.map_err(|err| classify_error(err, &ctx))
    }
}

impl CustomerRepository for SqliteCustomerRepository {
    fn create_customer(&self, ctx: &OpContext, customer: Customer) -> RepoResult<Customer> {
        let started_at = Instant::now();
        customer.validate()?;

        let result = self.with_context(ctx, |conn| {
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
            let id = tx.query_row(
                "INSERT INTO customers (name, email) VALUES (?1, ?2) RETURNING id;",
                params![customer.name.as_str(), customer.email.as_str()],
                |row| row.get::<_, i64>(0),
            )?;
            // Dropping `tx` without commit rolls the row back.
            if id > 0 {
                tx.commit()?;
            }
            Ok(id)
        });

        match result {
            Ok(id) if id > 0 => {
                info!(
                    "event=customer_create module=repo status=ok duration_ms={} customer_id={}",
                    started_at.elapsed().as_millis(),
                    id
                );
                Ok(Customer { id, ..customer })
            }
            Ok(id) => Err(RepoError::InvalidData(format!(
                "storage assigned non-positive id `{id}`"
            ))),
            Err(err) => {
                log_failure("customer_create", started_at, &err);
                Err(err)
            }
        }
    }

    fn get_customer_by_email(&self, ctx: &OpContext, email: &str) -> RepoResult<Customer> {
        let started_at = Instant::now();

        let result = self.with_context(ctx, |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "{CUSTOMER_SELECT_SQL}
                 WHERE email = ?1
                 ORDER BY id ASC
                 LIMIT 1;"
            ))?;
            let mut rows = stmt.query([email])?;
            if let Some(row) = rows.next()? {
                return Ok(Some(parse_customer_row(row)));
            }
            Ok(None)
        });

        let outcome = match result {
            Ok(Some(parsed)) => parsed,
            Ok(None) => Err(RepoError::NotFound {
                email: email.to_string(),
            }),
            Err(err) => Err(err),
        };

        match &outcome {
            Ok(customer) => debug!(
                "event=customer_get_by_email module=repo status=ok duration_ms={} customer_id={}",
                started_at.elapsed().as_millis(),
                customer.id
            ),
            Err(err) => log_failure("customer_get_by_email", started_at, err),
        }
        outcome
    }
}

fn classify_error(err: rusqlite::Error, ctx: &OpContext) -> RepoError {
    let context_related = matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::OperationInterrupted | ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    );
    match ctx.done() {
        Some(reason) if context_related => reason.into(),
        _ => err.into(),
    }
}

fn constraint_kind(err: &rusqlite::Error) -> &'static str {
    let rusqlite::Error::SqliteFailure(inner, _) = err else {
        return "other";
    };
    match inner.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE => "unique",
        ffi::SQLITE_CONSTRAINT_PRIMARYKEY => "primary_key",
        ffi::SQLITE_CONSTRAINT_NOTNULL => "not_null",
        ffi::SQLITE_CONSTRAINT_CHECK => "check",
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => "foreign_key",
        ffi::SQLITE_CONSTRAINT_TRIGGER => "trigger",
        _ => "other",
    }
}

fn log_failure(event: &str, started_at: Instant, err: &RepoError) {
    let duration_ms = started_at.elapsed().as_millis();
    let code = error_code(err);
    match err {
        RepoError::NotFound { .. } => debug!(
            "event={event} module=repo status=not_found duration_ms={duration_ms}"
        ),
        RepoError::Connection(inner) => error!(
            "event={event} module=repo status=error duration_ms={duration_ms} error_code={code} error={inner}"
        ),
        _ => warn!(
            "event={event} module=repo status=error duration_ms={duration_ms} error_code={code}"
        ),
    }
}

fn error_code(err: &RepoError) -> &'static str {
    match err {
        RepoError::Validation(_) => "validation_failed",
        RepoError::Connection(_) => "db_error",
        RepoError::ConstraintViolation { .. } => "constraint_violation",
        RepoError::NotFound { .. } => "not_found",
        RepoError::Cancelled => "cancelled",
        RepoError::DeadlineExceeded => "deadline_exceeded",
        RepoError::MissingRequiredTable(_)
        | RepoError::MissingRequiredColumn { .. }
        | RepoError::MissingUniqueEmailIndex
        | RepoError::IdNotStorageAssigned => "schema_not_ready",
        RepoError::InvalidData(_) => "invalid_data",
    }
}

fn parse_customer_row(row: &Row<'_>) -> RepoResult<Customer> {
    let id: i64 = row.get("id")?;
    if id <= 0 {
        return Err(RepoError::InvalidData(format!(
            "invalid id value `{id}` in customers.id"
        )));
    }

    let customer = Customer {
        id,
        name: row.get::<_, Option<String>>("name")?.unwrap_or_default(),
        email: row.get::<_, Option<String>>("email")?.unwrap_or_default(),
    };
    customer.validate().map_err(|err| {
        RepoError::InvalidData(format!("row with customers.id `{id}`: {err}"))
    })?;
    Ok(customer)
}

fn ensure_customer_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, CUSTOMERS_TABLE)? {
        return Err(RepoError::MissingRequiredTable(CUSTOMERS_TABLE));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, CUSTOMERS_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: CUSTOMERS_TABLE,
                column,
            });
        }
    }

    if !id_is_rowid_alias(conn, CUSTOMERS_TABLE)? {
        return Err(RepoError::IdNotStorageAssigned);
    }

    if !has_unique_index_on(conn, CUSTOMERS_TABLE, "email")? {
        return Err(RepoError::MissingUniqueEmailIndex);
    }

    Ok(())
}

/// True when `id` is the only primary-key column, typed `INTEGER`, on a
/// rowid table. Only then does SQLite assign it on insert.
fn id_is_rowid_alias(conn: &Connection, table: &str) -> RepoResult<bool> {
    let without_rowid: i64 = conn.query_row(
        "SELECT COALESCE(MAX(wr), 1) FROM pragma_table_list(?1) WHERE schema = 'main';",
        [table],
        |row| row.get(0),
    )?;
    if without_rowid != 0 {
        return Ok(false);
    }

    let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1) WHERE pk > 0;")?;
    let pk_columns = stmt
        .query_map([table], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(matches!(
        pk_columns.as_slice(),
        [(name, kind)] if name == "id" && kind.eq_ignore_ascii_case("INTEGER")
    ))
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// True when a non-partial unique index covers exactly `column`.
fn has_unique_index_on(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(
        "SELECT name FROM pragma_index_list(?1) WHERE \"unique\" = 1 AND partial = 0;",
    )?;
    let index_names = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut info_stmt = conn.prepare("SELECT name FROM pragma_index_info(?1);")?;
    for index_name in index_names {
        let columns = info_stmt
            .query_map([index_name.as_str()], |row| row.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        if columns.len() == 1 && columns[0].as_deref() == Some(column) {
            return Ok(true);
        }
    }
    Ok(false)
}
