//! Serialized statement execution with exponential backoff.
//!
//! Every statement runs while holding the connection mutex, so at most one
//! statement is in flight per connection: readers queue behind writers and
//! writers behind readers, in lock-acquisition order. The guard is dropped
//! on every exit path, including early returns through `?`.
//!
//! A statement is prepared and bound exactly once. Preparation and binding
//! failures mean malformed SQL or parameters and are returned immediately.
//! Execution failures are treated as transient contention: the same prepared statement is re-executed after
//! `initial_wait * 2^round`, up to [`RetryPolicy::max_rounds`] rounds.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, error, warn};

use crate::config::{open_connection, DbConfig};
use crate::error::{HelperError, Result};
use crate::field::{Record, Value};
use crate::row::{build_bound_insert, build_insert, BoundStatement};
use crate::schema::{build_create_table, build_drop_table};

/// Backoff schedule shared by every executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_wait: Duration,
    pub multiplier: u32,
    /// Last round number attempted. Rounds count from 0.
    pub max_rounds: u32,
}

impl RetryPolicy {
    pub const STANDARD: RetryPolicy = RetryPolicy {
        initial_wait: Duration::from_secs(1),
        multiplier: 2,
        max_rounds: 10,
    };

    /// Wait after a failed attempt in `round`.
    pub fn delay(&self, round: u32) -> Duration {
        self.initial_wait
            .saturating_mul(self.multiplier.saturating_pow(round))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_rounds + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Blocking delay between execution rounds.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

impl<S: Sleeper + ?Sized> Sleeper for Arc<S> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Runs `attempt` for rounds `0..=max_rounds`, sleeping `policy.delay(round)`
/// after each failure that is not the last.
pub fn retry_with_backoff<T, S, F>(policy: &RetryPolicy, sleeper: &S, mut attempt: F) -> Result<T>
where
    S: Sleeper + ?Sized,
    F: FnMut(u32) -> rusqlite::Result<T>,
{
    let mut round = 0;
    loop {
        match attempt(round) {
            Ok(value) => return Ok(value),
            Err(err) if round >= policy.max_rounds => {
                error!(attempts = round + 1, error = %err, "statement execution rounds exceeded");
                return Err(HelperError::RoundsExceeded {
                    attempts: round + 1,
                    last: err,
                });
            }
            Err(err) => {
                let delay = policy.delay(round);
                warn!(round, ?delay, error = %err, "statement execution failed, backing off");
                sleeper.sleep(delay);
                round += 1;
            }
        }
    }
}

/// Owns one connection and serializes every statement issued through it.
pub struct StatementExecutor<S: Sleeper = ThreadSleeper> {
    connection: Mutex<Connection>,
    policy: RetryPolicy,
    sleeper: S,
}

impl StatementExecutor<ThreadSleeper> {
    pub fn new(connection: Connection) -> Self {
        Self::with_sleeper(connection, ThreadSleeper)
    }

    /// Bootstraps the database file described by `config` and wraps it.
    pub fn open(config: &DbConfig) -> Result<Self> {
        Ok(Self::new(open_connection(config)?))
    }
}

impl<S: Sleeper> StatementExecutor<S> {
    pub fn with_sleeper(connection: Connection, sleeper: S) -> Self {
        Self {
            connection: Mutex::new(connection),
            policy: RetryPolicy::STANDARD,
            sleeper,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Prepares and executes `sql` under the connection lock.
    pub fn execute(&self, sql: &str) -> Result<()> {
        self.run(sql, &[])
    }

    pub fn execute_bound(&self, statement: &BoundStatement) -> Result<()> {
        self.run(&statement.statement, &statement.params)
    }

    /// Creates the table for `record`'s type unless it already exists.
    pub fn create_table<R: Record>(&self, table: &str, record: &R) -> Result<()> {
        let sql = build_create_table(table, record)?;
        self.execute(&sql)
    }

    /// Drops `table` if present, then creates it afresh from `record`'s type.
    pub fn recreate_table<R: Record>(&self, table: &str, record: &R) -> Result<()> {
        let create = build_create_table(table, record)?;
        self.execute(&build_drop_table(table)?)?;
        self.execute(&create)
    }

    /// Inserts `record` with its values bound as parameters.
    pub fn insert<R: Record>(&self, table: &str, record: &R) -> Result<()> {
        let statement = build_bound_insert(table, record)?;
        self.execute_bound(&statement)
    }

    /// Inserts `record` with its values inlined as literals.
    pub fn insert_literal<R: Record>(&self, table: &str, record: &R) -> Result<()> {
        let sql = build_insert(table, record)?;
        self.execute(&sql)
    }

    /// Runs `f` against the connection while holding the executor lock.
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let connection = self.lock()?;
        f(&connection).map_err(HelperError::Query)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|_| HelperError::LockPoisoned)
    }

    fn run(&self, sql: &str, params: &[Value]) -> Result<()> {
        let connection = self.lock()?;
        debug!(sql, params = params.len(), "executing statement");

        let mut statement = connection.prepare(sql).map_err(HelperError::Prepare)?;
        if statement.column_count() > 0 {
            return Err(HelperError::ReturnsRows);
        }

        let expected = statement.parameter_count();
        if expected != params.len() {
            return Err(HelperError::Bind(rusqlite::Error::InvalidParameterCount(
                params.len(),
                expected,
            )));
        }
        for (index, param) in params.iter().enumerate() {
            statement
                .raw_bind_parameter(index + 1, param)
                .map_err(HelperError::Bind)?;
        }

        // Bindings survive the reset after each step, so only the step is retried.
        let changed =
            retry_with_backoff(&self.policy, &self.sleeper, |_| statement.raw_execute())?;
        debug!(changed, "statement executed");
        Ok(())
    }
}
