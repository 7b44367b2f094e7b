use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One executable fragment of a migration script, always ending in a single `;`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// 1-based position within its script.
    pub index: usize,
    pub sql: String,
    /// 1-based source line where the statement text starts.
    pub line: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log a failed statement and keep going.
    #[default]
    Continue,
    /// Stop at the first failed statement; later statements are skipped.
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    Postgres,
    Generic,
    #[value(name = "mysql")]
    MySql,
    Sqlite,
    #[value(name = "mssql")]
    MsSql,
}

impl SqlDialect {
    /// Name understood by `sqlparser::dialect::dialect_from_str`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "postgresql",
            SqlDialect::Generic => "generic",
            SqlDialect::MySql => "mysql",
            SqlDialect::Sqlite => "sqlite",
            SqlDialect::MsSql => "mssql",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatementStatus {
    Succeeded,
    Failed {
        message: String,
        http_status: Option<u16>,
    },
    /// Not issued: dry run, or an earlier failure under `ErrorPolicy::Abort`.
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementOutcome {
    pub index: usize,
    pub line: u64,
    pub sql: String,
    #[serde(flatten)]
    pub status: StatementStatus,
    pub duration_ms: u64,
}

impl StatementOutcome {
    pub fn skipped(statement: &Statement) -> Self {
        Self {
            index: statement.index,
            line: statement.line,
            sql: statement.sql.clone(),
            status: StatementStatus::Skipped,
            duration_ms: 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, StatementStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptReport {
    pub script: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub aborted: bool,
    pub outcomes: Vec<StatementOutcome>,
}

impl ScriptReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, StatementStatus::Succeeded))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, StatementStatus::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, StatementStatus::Skipped))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &StatementOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    fn count(&self, pred: impl Fn(&StatementStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub policy: ErrorPolicy,
    pub dry_run: bool,
    pub scripts: Vec<ScriptReport>,
    /// Scripts never opened because an earlier script aborted.
    pub not_run: Vec<PathBuf>,
}

impl RunReport {
    pub fn new(policy: ErrorPolicy, dry_run: bool) -> Self {
        Self {
            policy,
            dry_run,
            scripts: Vec::new(),
            not_run: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.scripts.iter().map(ScriptReport::total).sum()
    }

    pub fn succeeded(&self) -> usize {
        self.scripts.iter().map(ScriptReport::succeeded).sum()
    }

    pub fn failed(&self) -> usize {
        self.scripts.iter().map(ScriptReport::failed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.scripts.iter().map(ScriptReport::skipped).sum()
    }

    pub fn is_success(&self) -> bool {
        self.scripts.iter().all(ScriptReport::is_success) && self.not_run.is_empty()
    }

    /// `0` when every statement succeeded, `2` for a partial run.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            2
        }
    }
}
