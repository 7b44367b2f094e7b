use crate::core::splitter::split_script;
use crate::core::SqlExecutor;
use crate::domain::model::{
    ErrorPolicy, RunReport, ScriptReport, SqlDialect, Statement, StatementOutcome,
    StatementStatus,
};
use crate::utils::error::{Result, RunnerError};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Applies migration scripts one statement at a time through a [`SqlExecutor`].
///
/// Statements run strictly in order and each call is awaited before the
/// next one is issued. What happens after a failed statement is decided by
/// the [`ErrorPolicy`].
pub struct StatementRunner<E: SqlExecutor> {
    executor: E,
    policy: ErrorPolicy,
    dry_run: bool,
}

impl<E: SqlExecutor> StatementRunner<E> {
    pub fn new(executor: E, policy: ErrorPolicy) -> Self {
        Self {
            executor,
            policy,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Runs every script in order. Read or split failures are fatal; a
    /// script that aborts under [`ErrorPolicy::Abort`] stops the scripts after it.
    pub async fn run_all(&self, scripts: &[PathBuf], dialect: SqlDialect) -> Result<RunReport> {
        let mut report = RunReport::new(self.policy, self.dry_run);

        for (pos, script) in scripts.iter().enumerate() {
            let script_report = self.run_script(script, dialect).await?;
            let aborted = script_report.aborted;
            report.scripts.push(script_report);

            if aborted {
                report.not_run = scripts[pos + 1..].to_vec();
                if !report.not_run.is_empty() {
                    tracing::warn!(
                        "Skipping {} remaining script(s) after abort",
                        report.not_run.len()
                    );
                }
                break;
            }
        }

        Ok(report)
    }

    pub async fn run_script(&self, path: &Path, dialect: SqlDialect) -> Result<ScriptReport> {
        tracing::info!("📄 Reading {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| {
            RunnerError::IoError(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;

        let statements = split_script(&content, dialect)?;
        tracing::info!("{} statements", statements.len());

        Ok(self.run_statements(path, &statements).await)
    }

    pub async fn run_statements(&self, script: &Path, statements: &[Statement]) -> ScriptReport {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(statements.len());
        let mut aborted = false;

        for statement in statements {
            if aborted || self.dry_run {
                if self.dry_run {
                    tracing::info!("[dry-run] #{} (line {}): {}", statement.index, statement.line, statement.sql);
                }
                outcomes.push(StatementOutcome::skipped(statement));
                continue;
            }

            let outcome = self.execute_one(statement).await;
            if outcome.is_failure() && self.policy == ErrorPolicy::Abort {
                tracing::error!("Aborting {} after statement #{}", script.display(), statement.index);
                aborted = true;
            }
            outcomes.push(outcome);
        }

        let report = ScriptReport {
            script: script.to_path_buf(),
            started_at,
            finished_at: Utc::now(),
            aborted,
            outcomes,
        };

        tracing::info!(
            "{}: {} succeeded, {} failed, {} skipped",
            script.display(),
            report.succeeded(),
            report.failed(),
            report.skipped()
        );
        report
    }

    async fn execute_one(&self, statement: &Statement) -> StatementOutcome {
        tracing::debug!("Executing #{} (line {}): {}", statement.index, statement.line, statement.sql);

        let start = Instant::now();
        let result = self.executor.execute(&statement.sql).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let status = match result {
            Ok(()) => StatementStatus::Succeeded,
            Err(e) => {
                if e.is_recoverable() {
                    tracing::warn!(
                        "⚠️ Statement #{} (line {}) failed: {}",
                        statement.index,
                        statement.line,
                        e
                    );
                } else {
                    tracing::error!(
                        "❌ Statement #{} (line {}) failed: {}",
                        statement.index,
                        statement.line,
                        e
                    );
                }
                let http_status = match &e {
                    RunnerError::RemoteError { status, .. } => *status,
                    _ => None,
                };
                let message = match e {
                    RunnerError::RemoteError { message, .. } => message,
                    other => other.to_string(),
                };
                StatementStatus::Failed {
                    message,
                    http_status,
                }
            }
        };

        StatementOutcome {
            index: statement.index,
            line: statement.line,
            sql: statement.sql.clone(),
            status,
            duration_ms,
        }
    }
}
