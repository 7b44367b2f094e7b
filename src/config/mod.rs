pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::model::{ErrorPolicy, SqlDialect};
use crate::utils::error::Result;
use crate::utils::logger::LogFormat;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use toml_config::SettingsFile;

pub const DEFAULT_RPC_FUNCTION: &str = "exec_sql";
pub const DEFAULT_RPC_PARAMETER: &str = "sql";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Clone, Parser)]
#[command(name = "sql-runner")]
#[command(about = "Apply SQL migration scripts statement by statement through a remote exec-SQL RPC")]
pub struct CliArgs {
    /// SQL scripts to apply, in order
    #[arg(required = true)]
    pub scripts: Vec<PathBuf>,

    /// Base URL of the database service
    #[arg(long, env = "SUPABASE_URL")]
    pub url: Option<String>,

    /// Access key sent as `apikey` and bearer token
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Path to TOML settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Name of the remote exec-SQL function
    #[arg(long)]
    pub rpc_function: Option<String>,

    /// Name of the function's SQL text parameter
    #[arg(long)]
    pub rpc_param: Option<String>,

    /// Per-statement request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// What to do after a failed statement
    #[arg(long, value_enum)]
    pub policy: Option<ErrorPolicy>,

    /// Tokenizer dialect used to split scripts
    #[arg(long, value_enum)]
    pub dialect: Option<SqlDialect>,

    /// List the statements without executing them
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON report of every statement to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Fully resolved runner configuration, built once at startup.
#[derive(Clone)]
pub struct RunnerConfig {
    pub endpoint: String,
    pub api_key: String,
    pub rpc_function: String,
    pub rpc_parameter: String,
    pub timeout: Duration,
    pub policy: ErrorPolicy,
    pub dialect: SqlDialect,
    pub scripts: Vec<PathBuf>,
    pub dry_run: bool,
    pub report_path: Option<PathBuf>,
}

impl RunnerConfig {
    /// Merges command line (and env) values over the settings file, then
    /// defaults. Endpoint and key are mandatory.
    pub fn resolve(args: &CliArgs, file: Option<&SettingsFile>) -> Result<Self> {
        let default_file = SettingsFile::default();
        let file = file.unwrap_or(&default_file);
        let remote = &file.remote;

        let endpoint = args.url.clone().or_else(|| remote.endpoint.clone());
        let api_key = args.key.clone().or_else(|| remote.api_key.clone());

        let endpoint = validation::validate_required_field("endpoint", &endpoint)?.to_string();
        let api_key = validation::validate_required_field("api_key", &api_key)?.to_string();

        let config = Self {
            endpoint,
            api_key,
            rpc_function: args
                .rpc_function
                .clone()
                .or_else(|| remote.function.clone())
                .unwrap_or_else(|| DEFAULT_RPC_FUNCTION.to_string()),
            rpc_parameter: args
                .rpc_param
                .clone()
                .or_else(|| remote.parameter.clone())
                .unwrap_or_else(|| DEFAULT_RPC_PARAMETER.to_string()),
            timeout: Duration::from_secs(
                args.timeout_secs
                    .or(remote.timeout_seconds)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            policy: args
                .policy
                .or(file.execution.policy)
                .unwrap_or_default(),
            dialect: args
                .dialect
                .or(file.execution.dialect)
                .unwrap_or_default(),
            scripts: args.scripts.clone(),
            dry_run: args.dry_run,
            report_path: args.report.clone(),
        };

        config.validate()?;
        Ok(config)
    }
}

impl Validate for RunnerConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("endpoint", &self.endpoint)?;
        validation::validate_identifier("rpc_function", &self.rpc_function)?;
        validation::validate_identifier("rpc_parameter", &self.rpc_parameter)?;
        validation::validate_range("timeout_seconds", self.timeout.as_secs(), 1, MAX_TIMEOUT_SECS)?;
        Ok(())
    }
}

// key 不可出現在日誌中
impl fmt::Debug for RunnerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("rpc_function", &self.rpc_function)
            .field("rpc_parameter", &self.rpc_parameter)
            .field("timeout", &self.timeout)
            .field("policy", &self.policy)
            .field("dialect", &self.dialect)
            .field("scripts", &self.scripts)
            .field("dry_run", &self.dry_run)
            .field("report_path", &self.report_path)
            .finish()
    }
}

impl ConfigProvider for RunnerConfig {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn rpc_function(&self) -> &str {
        &self.rpc_function
    }

    fn rpc_parameter(&self) -> &str {
        &self.rpc_parameter
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    fn dialect(&self) -> SqlDialect {
        self.dialect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::{ExecutionSettings, RemoteSettings};
    use crate::utils::error::RunnerError;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["sql-runner"];
        argv.extend_from_slice(extra);
        argv.push("001_init.sql");
        CliArgs::try_parse_from(argv).unwrap()
    }

    // 不依賴外部環境變數
    fn bare_args(extra: &[&str]) -> CliArgs {
        let mut parsed = args(extra);
        if !extra.contains(&"--url") {
            parsed.url = None;
        }
        if !extra.contains(&"--key") {
            parsed.key = None;
        }
        parsed
    }

    #[test]
    fn test_resolve_defaults() {
        let config = RunnerConfig::resolve(
            &bare_args(&["--url", "https://abc.supabase.co", "--key", "k"]),
            None,
        )
        .unwrap();

        assert_eq!(config.rpc_function, DEFAULT_RPC_FUNCTION);
        assert_eq!(config.rpc_parameter, DEFAULT_RPC_PARAMETER);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.policy, ErrorPolicy::Continue);
        assert_eq!(config.dialect, SqlDialect::Postgres);
        assert_eq!(config.scripts, vec![PathBuf::from("001_init.sql")]);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_missing_endpoint_and_key() {
        let err = RunnerConfig::resolve(&bare_args(&["--key", "k"]), None).unwrap_err();
        assert!(matches!(err, RunnerError::MissingConfigError { ref field } if field == "endpoint"));

        let err =
            RunnerConfig::resolve(&bare_args(&["--url", "https://abc.supabase.co"]), None).unwrap_err();
        assert!(matches!(err, RunnerError::MissingConfigError { ref field } if field == "api_key"));

        let err = RunnerConfig::resolve(
            &bare_args(&["--url", "https://abc.supabase.co", "--key", "  "]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, RunnerError::MissingConfigError { .. }));
    }

    #[test]
    fn test_unresolved_placeholders_are_missing() {
        let file = SettingsFile::from_toml_str(
            r#"
[remote]
endpoint = "https://abc.supabase.co"
api_key = "${SQL_RUNNER_TEST_NEVER_SET_KEY}"
"#,
        )
        .unwrap();

        let err = RunnerConfig::resolve(&bare_args(&[]), Some(&file)).unwrap_err();
        assert!(matches!(err, RunnerError::MissingConfigError { ref field } if field == "api_key"));
        assert_eq!(err.exit_code(), 1);

        let file = SettingsFile::from_toml_str(
            r#"
[remote]
endpoint = "${SQL_RUNNER_TEST_NEVER_SET_URL}"
api_key = "k"
"#,
        )
        .unwrap();

        let err = RunnerConfig::resolve(&bare_args(&[]), Some(&file)).unwrap_err();
        assert!(matches!(err, RunnerError::MissingConfigError { ref field } if field == "endpoint"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = SettingsFile {
            remote: RemoteSettings {
                endpoint: Some("https://file.example.com".to_string()),
                api_key: Some("file-key".to_string()),
                function: Some("file_fn".to_string()),
                parameter: None,
                timeout_seconds: Some(5),
            },
            execution: ExecutionSettings {
                policy: Some(ErrorPolicy::Abort),
                dialect: Some(SqlDialect::MySql),
            },
        };

        let config = RunnerConfig::resolve(
            &bare_args(&["--url", "https://cli.example.com", "--policy", "continue"]),
            Some(&file),
        )
        .unwrap();

        assert_eq!(config.endpoint, "https://cli.example.com");
        assert_eq!(config.api_key, "file-key");
        assert_eq!(config.rpc_function, "file_fn");
        assert_eq!(config.rpc_parameter, DEFAULT_RPC_PARAMETER);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.policy, ErrorPolicy::Continue);
        assert_eq!(config.dialect, SqlDialect::MySql);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = ["--url", "https://abc.supabase.co", "--key", "k"];

        let mut bad_fn = base.to_vec();
        bad_fn.extend_from_slice(&["--rpc-function", "exec;sql"]);
        assert!(RunnerConfig::resolve(&bare_args(&bad_fn), None).is_err());

        let mut bad_timeout = base.to_vec();
        bad_timeout.extend_from_slice(&["--timeout-secs", "0"]);
        assert!(RunnerConfig::resolve(&bare_args(&bad_timeout), None).is_err());

        let bad_url = ["--url", "ftp://abc", "--key", "k"];
        assert!(matches!(
            RunnerConfig::resolve(&bare_args(&bad_url), None),
            Err(RunnerError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = RunnerConfig::resolve(
            &bare_args(&["--url", "https://abc.supabase.co", "--key", "super-secret"]),
            None,
        )
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_scripts_are_required() {
        assert!(CliArgs::try_parse_from(["sql-runner"]).is_err());
    }

    #[test]
    fn test_dialect_and_policy_values() {
        let parsed = args(&["--dialect", "mysql", "--policy", "abort", "--dry-run"]);
        assert_eq!(parsed.dialect, Some(SqlDialect::MySql));
        assert_eq!(parsed.policy, Some(ErrorPolicy::Abort));
        assert!(parsed.dry_run);
    }
}
