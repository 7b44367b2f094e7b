pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{toml_config::SettingsFile, CliArgs, RunnerConfig};
pub use core::{executor::RpcExecutor, runner::StatementRunner, splitter::split_script};
pub use domain::model::{ErrorPolicy, RunReport, SqlDialect, Statement, StatementStatus};
pub use utils::error::{Result, RunnerError};
