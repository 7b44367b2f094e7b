pub mod executor;
pub mod runner;
pub mod splitter;

pub use crate::domain::model::{ErrorPolicy, RunReport, ScriptReport, SqlDialect, Statement};
pub use crate::domain::ports::{ConfigProvider, SqlExecutor};
pub use crate::utils::error::Result;
