use crate::domain::model::{ErrorPolicy, SqlDialect};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Remote "execute this SQL string" procedure.
///
/// Implementations issue exactly one statement per call. Any failure,
/// transport or remote, comes back as an `Err` so the runner can apply its
/// error policy.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn endpoint(&self) -> &str;
    fn api_key(&self) -> &str;
    fn rpc_function(&self) -> &str;
    fn rpc_parameter(&self) -> &str;
    fn timeout(&self) -> Duration;
    fn policy(&self) -> ErrorPolicy;
    fn dialect(&self) -> SqlDialect;
}
