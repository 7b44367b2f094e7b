use clap::Parser;
use sql_runner::core::ConfigProvider;
use sql_runner::utils::logger;
use sql_runner::{
    CliArgs, Result, RpcExecutor, RunReport, RunnerConfig, SettingsFile, StatementRunner,
    StatementStatus,
};
use std::path::Path;

#[tokio::main]
async fn main() {
    // .env 可提供 SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose, args.log_format);

    tracing::info!("🚀 Starting sql-runner");

    match run(&args).await {
        Ok(report) => {
            print_summary(&report);
            std::process::exit(report.exit_code());
        }
        Err(e) => {
            tracing::error!(
                "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(args: &CliArgs) -> Result<RunReport> {
    let settings = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading settings from: {}", path.display());
            Some(SettingsFile::from_file(path)?)
        }
        None => None,
    };

    // 設定不完整時在任何遠端呼叫之前就結束
    let config = RunnerConfig::resolve(args, settings.as_ref())?;
    tracing::debug!("Runner config: {:?}", config);

    let executor = RpcExecutor::new(&config)?;
    let runner = StatementRunner::new(executor, config.policy()).with_dry_run(config.dry_run);

    if config.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no statement will be executed");
    }

    let report = runner.run_all(&config.scripts, config.dialect()).await?;

    if let Some(path) = &config.report_path {
        write_report(path, &report)?;
        tracing::info!("📝 Report written to: {}", path.display());
    }

    Ok(report)
}

fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn print_summary(report: &RunReport) {
    for script in &report.scripts {
        for outcome in script.failures() {
            if let StatementStatus::Failed { message, .. } = &outcome.status {
                println!(
                    "  ⚠️ {} #{} (line {}): {}",
                    script.script.display(),
                    outcome.index,
                    outcome.line,
                    message
                );
            }
        }
    }
    for path in &report.not_run {
        println!("  ⏭️ not run: {}", path.display());
    }

    let summary = format!(
        "{} statements: {} succeeded, {} failed, {} skipped",
        report.total(),
        report.succeeded(),
        report.failed(),
        report.skipped()
    );

    if report.is_success() {
        tracing::info!("✅ {}", summary);
        println!("✅ {}", summary);
    } else {
        tracing::warn!("❌ {}", summary);
        println!("❌ {}", summary);
    }
}
