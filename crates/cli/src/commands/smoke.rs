use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use zeroclick_core::config::{AppConfig, LoadOptions};
use zeroclick_core::email::{extract_currency_amounts, parse_email, sample_emails};
use zeroclick_db::{connect_with_settings, migrations, CrmRepositories, DemoSeedDataset};

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

const AFTER_DATABASE: [&str; 3] = ["migration_visibility", "record_counts", "pipeline_total"];

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, config)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Pass,
                elapsed_ms,
                message: format!(
                    "configuration loaded and validated (llm provider `{}`)",
                    config.llm.provider.as_str()
                ),
            });
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Fail,
                elapsed_ms,
                message: error.to_string(),
            });
            checks.push(skipped("db_connectivity"));
            checks.extend(AFTER_DATABASE.into_iter().map(skipped));
            checks.push(email_parser_check());
            return finalize_report(checks, elapsed_since(started));
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Fail,
                elapsed_ms: 0,
                message: format!("failed to initialize async runtime: {error}"),
            });
            checks.extend(AFTER_DATABASE.into_iter().map(skipped));
            checks.push(email_parser_check());
            return finalize_report(checks, elapsed_since(started));
        }
    };

    let db_started = Instant::now();
    let db_result = runtime.block_on(async {
        connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
    });

    let pool = match db_result {
        Ok(pool) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Pass,
                elapsed_ms: elapsed_since(db_started),
                message: format!("connected using `{}`", config.database.url),
            });
            pool
        }
        Err(error) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Fail,
                elapsed_ms: elapsed_since(db_started),
                message: format!("failed to connect: {error}"),
            });
            checks.extend(AFTER_DATABASE.into_iter().map(skipped));
            checks.push(email_parser_check());
            return finalize_report(checks, elapsed_since(started));
        }
    };

    let migration_started = Instant::now();
    match runtime.block_on(async { migrations::run_pending(&pool).await }) {
        Ok(()) => checks.push(SmokeCheck {
            name: "migration_visibility",
            status: SmokeStatus::Pass,
            elapsed_ms: elapsed_since(migration_started),
            message: "migrations are visible and executable".to_string(),
        }),
        Err(error) => {
            checks.push(SmokeCheck {
                name: "migration_visibility",
                status: SmokeStatus::Fail,
                elapsed_ms: elapsed_since(migration_started),
                message: format!("migration execution failed: {error}"),
            });
            checks.push(skipped("record_counts"));
            checks.push(skipped("pipeline_total"));
            checks.push(email_parser_check());
            runtime.block_on(pool.close());
            return finalize_report(checks, elapsed_since(started));
        }
    }

    let repositories = CrmRepositories::sql(pool.clone());
    let counts_started = Instant::now();
    let counts = runtime.block_on(async {
        let contacts = repositories.contacts.list().await?;
        let deals = repositories.deals.list().await?;
        let activities = repositories.activities.list().await?;
        Ok::<_, zeroclick_db::RepositoryError>((contacts.len(), deals, activities.len()))
    });

    match counts {
        Ok((contacts, deals, activities)) => {
            checks.push(SmokeCheck {
                name: "record_counts",
                status: SmokeStatus::Pass,
                elapsed_ms: elapsed_since(counts_started),
                message: format!(
                    "{contacts} contacts, {} deals, {activities} activities",
                    deals.len()
                ),
            });
            let total: f64 = deals.iter().filter_map(|record| record.deal.deal_value).sum();
            checks.push(SmokeCheck {
                name: "pipeline_total",
                status: SmokeStatus::Pass,
                elapsed_ms: 0,
                message: format!(
                    "pipeline total ${total:.2} (demo dataset totals ${:.2})",
                    DemoSeedDataset::pipeline_total()
                ),
            });
        }
        Err(error) => {
            checks.push(SmokeCheck {
                name: "record_counts",
                status: SmokeStatus::Fail,
                elapsed_ms: elapsed_since(counts_started),
                message: format!("failed to read records: {error}"),
            });
            checks.push(skipped("pipeline_total"));
        }
    }
    runtime.block_on(pool.close());

    checks.push(email_parser_check());
    finalize_report(checks, elapsed_since(started))
}

/// Parses the first demo email and scans its body for amounts.
fn email_parser_check() -> SmokeCheck {
    let started = Instant::now();
    let Some(sample) = sample_emails().into_iter().next() else {
        return SmokeCheck {
            name: "email_parser",
            status: SmokeStatus::Fail,
            elapsed_ms: 0,
            message: "no sample emails available".to_string(),
        };
    };

    let parsed = parse_email(&sample.to_email_text());
    let amounts = parsed.body.as_deref().map(extract_currency_amounts).unwrap_or_default();
    let ok = parsed.from_email.is_some() && parsed.subject.is_some();

    SmokeCheck {
        name: "email_parser",
        status: if ok { SmokeStatus::Pass } else { SmokeStatus::Fail },
        elapsed_ms: elapsed_since(started),
        message: format!(
            "parsed sample from {} with {} amount(s) at {}",
            parsed.from_email.as_deref().unwrap_or("<missing sender>"),
            amounts.len(),
            Utc::now().format("%Y-%m-%d")
        ),
    }
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((elapsed_since(started), value)),
        Err(error) => Err((elapsed_since(started), error)),
    }
}

fn elapsed_since(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\
             \"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
