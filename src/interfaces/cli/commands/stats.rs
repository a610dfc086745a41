//! Traffic commands - priorities, ranking and visit recording

use chrono::{NaiveDate, Utc};
use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::runtime::StartupContext;
use crate::storage::{CounterMetric, CounterStore};

pub async fn show_priorities(
    ctx: &StartupContext,
    period: Option<u32>,
    ids: Vec<i64>,
) -> Result<(), CliError> {
    let period = period.unwrap_or(crate::config::get_config().ranking.period_days);
    let priorities = ctx.aggregator.compute_priorities(&ids, period).await;

    let mut rows: Vec<_> = priorities.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    println!(
        "{} ({} days)",
        "Return-need priorities".bold().green(),
        period
    );
    for (id, need) in rows {
        let need = if need > 0 {
            need.to_string().green()
        } else {
            need.to_string().dimmed()
        };
        println!("  {} {}", format!("#{}", id).cyan(), need);
    }
    Ok(())
}

pub async fn show_ranking(
    ctx: &StartupContext,
    period: Option<u32>,
    limit: Option<usize>,
) -> Result<(), CliError> {
    let config = crate::config::get_config();
    let period = period.unwrap_or(config.ranking.period_days);
    let limit = limit.unwrap_or(config.ranking.limit);

    let entries = ctx
        .ranking
        .ranking(period, limit)
        .await
        .map_err(|e| CliError::CommandError(format!("Failed to build ranking: {}", e)))?;

    if entries.is_empty() {
        println!("{} No approved sites", "ℹ".bold().blue());
        return Ok(());
    }

    println!("{} ({} days)", "Network ranking".bold().green(), period);
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "  {:>3}. {} {} {}",
            i + 1,
            entry.site.name.cyan(),
            format!("in: {}", entry.total_in).green(),
            format!("out: {}", entry.total_out).yellow()
        );
    }
    Ok(())
}

pub async fn record_visit(
    ctx: &StartupContext,
    metric: String,
    site_id: Option<i64>,
    url: Option<String>,
    date: Option<String>,
) -> Result<(), CliError> {
    let metric: CounterMetric = metric
        .parse()
        .map_err(|_| CliError::ParseError(format!("Metric must be 'in' or 'out': {}", metric)))?;
    let day = match date {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|e| CliError::ParseError(format!("Invalid date '{}': {}", raw, e)))?,
        None => Utc::now().date_naive(),
    };

    let site_id = match (site_id, url) {
        (Some(id), _) => {
            ctx.storage.increment_daily(id, day, metric).await?;
            id
        }
        (None, Some(url)) => match ctx.visits.record(&url, metric, day).await? {
            Some(id) => id,
            None => {
                println!("{} No registered site matches {}", "ℹ".bold().blue(), url);
                return Ok(());
            }
        },
        (None, None) => {
            return Err(CliError::ParseError(
                "Either --site-id or --url is required".to_string(),
            ));
        }
    };

    println!(
        "{} {} visit for site {} on {}",
        "✓".bold().green(),
        metric.as_ref().to_uppercase().cyan(),
        site_id.to_string().cyan(),
        day
    );
    Ok(())
}
