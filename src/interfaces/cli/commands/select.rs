//! Select command - preview what a slot would render

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::runtime::StartupContext;
use crate::storage::{ContentType, OrderMode, Site, SlotRequest};

pub async fn show_selection(
    ctx: &StartupContext,
    slot: i64,
    rss: bool,
    limit: Option<u8>,
    order: Option<String>,
    site_id: Option<i64>,
) -> Result<(), CliError> {
    let content_type = if rss {
        ContentType::Rss
    } else {
        ContentType::Link
    };
    let request = SlotRequest::new(slot, content_type);
    let slot = request.clamped_slot();

    if let Some(site_id) = site_id {
        let sites = ctx.selector.select_for_slot(request.with_site(site_id)).await;
        if sites.is_empty() {
            println!(
                "{} Site {} is missing or not approved",
                "ℹ".bold().blue(),
                site_id.to_string().cyan()
            );
        }
        print_sites(&sites);
        return Ok(());
    }

    let mut config = ctx.selector.slot_config(slot, content_type).await;
    if let Some(limit) = limit {
        config.display_limit = limit;
    }
    if let Some(order) = order {
        let parsed: OrderMode = order
            .parse()
            .map_err(|_| CliError::ParseError(format!("Unknown order mode: {}", order)))?;
        config.order_mode = parsed;
    }

    println!(
        "{} {} slot {} ({}, limit {})",
        "Selection for".bold().green(),
        content_type.to_string().cyan(),
        slot.to_string().cyan(),
        config.order_mode.to_string().yellow(),
        config.display_limit
    );

    if config.is_disabled() {
        println!("{} Slot is disabled", "ℹ".bold().blue());
        return Ok(());
    }

    let sites = ctx
        .selector
        .select_sites(i64::from(slot), content_type, &config)
        .await;
    if sites.is_empty() {
        println!("{} No eligible sites", "ℹ".bold().blue());
        return Ok(());
    }
    print_sites(&sites);
    Ok(())
}

fn print_sites(sites: &[Site]) {
    for (i, site) in sites.iter().enumerate() {
        let mut line = format!(
            "  {}. {} {}",
            i + 1,
            site.name.cyan(),
            site.display_url.blue().underline()
        );
        if let Some(rss) = site.rss_url.as_deref().filter(|_| site.has_feed()) {
            line.push_str(&format!(" {}", format!("(rss: {})", rss).dimmed()));
        }
        println!("{}", line);
    }
}
