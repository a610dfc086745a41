//! Assign command - set slot memberships with exclusivity

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::runtime::StartupContext;
use crate::storage::SlotSet;

pub async fn assign_slots(
    ctx: &StartupContext,
    site_id: i64,
    link: String,
    rss: String,
) -> Result<(), CliError> {
    let link_slots = SlotSet::parse_csv(&link);
    let rss_slots = SlotSet::parse_csv(&rss);

    let releases = ctx
        .enforcer
        .update_memberships(site_id, &link_slots, &rss_slots)
        .await?;

    println!(
        "{} Site {} now holds link [{}] rss [{}]",
        "✓".bold().green(),
        site_id.to_string().cyan(),
        link_slots.to_string().cyan(),
        rss_slots.to_string().cyan()
    );
    for release in &releases {
        println!(
            "  {} {} slot {} released from site {}",
            "→".yellow(),
            release.content_type,
            release.slot,
            release.site_id.to_string().cyan()
        );
    }
    Ok(())
}
