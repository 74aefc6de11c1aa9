//! Terminal rendering of plan state

use std::fmt::Write as _;

use colored::{ColoredString, Colorize};
use eyre::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::controller::PlanState;
use crate::domain::{Coordinates, CrowdLevel, ErrandPlan, ErrandStop, GroundingLink, ParkingDifficulty, RequestHistory};
use crate::links::directions_url;

fn parking_badge(level: ParkingDifficulty) -> ColoredString {
    let label = format!("parking {}", level);
    match level {
        ParkingDifficulty::Easy => label.green(),
        ParkingDifficulty::Moderate => label.yellow(),
        ParkingDifficulty::Difficult => label.red(),
    }
}

fn crowd_badge(level: CrowdLevel) -> ColoredString {
    let label = format!("crowd {}", level);
    match level {
        CrowdLevel::Low => label.green(),
        CrowdLevel::Medium => label.yellow(),
        CrowdLevel::High => label.red(),
    }
}

fn render_stop(out: &mut String, position: usize, stop: &ErrandStop) {
    let _ = writeln!(
        out,
        "  {}. {} {}",
        position,
        stop.name.bold(),
        format!("({})", stop.category).dimmed()
    );
    let _ = writeln!(out, "     {}", stop.address);
    let _ = writeln!(
        out,
        "     {} {}  {}  {}",
        "arrive".dimmed(),
        stop.arrival_estimate,
        parking_badge(stop.parking_difficulty),
        crowd_badge(stop.crowd_level)
    );
    let _ = writeln!(out, "     {}", stop.reason.italic());
    if let Some(advice) = &stop.parking_advice {
        let _ = writeln!(out, "     {} {}", "parking:".dimmed(), advice);
    }
    if let Some(note) = &stop.traffic_note {
        let _ = writeln!(out, "     {} {}", "traffic:".dimmed(), note);
    }
    if !stop.google_maps_url.is_empty() {
        let _ = writeln!(out, "     {}", stop.google_maps_url.blue().underline());
    }
}

fn render_body(out: &mut String, plan: &ErrandPlan) {
    let _ = writeln!(out, "{}", plan.summary.bright_cyan().bold());
    let _ = writeln!(
        out,
        "{} {}   {} {}",
        "Total time:".dimmed(),
        plan.total_time,
        "Efficiency:".dimmed(),
        plan.efficiency_score
    );
    let _ = writeln!(out);

    if plan.stops.is_empty() {
        let _ = writeln!(out, "  {}", "No stops needed.".dimmed());
    }
    for (i, stop) in plan.stops.iter().enumerate() {
        render_stop(out, i + 1, stop);
    }

    if let Some(alternatives) = plan.alternatives.as_deref().filter(|a| !a.is_empty()) {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Alternatives:".bright_cyan());
        for alt in alternatives {
            let _ = writeln!(out, "  {} -> {}: {}", alt.original, alt.suggested.bold(), alt.benefit);
        }
    }

    if let Some(suggestions) = plan.household_suggestions.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "While you're out:".bright_cyan());
        for suggestion in suggestions {
            let _ = writeln!(out, "  - {}", suggestion);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{} {}", "Why this order:".dimmed(), plan.reasoning);
}

fn render_links(out: &mut String, links: &[GroundingLink]) {
    if links.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Sources:".bright_cyan());
    for link in links {
        let _ = writeln!(out, "  {} {}", link.title, link.uri.blue().underline());
    }
}

/// Render the whole state: plan, citations, route link and any error
pub fn render_plan(state: &PlanState, origin: &Coordinates) -> String {
    debug!(has_plan = state.has_plan(), links = state.links.len(), "render_plan: called");
    let mut out = String::new();

    if let Some(error) = &state.error {
        let _ = writeln!(out, "{} {}", "Error:".red().bold(), error);
    }

    match &state.plan {
        Some(plan) => {
            render_body(&mut out, plan);
            render_links(&mut out, &state.links);
            if let Some(url) = directions_url(origin, &plan.stops) {
                let _ = writeln!(out);
                let _ = writeln!(out, "{} {}", "Directions:".bright_cyan(), url.blue().underline());
            }
        }
        None if state.error.is_none() => {
            let _ = writeln!(out, "{}", "No plan yet.".dimmed());
        }
        None => {}
    }
    out
}

/// Most recent first, numbered for `/recall`
pub fn render_history(history: &RequestHistory) -> String {
    if history.is_empty() {
        return format!("{}\n", "No recent requests.".dimmed());
    }
    let mut out = String::new();
    for (i, entry) in history.entries().enumerate() {
        let _ = writeln!(out, "  {} {}", format!("{}.", i + 1).yellow(), entry);
    }
    out
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanOutput<'a> {
    plan: Option<&'a ErrandPlan>,
    links: &'a [GroundingLink],
    #[serde(skip_serializing_if = "Option::is_none")]
    directions_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

/// Machine-readable form of the state
pub fn render_json(state: &PlanState, origin: &Coordinates) -> Result<String> {
    debug!("render_json: called");
    let output = PlanOutput {
        plan: state.plan.as_ref(),
        links: &state.links,
        directions_url: state.plan.as_ref().and_then(|p| directions_url(origin, &p.stops)),
        error: state.error.as_deref(),
    };
    serde_json::to_string_pretty(&output).context("Failed to serialize plan")
}
