//! Console tables and JSON exports

use chrono::Utc;
use engine::{Roster, SimulationResult, SweepOutcome, TierCounts};

fn tier_summary(counts: &TierCounts) -> String {
    format!(
        "grandmaster {}, master {}, expert {}",
        counts.grandmaster, counts.master, counts.expert
    )
}

pub fn print_gains(result: &SimulationResult) {
    println!(
        "\nRetained {} | Displaced {} | Seed {}",
        result.retained.len(),
        result.displaced.len(),
        result.seed
    );
    println!("  Retained tiers:  {}", tier_summary(&result.retained_tiers));
    println!("  Displaced tiers: {}", tier_summary(&result.displaced_tiers));
    println!("  {:<45} {:>12} {:>12}", "Competition", "Baseline", "Avg gain");
    println!("  {}", "-".repeat(71));
    for (id, gain) in &result.average_gains {
        let baseline = result.baseline_welfare.get(id).copied().unwrap_or_default();
        println!("  {:<45} {:>12.1} {:>+12.2}", id, baseline, gain);
    }
    println!("  {}", "-".repeat(71));
    println!("  {:<45} {:>12} {:>+12.2}", "Mean", "", result.mean_gain());
}

pub fn print_sweep(outcome: &SweepOutcome) {
    println!("\n  {:>8} {:>10} {:>14}", "Retain", "Displaced", "Mean gain");
    println!("  {}", "-".repeat(34));
    for c in &outcome.candidates {
        let marker = if c.retain_count == outcome.best_retain_count { " *" } else { "" };
        println!(
            "  {:>8} {:>10} {:>+14.2}{}",
            c.retain_count,
            c.result.displaced.len(),
            c.mean_gain,
            marker
        );
    }
    println!(
        "\nBest retain count: {} (mean gain {:+.2})",
        outcome.best_retain_count, outcome.best_mean_gain
    );
}

pub fn print_roster(competition: &str, roster: &Roster, payout: Option<f64>, top: usize) {
    let counts = roster.tier_counts();
    println!("\n=== {} ===", competition);
    if let Some(amount) = payout {
        println!("Payout: {:.0}", amount);
    }
    println!("Competitors: {} ({})", counts.total(), tier_summary(&counts));
    println!("\n  {:>4}  {:<30} {:<12} {:>10}", "#", "User", "Tier", "Points");
    println!("  {}", "-".repeat(60));
    for (i, entry) in roster.entries().iter().take(top).enumerate() {
        println!(
            "  {:>4}  {:<30} {:<12} {:>10.1}",
            i + 1,
            entry.user,
            entry.tier().to_string(),
            entry.points()
        );
    }
}

pub fn simulation_export(result: &SimulationResult) -> serde_json::Value {
    serde_json::json!({
        "generated_at": Utc::now().to_rfc3339(),
        "mean_gain": result.mean_gain(),
        "result": result,
    })
}

pub fn sweep_export(outcome: &SweepOutcome) -> serde_json::Value {
    let candidates: Vec<serde_json::Value> = outcome
        .candidates
        .iter()
        .map(|c| {
            serde_json::json!({
                "retain_count": c.retain_count,
                "mean_gain": c.mean_gain,
                "displaced": c.result.displaced.len(),
                "average_gains": c.result.average_gains,
            })
        })
        .collect();

    serde_json::json!({
        "generated_at": Utc::now().to_rfc3339(),
        "best_retain_count": outcome.best_retain_count,
        "best_mean_gain": outcome.best_mean_gain,
        "seed": outcome.candidates.first().map(|c| c.result.seed),
        "candidates": candidates,
    })
}
