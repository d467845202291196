use anyhow::Result;
use colored::Colorize;
use std::time::Instant;

use crate::step::Step;

/// Cortex-M4F target the driver is cross-checked against.
const EMBEDDED_TARGET: &str = "thumbv7em-none-eabihf";

pub fn run(host_only: bool) -> Result<()> {
    println!();
    println!("{}", "🔍 Checking driver builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    Step::fatal(
        "Checking soundboard (host, tracing)",
        &["check", "-p", "soundboard", "--features", "tracing"],
    )
    .run()?;

    if host_only {
        println!("{}", "  ⚠ Skipping bare-metal checks (--host-only)".yellow());
        println!();
    } else {
        Step::fatal(
            "Checking platform crate (no_std)",
            &["check", "-p", "platform", "--target", EMBEDDED_TARGET, "--no-default-features"],
        )
        .run()?;

        Step::fatal(
            "Checking soundboard (no_std, defmt)",
            &["check", "-p", "soundboard", "--target", EMBEDDED_TARGET, "--features", "defmt"],
        )
        .run()?;
    }

    Step::advisory(
        "Running clippy lints",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
    .run()?;

    if Step::advisory("Checking code formatting", &["fmt", "--all", "--check"])
        .run()?
        .is_none()
    {
        eprintln!("     Run 'cargo fmt --all' to fix");
        println!();
    }

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}
