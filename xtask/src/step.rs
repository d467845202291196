//! One `cargo` invocation with a coloured pass/fail line.

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::{Command, Output};
use std::time::Instant;

/// Whether a failing step stops the task or only warns.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Advisory,
}

pub struct Step<'a> {
    pub label: &'a str,
    pub args: &'a [&'a str],
    pub severity: Severity,
}

impl<'a> Step<'a> {
    pub const fn fatal(label: &'a str, args: &'a [&'a str]) -> Self {
        Self {
            label,
            args,
            severity: Severity::Fatal,
        }
    }

    pub const fn advisory(label: &'a str, args: &'a [&'a str]) -> Self {
        Self {
            label,
            args,
            severity: Severity::Advisory,
        }
    }

    /// Run the step. Returns the captured output when it succeeded.
    pub fn run(&self) -> Result<Option<Output>> {
        println!("{}", format!("  {}...", self.label).cyan());
        let start = Instant::now();

        let output = Command::new("cargo")
            .args(self.args)
            .output()
            .with_context(|| format!("Failed to spawn cargo for {}", self.label))?;

        if output.status.success() {
            println!(
                "{}",
                format!(
                    "  ✓ {} passed in {:.2}s",
                    self.label,
                    start.elapsed().as_secs_f64()
                )
                .green()
            );
            println!();
            return Ok(Some(output));
        }

        match self.severity {
            Severity::Fatal => {
                eprintln!("{}", format!("  ✗ {} failed", self.label).red().bold());
                eprintln!();
                dump(&output);
                anyhow::bail!("{} failed", self.label);
            }
            Severity::Advisory => {
                eprintln!("{}", format!("  ⚠ {} reported problems", self.label).yellow().bold());
                eprintln!();
                dump(&output);
                println!();
                Ok(None)
            }
        }
    }
}

fn dump(output: &Output) {
    for stream in [&output.stdout, &output.stderr] {
        for line in String::from_utf8_lossy(stream).lines() {
            eprintln!("  {line}");
        }
    }
}
