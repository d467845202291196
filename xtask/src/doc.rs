//! API docs for the driver crates.

use anyhow::Result;
use colored::Colorize;

use crate::step::Step;

/// Crates whose docs are published; the xtask itself is left out.
const DOC_PACKAGES: [&str; 2] = ["platform", "soundboard"];

fn doc_args(open: bool) -> Vec<&'static str> {
    let mut args = vec!["doc"];
    for package in DOC_PACKAGES {
        args.extend(["-p", package]);
    }
    args.push("--no-deps");
    if open {
        args.push("--open");
    }
    args
}

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Documenting platform and soundboard".cyan().bold());
    println!();

    let args = doc_args(open);
    Step::fatal("cargo doc", &args).run()?;

    if !open {
        println!(
            "   {}",
            "Open target/doc/soundboard/index.html, or run 'cargo run -p xtask -- doc --open'".dimmed()
        );
        println!();
    }

    Ok(())
}
