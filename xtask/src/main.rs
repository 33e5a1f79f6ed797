use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "lazymemo workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the test suite once per feature set
    Test {
        /// Run only the default feature set
        #[arg(long, default_value_t = false)]
        quick: bool,
    },
    /// Run the criterion benchmarks and summarize them
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,
    },
}

const FEATURE_SETS: &[&str] = &["", "tracing", "parallel", "tracing,parallel"];

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Test { quick } => {
            let sets = if quick { &FEATURE_SETS[..1] } else { FEATURE_SETS };
            for features in sets {
                run_tests(features)?;
            }
        }
        Commands::Bench { quick, report_only } => {
            if !report_only {
                run_benchmarks(quick)?;
            }
            generate_report()?;
        }
    }

    Ok(())
}

fn run_tests(features: &str) -> Result<()> {
    let label = if features.is_empty() { "default" } else { features };
    println!("\n>>> cargo test [{label}]");
    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.args(["test", "-p", "lazymemo"]);
    if !features.is_empty() {
        cmd.args(["--features", features]);
    }

    let status = cmd.status().with_context(|| format!("failed to run tests for [{label}]"))?;
    if !status.success() {
        bail!("tests failed for feature set [{label}]");
    }
    println!("Finished [{label}] in {:.2?}", start.elapsed());
    Ok(())
}

fn run_benchmarks(quick: bool) -> Result<()> {
    println!("Running benchmarks...");

    let mut cmd = Command::new("cargo");
    cmd.args(["bench", "--bench", "lazy_benchmark", "--"]);
    if quick {
        cmd.args(["--measurement-time", "0.1", "--noplot", "--sample-size", "10"]);
    }

    let status = cmd.status().context("failed to run cargo bench")?;
    if !status.success() {
        bail!("benchmarks failed");
    }
    Ok(())
}

#[derive(Deserialize)]
struct Estimates {
    mean: Estimate,
}

#[derive(Deserialize)]
struct Estimate {
    point_estimate: f64,
}

fn generate_report() -> Result<()> {
    println!("\n>>> Generating Report...");

    let criterion_dir = Path::new("target/criterion");
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    let mut results = BTreeMap::new();
    collect_results(criterion_dir, criterion_dir, &mut results)?;

    let report_path = Path::new("benchmark_results/report.md");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }

    use std::fmt::Write;
    let mut report = String::from("# Benchmark Report\n\n| Benchmark | Mean |\n|---|---|\n");
    for (name, nanos) in &results {
        writeln!(report, "| {name} | {} |", format_nanos(*nanos))?;
    }
    fs::write(report_path, report)
        .with_context(|| format!("failed to write {}", report_path.display()))?;

    println!("Report written to {}", report_path.display());
    Ok(())
}

/// Collects `<group>/<bench>/new/estimates.json` means, keyed by
/// `group/bench`.
fn collect_results(root: &Path, dir: &Path, results: &mut BTreeMap<String, f64>) -> Result<()> {
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if path.file_name().and_then(|s| s.to_str()) == Some("report") {
                continue;
            }
            collect_results(root, &path, results)?;
            continue;
        }
        if path.file_name().and_then(|s| s.to_str()) != Some("estimates.json") {
            continue;
        }
        let Some(run_dir) = path.parent() else { continue };
        if run_dir.file_name().and_then(|s| s.to_str()) != Some("new") {
            continue;
        }
        let Some(bench_dir) = run_dir.parent() else { continue };

        let content = fs::read_to_string(&path)?;
        let estimates: Estimates = serde_json::from_str(&content)
            .with_context(|| format!("malformed {}", path.display()))?;
        let name = bench_dir
            .strip_prefix(root)
            .unwrap_or(bench_dir)
            .display()
            .to_string();
        results.insert(name, estimates.mean.point_estimate);
    }
    Ok(())
}

fn format_nanos(nanos: f64) -> String {
    if nanos > 1_000_000.0 {
        format!("{:.2} ms", nanos / 1_000_000.0)
    } else if nanos > 1_000.0 {
        format!("{:.2} µs", nanos / 1_000.0)
    } else {
        format!("{nanos:.1} ns")
    }
}
