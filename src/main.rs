//! Tariff market simulator entry point: CLI wiring and config-driven engine
//! construction.

use std::path::Path;
use std::process;

use tracing_subscriber::EnvFilter;

use tariff_sim::config::MarketConfig;
use tariff_sim::io::export::{export_summaries, export_transactions};
use tariff_sim::sim::engine::MarketEngine;
use tariff_sim::sim::kpi::MarketReport;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    cycles_override: Option<usize>,
    transactions_out: Option<String>,
    summary_out: Option<String>,
}

fn print_help() {
    eprintln!("tariff-sim: retail electricity tariff market simulator");
    eprintln!();
    eprintln!("Usage: tariff-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>          Load market from TOML config file");
    eprintln!(
        "  --preset <name>            Use a built-in preset ({})",
        MarketConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>               Override random seed");
    eprintln!("  --cycles <n>               Override number of evaluation cycles");
    eprintln!("  --transactions-out <path>  Export settled transactions to CSV");
    eprintln!("  --summary-out <path>       Export per-cycle summaries to CSV");
    eprintln!("  --help                     Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: tariff_sim=info,warn).");
}

/// Returns the value following flag `args[*i]`, advancing `i`.
fn flag_value(args: &[String], i: &mut usize, what: &str) -> String {
    *i += 1;
    if *i >= args.len() {
        eprintln!("error: {} requires {what}", args[*i - 1]);
        process::exit(1);
    }
    args[*i].clone()
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        cycles_override: None,
        transactions_out: None,
        summary_out: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => cli.scenario_path = Some(flag_value(&args, &mut i, "a path argument")),
            "--preset" => cli.preset = Some(flag_value(&args, &mut i, "a name argument")),
            "--seed" => {
                let value = flag_value(&args, &mut i, "a u64 argument");
                if let Ok(s) = value.parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{value}\" is not a valid u64");
                    process::exit(1);
                }
            }
            "--cycles" => {
                let value = flag_value(&args, &mut i, "a count argument");
                if let Ok(n) = value.parse::<usize>() {
                    cli.cycles_override = Some(n);
                } else {
                    eprintln!("error: --cycles value \"{value}\" is not a valid count");
                    process::exit(1);
                }
            }
            "--transactions-out" => {
                cli.transactions_out = Some(flag_value(&args, &mut i, "a path argument"));
            }
            "--summary-out" => cli.summary_out = Some(flag_value(&args, &mut i, "a path argument")),
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tariff_sim=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();

    // Load config: --scenario takes priority, then --preset, then baseline default
    let loaded = if let Some(ref path) = cli.scenario_path {
        MarketConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        MarketConfig::from_preset(name)
    } else {
        Ok(MarketConfig::baseline())
    };
    let mut config = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if let Some(seed) = cli.seed_override {
        config.simulation.seed = seed;
    }
    if let Some(cycles) = cli.cycles_override {
        config.simulation.cycles = cycles;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let summaries = match MarketEngine::new(config).and_then(|mut engine| {
        let summaries = engine.run()?;
        if let Some(ref path) = cli.transactions_out {
            export_transactions(engine.transactions().transactions(), Path::new(path))?;
            eprintln!("Transactions written to {path}");
        }
        Ok(summaries)
    }) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    for s in &summaries {
        println!("{s}");
    }

    let report = MarketReport::from_summaries(&summaries);
    println!("\n{report}");

    if let Some(ref path) = cli.summary_out {
        if let Err(e) = export_summaries(&summaries, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Summary written to {path}");
    }
}
