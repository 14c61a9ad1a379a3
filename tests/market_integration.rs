use std::fs;
use std::process::Command;

use tariff_sim::config::MarketConfig;
use tariff_sim::io::export::{export_summaries, export_transactions};
use tariff_sim::market::TransactionKind;
use tariff_sim::sim::engine::MarketEngine;
use tariff_sim::sim::kpi::{CycleSummary, MarketReport};

fn shortened(mut cfg: MarketConfig, cycles: usize) -> MarketConfig {
    cfg.simulation.cycles = cycles;
    cfg.simulation.timeslots_per_cycle = 6;
    cfg.simulation.profile_hours = 24;
    cfg
}

fn run(cfg: MarketConfig) -> (MarketEngine, Vec<CycleSummary>) {
    let mut engine = MarketEngine::new(cfg).unwrap_or_else(|e| panic!("engine should build: {e}"));
    let summaries = engine.run().unwrap_or_else(|e| panic!("run should finish: {e}"));
    (engine, summaries)
}

#[test]
fn every_preset_conserves_population() {
    for name in MarketConfig::PRESETS {
        let cfg = MarketConfig::from_preset(name).unwrap_or_else(|e| panic!("{e}"));
        let cycles = cfg.simulation.cycles.min(6);
        let (engine, summaries) = run(shortened(cfg, cycles));

        assert_eq!(summaries.len(), cycles, "preset {name}");
        for s in &summaries {
            assert!(s.population_conserved, "preset {name} cycle {}", s.cycle);
            assert_eq!(s.allocation_balance, 0, "preset {name} cycle {}", s.cycle);
            assert!(s.charges.is_finite());
        }
        assert!(!engine.transactions().is_empty(), "preset {name} should bill usage");
    }
}

#[test]
fn price_war_retires_the_incumbent_tariff() {
    let (engine, summaries) = run(shortened(MarketConfig::price_war(), 7));

    assert!(engine.tariff_id("beta").is_some());
    assert!(engine.tariff_id("alpha-2").is_some());
    let last = summaries.last().unwrap_or_else(|| panic!("run should produce summaries"));
    assert_eq!(last.committed_to("alpha"), 0);

    let report = MarketReport::from_summaries(&summaries);
    assert!(report.population_conserved);
    assert_eq!(report.cycles, 7);
    assert!(report.leading_tariff.is_some());
}

#[test]
fn revocation_preset_strands_nobody() {
    let (engine, summaries) = run(shortened(MarketConfig::revocation(), 6));

    let alpha = engine.tariff_id("alpha");
    let gamma = engine.tariff_id("gamma");
    assert!(alpha.is_some() && gamma.is_some());
    assert_eq!(summaries[3].committed_to("alpha"), 0);
    assert_eq!(summaries[5].committed_to("gamma"), 0);
    // the factory may move between tariffs but never leaves the market
    let factory: u64 = engine
        .subscriptions()
        .iter()
        .filter(|s| s.customer().name == "factory")
        .map(|s| s.customers_committed())
        .sum();
    assert_eq!(factory, 12);
}

#[test]
fn control_only_touches_curtailable_subscriptions() {
    let mut cfg = MarketConfig::revocation();
    cfg.simulation.cycles = 2;
    cfg.simulation.profile_hours = 24;
    // control every hour so each billed slot is in the window
    cfg.control.begin = 0;
    cfg.control.end = 0;
    let (engine, summaries) = run(cfg);

    let flex = engine.tariff_id("gamma-flex");
    let regulation: Vec<_> = engine
        .transactions()
        .of_kind(TransactionKind::Regulation)
        .collect();
    assert!(regulation.iter().all(|t| Some(t.tariff) == flex));
    for s in &summaries {
        assert!(s.curtailed_kwh >= 0.0);
        assert!(s.balancing_kwh <= 0.0);
        // shares are taken after billing, so they match the billed population
        assert_eq!(s.curtailed_kwh > 0.0, s.committed_to("gamma-flex") > 0, "cycle {}", s.cycle);
    }
}

#[test]
fn same_seed_same_market() {
    let (_, first) = run(shortened(MarketConfig::price_war(), 4));
    let (_, second) = run(shortened(MarketConfig::price_war(), 4));
    assert_eq!(first, second);
}

#[test]
fn exports_transactions_and_summaries() {
    let (engine, summaries) = run(shortened(MarketConfig::baseline(), 2));
    let dir = std::env::temp_dir().join(format!("tariff-sim-export-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap_or_else(|e| panic!("{e}"));

    let tx_path = dir.join("transactions.csv");
    let summary_path = dir.join("summary.csv");
    export_transactions(engine.transactions().transactions(), &tx_path)
        .unwrap_or_else(|e| panic!("{e}"));
    export_summaries(&summaries, &summary_path).unwrap_or_else(|e| panic!("{e}"));

    let tx = fs::read_to_string(&tx_path).unwrap_or_default();
    assert!(tx.starts_with("timeslot,kind,tariff,broker,customer,count,kwh,charge"));
    assert_eq!(tx.lines().count(), engine.transactions().len() + 1);
    assert!(tx.contains(",SIGNUP,"));
    assert!(tx.contains(",CONSUME,"));

    let summary = fs::read_to_string(&summary_path).unwrap_or_default();
    assert_eq!(summary.lines().count(), 3);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn scenario_files_run_via_cli() {
    for path in [
        "scenarios/baseline.toml",
        "scenarios/price_war.toml",
        "scenarios/revocation.toml",
    ] {
        let stdout = run_cli(&["--scenario", path, "--cycles", "3"]);
        assert!(
            stdout.contains("Population conserved:  true"),
            "population not conserved for {path}: {stdout}"
        );
        assert_eq!(parse_field(&stdout, "Cycles:"), Some("3".to_string()), "{path}");
        assert_eq!(stdout.lines().filter(|l| l.starts_with("cycle=")).count(), 3);
    }
}

#[test]
fn cli_rejects_unknown_preset() {
    let output = Command::new(env!("CARGO_BIN_EXE_tariff-sim"))
        .args(["--preset", "nope"])
        .output()
        .unwrap_or_else(|e| panic!("tariff-sim process should run: {e}"));
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown preset"));
}

fn run_cli(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_tariff-sim"))
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("tariff-sim process should run: {e}"));
    assert!(
        output.status.success(),
        "run failed for {args:?}: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn parse_field(stdout: &str, label: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|l| l.strip_prefix(label))
        .map(|v| v.trim().to_string())
}
