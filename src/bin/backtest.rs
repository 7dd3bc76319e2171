use anyhow::{bail, Context, Result};
use chrono::Duration;

use signal_edge::config::Config;
use signal_edge::decision::EntryPlanner;
use signal_edge::evaluator::{EvaluationOutcome, OutcomeEvaluator};
use signal_edge::learning::LearningStore;
use signal_edge::model::entry::TradeResult;
use signal_edge::optimizer::WeightOptimizer;
use signal_edge::runtime::{JsonFilePriceSource, PriceSource};
use signal_edge::scoring::{ConfidenceEngine, Weights};
use signal_edge::trust::PatternTrustFilter;

const LOOKBACK: usize = 100;
const HORIZON: usize = 12;
const TRUST_REFRESH_EVERY: usize = 12;

#[derive(Debug, Default)]
struct Summary {
    entries: usize,
    actionable: usize,
    success: usize,
    fail: usize,
    neutral: usize,
}

fn usage() -> &'static str {
    "usage: signal-edge-backtest <price_history.json> [--config <path>]"
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut history_path = None;
    let mut config_path = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                config_path = Some(iter.next().context("--config needs a path")?.clone());
            }
            "-h" | "--help" => {
                println!("{}", usage());
                return Ok(());
            }
            other if history_path.is_none() => history_path = Some(other.to_string()),
            other => bail!("unexpected argument '{}'\n{}", other, usage()),
        }
    }
    let Some(history_path) = history_path else {
        bail!("{}", usage());
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match config_path {
        Some(path) => Config::load_from_path(std::path::Path::new(&path))?,
        None => Config::load_or_default()?,
    };

    let samples = JsonFilePriceSource::new(&history_path).fetch_prices()?;
    if samples.len() < LOOKBACK + HORIZON {
        bail!(
            "{} has {} usable samples, need at least {}",
            history_path,
            samples.len(),
            LOOKBACK + HORIZON
        );
    }

    let store = LearningStore::open_in_memory(config.trust.rolling_window)?;
    let planner = EntryPlanner::new(
        ConfidenceEngine::new(config.scoring.clone()),
        config.entry.clone(),
    );
    let mut optimizer = WeightOptimizer::new(config.optimizer.clone());
    let mut trust = PatternTrustFilter::new(config.trust.clone());
    let mut weights = Weights::from_config(&config.weights);
    let mut summary = Summary::default();

    for i in LOOKBACK..=samples.len() - HORIZON {
        let window = &samples[i - LOOKBACK..i];
        let Some(last) = window.last() else {
            continue;
        };
        let stats = store.snapshot()?;
        let Some(plan) = planner.plan(window, &[], last.timestamp, &weights, &stats, &trust) else {
            continue;
        };
        summary.entries += 1;
        if plan.actionable {
            summary.actionable += 1;
        }

        let future = &samples[i..i + HORIZON];
        let horizon_end = future.last().map(|s| s.timestamp).unwrap_or(last.timestamp);
        let span = (horizon_end - last.timestamp).max(Duration::zero());
        let evaluator = OutcomeEvaluator::new(span);
        let mut record = plan.record;
        let report = evaluator.evaluate(&mut record, future, horizon_end, &store)?;
        match report.outcome {
            EvaluationOutcome::Settled(TradeResult::Success) => summary.success += 1,
            EvaluationOutcome::Settled(TradeResult::Fail) => summary.fail += 1,
            _ => summary.neutral += 1,
        }

        if let Some(updated) = optimizer.on_store_mutated(report.mutations, &store, &config.weights)? {
            weights = updated;
        }
        if summary.entries % TRUST_REFRESH_EVERY == 0 {
            trust.refresh(&store.pattern_history()?);
        }
    }
    trust.refresh(&store.pattern_history()?);

    let settled = summary.success + summary.fail;
    let win_rate = if settled > 0 {
        summary.success as f64 / settled as f64
    } else {
        0.0
    };
    println!("samples      : {}", samples.len());
    println!("entries      : {}", summary.entries);
    println!("actionable   : {}", summary.actionable);
    println!("success      : {}", summary.success);
    println!("fail         : {}", summary.fail);
    println!("neutral      : {}", summary.neutral);
    println!("win rate     : {:.2}%", win_rate * 100.0);
    println!("weights      :");
    for (name, value) in weights.to_map() {
        println!("  {:<12} {:.4}", name, value);
    }
    println!("learned      :");
    for stat in store.snapshot()?.to_stats() {
        println!(
            "  {:<10} {:<16} {:>4} / {:<4}",
            stat.category.as_str(),
            stat.key,
            stat.success,
            stat.fail
        );
    }
    println!("trusted      :");
    if trust.trusted().is_empty() {
        println!("  (none)");
    }
    for (pattern, rate) in trust.trusted() {
        println!("  {:<12} {:.3}", pattern, rate);
    }
    Ok(())
}
