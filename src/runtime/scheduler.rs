use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::config::SchedulerIntervals;
use crate::runtime::context::EngineContext;

fn ticker(ms: u64) -> tokio::time::Interval {
    let mut iv = tokio::time::interval(Duration::from_millis(ms.max(1)));
    iv.set_missed_tick_behavior(MissedTickBehavior::Skip);
    iv
}

/// Drive the periodic tasks until `shutdown_rx` flips to `true`, then flush
/// and hand the context back. A failing task is logged and retried on its
/// next tick.
pub async fn run_scheduler(
    mut ctx: EngineContext,
    intervals: SchedulerIntervals,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<EngineContext> {
    let mut price_iv = ticker(intervals.price_refresh_ms);
    let mut scan_iv = ticker(intervals.entry_scan_ms);
    let mut sim_iv = ticker(intervals.simulation_ms);
    let mut eval_iv = ticker(intervals.outcome_evaluation_ms);
    let mut event_iv = ticker(intervals.event_poll_ms);
    let mut trust_iv = ticker(intervals.trust_refresh_ms);
    // The simulation's first tick would fire before any prices are loaded.
    sim_iv.reset();

    tracing::info!(?intervals, "Scheduler started");
    loop {
        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                // A dropped sender counts as shutdown.
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = price_iv.tick() => {
                if let Err(e) = ctx.refresh_prices() {
                    tracing::warn!(error = %format!("{:#}", e), "Price refresh failed");
                }
            }
            _ = event_iv.tick() => {
                if let Err(e) = ctx.poll_events(Utc::now()) {
                    tracing::warn!(error = %format!("{:#}", e), "Event poll failed");
                }
            }
            _ = scan_iv.tick() => {
                if let Err(e) = ctx.scan_entries(Utc::now()) {
                    tracing::warn!(error = %format!("{:#}", e), "Entry scan failed");
                }
            }
            _ = sim_iv.tick() => {
                if let Err(e) = ctx.run_simulation(Utc::now()) {
                    tracing::warn!(error = %format!("{:#}", e), "Simulation failed");
                }
            }
            _ = eval_iv.tick() => {
                if let Err(e) = ctx.evaluate_outcomes(Utc::now()) {
                    tracing::warn!(error = %format!("{:#}", e), "Outcome evaluation failed");
                }
            }
            _ = trust_iv.tick() => {
                if let Err(e) = ctx.refresh_trust() {
                    tracing::warn!(error = %format!("{:#}", e), "Trust refresh failed");
                }
            }
        }
    }

    tracing::info!("Scheduler stopping");
    ctx.flush()?;
    Ok(ctx)
}
