use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::decision::{EntryPlan, EntryPlanner};
use crate::entry_ledger::EntryLedger;
use crate::evaluator::{EvaluationOutcome, OutcomeEvaluator};
use crate::event_influence::{apply_learned_durations, measure_event_impact};
use crate::ingest::PriceWindow;
use crate::learning::LearningStore;
use crate::model::entry::EntryRecord;
use crate::model::macro_event::EventRecord;
use crate::optimizer::WeightOptimizer;
use crate::runtime::sources::{EventSource, JsonFileEventSource, JsonFilePriceSource, PriceSource};
use crate::scoring::engine::ConfidenceEngine;
use crate::scoring::weights::Weights;
use crate::snapshot_store::{
    load_trusted_patterns_from_path, load_weights_from_path, persist_trusted_patterns_to_path,
    persist_weights_to_path,
};
use crate::trust::PatternTrustFilter;

/// Everything the periodic tasks share. Each task method runs to completion
/// on `&mut self`, so the scheduler never interleaves two of them.
pub struct EngineContext {
    config: Config,
    store: LearningStore,
    ledger: EntryLedger,
    weights: Weights,
    trust: PatternTrustFilter,
    optimizer: WeightOptimizer,
    planner: EntryPlanner,
    evaluator: OutcomeEvaluator,
    prices: PriceWindow,
    events: Vec<EventRecord>,
    measured_events: HashSet<String>,
    /// Timestamp of the last sample that produced a live entry.
    last_entry_sample: Option<DateTime<Utc>>,
    price_source: Box<dyn PriceSource>,
    event_source: Box<dyn EventSource>,
}

impl EngineContext {
    /// Open the on-disk stores named in `config.storage` and read the feeds
    /// from their JSON files.
    pub fn open(config: Config) -> Result<Self> {
        let store = LearningStore::open(&config.storage.learning_db_path, config.trust.rolling_window)
            .context("failed to open learning store")?;
        let ledger = EntryLedger::open(&config.storage.entries_db_path)
            .context("failed to open entry ledger")?;
        let price_source = JsonFilePriceSource::new(config.storage.price_feed_path.clone());
        let event_source = JsonFileEventSource::new(config.storage.event_feed_path.clone());
        Self::with_parts(
            config,
            store,
            ledger,
            Box::new(price_source),
            Box::new(event_source),
        )
    }

    /// Fully in-memory context; persisted weights and trusted patterns are
    /// still read from and written to `config.storage`.
    pub fn in_memory(
        config: Config,
        price_source: Box<dyn PriceSource>,
        event_source: Box<dyn EventSource>,
    ) -> Result<Self> {
        let store = LearningStore::open_in_memory(config.trust.rolling_window)?;
        let ledger = EntryLedger::open_in_memory()?;
        Self::with_parts(config, store, ledger, price_source, event_source)
    }

    pub fn with_parts(
        config: Config,
        store: LearningStore,
        ledger: EntryLedger,
        price_source: Box<dyn PriceSource>,
        event_source: Box<dyn EventSource>,
    ) -> Result<Self> {
        let weights = match load_weights_from_path(&config.storage.weights_path, &config.weights)? {
            Some(weights) => {
                tracing::info!(path = %config.storage.weights_path.display(), "Loaded persisted weights");
                weights
            }
            None => Weights::from_config(&config.weights),
        };

        let mut trust = match load_trusted_patterns_from_path(&config.storage.trusted_patterns_path)? {
            Some(trusted) => PatternTrustFilter::with_trusted(config.trust.clone(), trusted),
            None => PatternTrustFilter::new(config.trust.clone()),
        };
        if trust.trusted().is_empty() {
            trust.refresh_from_store(&store)?;
        }

        let evaluator = OutcomeEvaluator::from_interval(&config.entry.evaluation_window)?;
        let planner = EntryPlanner::new(
            ConfidenceEngine::new(config.scoring.clone()),
            config.entry.clone(),
        );
        let optimizer = WeightOptimizer::new(config.optimizer.clone());
        let prices = PriceWindow::new(config.entry.history_len);

        Ok(Self {
            config,
            store,
            ledger,
            weights,
            trust,
            optimizer,
            planner,
            evaluator,
            prices,
            events: Vec::new(),
            measured_events: HashSet::new(),
            last_entry_sample: None,
            price_source,
            event_source,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &LearningStore {
        &self.store
    }

    pub fn ledger(&self) -> &EntryLedger {
        &self.ledger
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn trust(&self) -> &PatternTrustFilter {
        &self.trust
    }

    pub fn prices(&self) -> &PriceWindow {
        &self.prices
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Pull the price feed into the rolling window. Returns how many samples
    /// were new.
    pub fn refresh_prices(&mut self) -> Result<usize> {
        let samples = self.price_source.fetch_prices()?;
        let added = self.prices.extend(samples);
        tracing::debug!(added, len = self.prices.len(), "Price window refreshed");
        Ok(added)
    }

    fn plan(&self, now: DateTime<Utc>) -> Result<Option<EntryPlan>> {
        let samples = self.prices.recent(self.config.entry.scoring_window);
        let stats = self.store.snapshot()?;
        Ok(self
            .planner
            .plan(&samples, &self.events, now, &self.weights, &stats, &self.trust))
    }

    /// Score the latest window and record an entry when the confidence
    /// clears the threshold. A window whose last sample already produced an
    /// entry is not scanned again, so one observation yields one entry.
    pub fn scan_entries(&mut self, now: DateTime<Utc>) -> Result<Option<EntryPlan>> {
        let Some(latest) = self.prices.last().map(|s| s.timestamp) else {
            return Ok(None);
        };
        if self.last_entry_sample == Some(latest) {
            tracing::debug!(%latest, "Window unchanged since the last entry");
            return Ok(None);
        }
        let Some(plan) = self.plan(now)? else {
            return Ok(None);
        };
        if !plan.actionable {
            tracing::debug!(confidence = plan.decision.confidence, "No entry signal");
            return Ok(None);
        }
        self.ledger.upsert(&plan.record)?;
        self.last_entry_sample = Some(latest);
        let signals = plan
            .score
            .breakdown
            .as_ref()
            .map(|b| b.signals(plan.detected_pattern))
            .unwrap_or_default();
        tracing::info!(
            id = %plan.record.id,
            direction = %plan.decision.direction,
            confidence = plan.decision.confidence,
            entry = plan.decision.entry_price,
            stop_loss = plan.decision.stop_loss,
            take_profit = plan.decision.take_profit,
            signals = ?signals,
            "Entry signal"
        );
        Ok(Some(plan))
    }

    /// Record an entry regardless of confidence so that outcomes keep
    /// accumulating while live signals are rare.
    pub fn run_simulation(&mut self, now: DateTime<Utc>) -> Result<Option<EntryRecord>> {
        let Some(plan) = self.plan(now)? else {
            tracing::debug!("Not enough history for a simulated entry");
            return Ok(None);
        };
        self.ledger.upsert(&plan.record)?;
        tracing::info!(
            id = %plan.record.id,
            direction = %plan.decision.direction,
            confidence = plan.decision.confidence,
            "Simulated entry recorded"
        );
        Ok(Some(plan.record))
    }

    /// Settle pending entries against the price window, feed the results to
    /// the learning store and let the optimizer react. Returns the number of
    /// learning-store mutations.
    pub fn evaluate_outcomes(&mut self, now: DateTime<Utc>) -> Result<u64> {
        let mut mutations = 0;
        for mut record in self.ledger.pending()? {
            let samples = self.prices.samples_after(record.created_at);
            let report = self.evaluator.evaluate_in_ledger(
                &mut record,
                &samples,
                now,
                &self.ledger,
                &self.store,
            )?;
            if let EvaluationOutcome::Settled(result) = report.outcome {
                tracing::debug!(id = %record.id, %result, "Entry settled");
            }
            mutations += report.mutations;
        }

        if mutations > 0 {
            if let Some(weights) =
                self.optimizer
                    .on_store_mutated(mutations, &self.store, &self.config.weights)?
            {
                self.weights = weights;
                persist_weights_to_path(&self.config.storage.weights_path, &self.weights)?;
            }
        }
        Ok(mutations)
    }

    /// Reload the event feed, apply learned durations and measure the impact
    /// of events whose check horizon has passed. Returns the number of events
    /// still active.
    pub fn poll_events(&mut self, now: DateTime<Utc>) -> Result<usize> {
        let mut events = self.event_source.fetch_events()?;
        let book = self
            .store
            .duration_book(self.config.events.default_duration_secs)?;
        apply_learned_durations(&mut events, &book);

        let max_check = Duration::hours(self.config.events.max_check_hours);
        let history = self.prices.all();
        for event in &events {
            let marker = format!("{}@{}", event.learning_key(), event.announced_at.timestamp());
            if event.announced_at + max_check > now || self.measured_events.contains(&marker) {
                continue;
            }
            if let Some(impact) = measure_event_impact(
                &history,
                event.announced_at,
                max_check,
                self.config.events.significance,
            ) {
                self.store
                    .record_event_duration(&event.learning_key(), impact.duration_secs, now)?;
                tracing::info!(
                    key = %event.learning_key(),
                    duration_secs = impact.duration_secs,
                    up_move_pct = impact.up_move_pct,
                    down_move_pct = impact.down_move_pct,
                    "Event impact measured"
                );
            }
            self.measured_events.insert(marker);
        }

        let active = events.iter().filter(|e| e.is_active(now)).count();
        self.events = events;
        Ok(active)
    }

    pub fn refresh_trust(&mut self) -> Result<()> {
        self.trust.refresh_from_store(&self.store)?;
        persist_trusted_patterns_to_path(
            &self.config.storage.trusted_patterns_path,
            self.trust.trusted(),
        )
    }

    /// Persist the state that lives outside sqlite.
    pub fn flush(&self) -> Result<()> {
        persist_weights_to_path(&self.config.storage.weights_path, &self.weights)?;
        persist_trusted_patterns_to_path(
            &self.config.storage.trusted_patterns_path,
            self.trust.trusted(),
        )
    }
}
