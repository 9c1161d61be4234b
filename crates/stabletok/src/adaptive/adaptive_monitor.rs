//! # Adaptive Monitor
//!
//! Watches live segmentation for coverage gaps, and proposes new tokens
//! through a [`TransactionalUpdater`] when the unknown rate stays high.

use core::{ops::Range, time::Duration};
use std::{collections::BTreeMap, sync::Arc};

use parking_lot::Mutex;
use ringbuffer::{AllocRingBuffer, RingBuffer};
use serde::{Deserialize, Serialize};

use crate::{
    adaptive::{MonitorOptions, RankedCandidate, candidates},
    errors::STResult,
    store::{VocabSnapshot, VocabStore},
    support::{Clock, SystemClock},
    types::{STHashMap, TokenType, hash_map_new},
    updater::TransactionalUpdater,
};

/// The outcome of one adaptation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationSummary {
    /// The stage submitted to the updater.
    pub stage_id: String,

    /// Candidates submitted.
    pub candidates_submitted: usize,

    /// Tokens merged into the store; 0 when rejected.
    pub tokens_added: usize,

    /// Was the update committed?
    pub accepted: bool,

    /// When the event completed, in unix millis.
    pub timestamp: u64,
}

/// A copy of the monitor counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorStats {
    /// Tokens observed.
    pub total_tokens_seen: u64,

    /// Unknown tokens observed.
    pub total_unknown_seen: u64,

    /// Adaptation events run.
    pub adaptation_events: u64,

    /// Batches currently in the window.
    pub window_len: usize,

    /// Mean unknown rate over the window; 0 when empty.
    pub window_mean: f64,

    /// Distinct pending candidates.
    pub candidate_count: usize,

    /// The last adaptation (or monitor creation), in unix millis.
    pub last_adaptation: u64,
}

struct AdaptationState {
    window: AllocRingBuffer<f64>,
    candidates: STHashMap<String, u64>,
    recent_texts: AllocRingBuffer<String>,
    total_tokens_seen: u64,
    total_unknown_seen: u64,
    adaptation_events: u64,
    last_adaptation: Duration,
}

impl AdaptationState {
    fn window_mean(&self) -> f64 {
        if self.window.is_empty() {
            0.0
        } else {
            self.window.iter().sum::<f64>() / self.window.len() as f64
        }
    }
}

/// Online vocabulary-coverage monitor.
///
/// All state is guarded by one lock; segmentation itself never takes it.
pub struct AdaptiveMonitor<T: TokenType> {
    store: Arc<VocabStore<T>>,
    options: MonitorOptions,
    clock: Arc<dyn Clock>,
    state: Mutex<AdaptationState>,
}

impl<T: TokenType> core::fmt::Debug for AdaptiveMonitor<T> {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        f.debug_struct("AdaptiveMonitor")
            .field("options", &self.options)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<T: TokenType> AdaptiveMonitor<T> {
    /// Create a monitor using the system clock.
    pub fn new(
        store: Arc<VocabStore<T>>,
        options: MonitorOptions,
    ) -> STResult<Self> {
        Self::with_clock(store, options, Arc::new(SystemClock))
    }

    /// Create a monitor; the cooldown clock starts now.
    pub fn with_clock(
        store: Arc<VocabStore<T>>,
        options: MonitorOptions,
        clock: Arc<dyn Clock>,
    ) -> STResult<Self> {
        options.validate()?;
        let state = AdaptationState {
            window: AllocRingBuffer::new(options.window_capacity),
            candidates: hash_map_new(),
            recent_texts: AllocRingBuffer::new(options.recent_text_capacity),
            total_tokens_seen: 0,
            total_unknown_seen: 0,
            adaptation_events: 0,
            last_adaptation: clock.now(),
        };
        Ok(Self {
            store,
            options,
            clock,
            state: Mutex::new(state),
        })
    }

    /// The monitor options.
    pub fn options(&self) -> &MonitorOptions {
        &self.options
    }

    /// The observed store.
    pub fn store(&self) -> &Arc<VocabStore<T>> {
        &self.store
    }

    /// Record the segmentation of `text`.
    ///
    /// `tokens` must be the current store's segmentation of `text`; unknown
    /// positions are recovered from token lengths.
    pub fn observe(
        &self,
        text: &str,
        tokens: &[T],
    ) {
        let snapshot = self.store.snapshot();
        let spans = token_spans(&snapshot, text.as_bytes(), tokens);
        self.observe_spans(&snapshot, text, &spans);
    }

    fn observe_spans(
        &self,
        snapshot: &VocabSnapshot<T>,
        text: &str,
        spans: &[(T, Range<usize>)],
    ) {
        let unk = snapshot.unk_id();
        let total = spans.len();
        let unknown = spans.iter().filter(|(t, _)| *t == unk).count();
        let rate = if total == 0 {
            0.0
        } else {
            unknown as f64 / total as f64
        };

        let mut state = self.state.lock();
        state.total_tokens_seen += total as u64;
        state.total_unknown_seen += unknown as u64;
        let _ = state.window.enqueue(rate);
        let _ = state.recent_texts.enqueue(text.to_string());

        if unknown > 0 {
            let max_len = snapshot.max_lookahead();
            for span in candidates::unknown_spans(text, spans, unk, max_len) {
                *state.candidates.entry(text[span].to_string()).or_default() += 1;
            }
        }
    }

    /// Is adaptation due?
    ///
    /// Requires a full window, a mean window rate at or above the threshold,
    /// and an elapsed cooldown.
    pub fn should_trigger_adaptation(&self) -> bool {
        let state = self.state.lock();
        self.is_due(&state)
    }

    fn is_due(
        &self,
        state: &AdaptationState,
    ) -> bool {
        if !state.window.is_full() {
            return false;
        }
        if state.window_mean() < self.options.threshold {
            return false;
        }
        self.clock.now().saturating_sub(state.last_adaptation) >= self.options.cooldown()
    }

    /// Rank the pending candidates by utility.
    pub fn rank_candidates(&self) -> Vec<RankedCandidate> {
        let state = self.state.lock();
        self.rank(&state)
    }

    fn rank(
        &self,
        state: &AdaptationState,
    ) -> Vec<RankedCandidate> {
        candidates::rank(
            state.candidates.iter(),
            self.options.min_candidate_count,
            self.store.size(),
            &self.options.weights,
        )
    }

    /// Submit the top candidates as a staged update.
    ///
    /// The update is validated against the recent-text sample, then
    /// committed, or rolled back if rejected. Either way the candidate table
    /// is cleared and the cooldown restarts.
    ///
    /// On error, the stage is rolled back and the monitor state is unchanged.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn trigger_adaptation(
        &self,
        updater: &TransactionalUpdater<T>,
    ) -> STResult<AdaptationSummary> {
        let mut state = self.state.lock();
        self.adapt_locked(&mut state, updater)
    }

    fn adapt_locked(
        &self,
        state: &mut AdaptationState,
        updater: &TransactionalUpdater<T>,
    ) -> STResult<AdaptationSummary> {
        let selected: Vec<String> = self
            .rank(state)
            .into_iter()
            .take(self.options.top_k)
            .map(|c| c.text)
            .collect();
        let sample: Vec<String> = state.recent_texts.iter().cloned().collect();

        let mut metadata = BTreeMap::new();
        metadata.insert("source".to_string(), "adaptive_monitor".to_string());
        metadata.insert(
            "window_mean".to_string(),
            format!("{:.4}", state.window_mean()),
        );
        let candidates_submitted = selected.len();
        let stage_id = updater.stage(selected, metadata);

        let accepted = match updater
            .validate(&stage_id, &sample)
            .and_then(|_| updater.commit(&stage_id))
        {
            Ok(accepted) => accepted,
            Err(err) => {
                updater.rollback(&stage_id);
                return Err(err);
            }
        };
        if !accepted {
            updater.rollback(&stage_id);
        }
        let tokens_added = updater
            .commit_record(&stage_id)
            .map(|r| r.tokens_added)
            .unwrap_or(0);

        let now = self.clock.now();
        state.candidates.clear();
        state.last_adaptation = now;
        state.adaptation_events += 1;

        log::info!(
            "adaptation {stage_id}: {candidates_submitted} candidates, {tokens_added} added, accepted={accepted}"
        );
        Ok(AdaptationSummary {
            stage_id,
            candidates_submitted,
            tokens_added,
            accepted,
            timestamp: now.as_millis() as u64,
        })
    }

    /// Segment text, observe the result, and adapt when due.
    ///
    /// The due check and the adaptation run under one lock, so concurrent
    /// callers run at most one adaptation per cooldown.
    pub fn tokenize_with_adaptation(
        &self,
        text: &str,
        updater: &TransactionalUpdater<T>,
    ) -> STResult<(Vec<T>, Option<AdaptationSummary>)> {
        let snapshot = self.store.snapshot();
        let spans = snapshot.segment_spans(text.as_bytes());
        self.observe_spans(&snapshot, text, &spans);
        let tokens = spans.into_iter().map(|(t, _)| t).collect();

        let mut state = self.state.lock();
        let summary = if self.is_due(&state) {
            Some(self.adapt_locked(&mut state, updater)?)
        } else {
            None
        };
        Ok((tokens, summary))
    }

    /// A copy of the counters.
    pub fn stats(&self) -> MonitorStats {
        let state = self.state.lock();
        MonitorStats {
            total_tokens_seen: state.total_tokens_seen,
            total_unknown_seen: state.total_unknown_seen,
            adaptation_events: state.adaptation_events,
            window_len: state.window.len(),
            window_mean: state.window_mean(),
            candidate_count: state.candidates.len(),
            last_adaptation: state.last_adaptation.as_millis() as u64,
        }
    }
}

/// Recover source ranges from a token sequence.
///
/// An unknown id covers one byte, unless the placeholder text itself
/// is a vocabulary token and matched at that position.
fn token_spans<T: TokenType>(
    snapshot: &VocabSnapshot<T>,
    text: &[u8],
    tokens: &[T],
) -> Vec<(T, Range<usize>)> {
    let unk = snapshot.unk_id();
    let unk_is_token = snapshot.contains(snapshot.unk_text());

    let mut spans = Vec::with_capacity(tokens.len());
    let mut pos = 0;
    for &token in tokens {
        let len = if token == unk {
            if unk_is_token && text[pos.min(text.len())..].starts_with(snapshot.unk_text()) {
                snapshot.unk_text().len()
            } else {
                1
            }
        } else {
            snapshot.token_text(token).len()
        };
        let end = (pos + len).min(text.len());
        spans.push((token, pos..end));
        pos = end;
    }
    spans
}
