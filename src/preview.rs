use crate::{
    config::SearchConfig,
    debounce::{deadline, Debouncer},
    predicates::{Predicate, PredicateId},
    store::PredicateStore,
};
use std::time::{Duration, Instant};
use tracing::debug;

/// How quickly a preview should follow the action that requested it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewSpeed {
    /// Discrete actions such as toggling a value; the delay only coalesces double events.
    Fast,
    /// Typing, which produces bursts of events.
    Slow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// The panel is disabled or the predicate is already complete.
    Ignored,
    /// The predicate cannot be previewed; the preview was dropped and the view should be
    /// re-evaluated right away.
    Cleared,
    /// A preview evaluation will be due at the given instant.
    Scheduled(Instant),
}

/// Debounces the live evaluation of the draft being edited.
///
/// Only one predicate can be previewed at a time and only one timer can be pending.
#[derive(Debug, Clone)]
pub struct PreviewScheduler {
    active: Option<PredicateId>,
    timer: Debouncer<PredicateId>,
    fast: Duration,
    slow: Duration,
}

impl PreviewScheduler {
    pub fn new(fast: Duration, slow: Duration) -> Self {
        Self {
            active: None,
            timer: Debouncer::new(),
            fast,
            slow,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.preview_fast_delay(), config.preview_slow_delay())
    }

    /// The predicate currently eligible for live evaluation.
    #[inline]
    pub fn active(&self) -> Option<&PredicateId> {
        self.active.as_ref()
    }

    #[inline]
    pub fn due(&self) -> Option<Instant> {
        self.timer.due()
    }

    pub fn schedule(
        &mut self,
        enabled: bool,
        predicate: &Predicate,
        speed: PreviewSpeed,
        now: Instant,
    ) -> PreviewOutcome {
        if !enabled || predicate.is_complete() {
            return PreviewOutcome::Ignored;
        }
        if !predicate.is_evaluable() {
            self.clear();
            return PreviewOutcome::Cleared;
        }

        let delay = match speed {
            PreviewSpeed::Fast => self.fast,
            PreviewSpeed::Slow => self.slow,
        };
        self.active = Some(predicate.id().clone());
        self.timer.schedule(now, delay, predicate.id().clone());
        PreviewOutcome::Scheduled(deadline(now, delay))
    }

    /// Drop the preview and its pending timer.
    pub fn clear(&mut self) {
        self.active = None;
        self.timer.cancel();
    }

    /// Drop the preview when it targets `id`; returns whether it did.
    pub fn clear_if(&mut self, id: &PredicateId) -> bool {
        if self.active.as_ref() == Some(id) {
            self.clear();
            true
        } else {
            false
        }
    }

    /// Fire the pending timer when it is due.
    ///
    /// Returns the previewed predicate when the view should be re-evaluated, i.e. when it is
    /// still the active preview and still a draft.
    pub fn fire(&mut self, now: Instant, store: &PredicateStore) -> Option<PredicateId> {
        let id = self.timer.poll(now)?;
        let still_draft = store
            .get(&id)
            .is_some_and(|predicate| !predicate.is_complete());
        if !still_draft || self.active.as_ref() != Some(&id) {
            debug!(%id, "stale preview timer");
            return None;
        }
        Some(id)
    }
}
