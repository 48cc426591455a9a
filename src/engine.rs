use crate::{
    columns::{valid_keys, FieldResolver},
    config::SearchConfig,
    error::SearchError,
    evaluation::{EvaluationOptions, FilterEvaluator},
    hidden::HiddenGroups,
    persist::{KeyValueStore, PersistenceGateway, RestoreOutcome},
    predicates::{Operator, Predicate, PredicateId},
    preview::{PreviewOutcome, PreviewSpeed},
    state::AdvancedSearchState,
};
use itertools::Itertools;
use std::{collections::HashMap, marker::PhantomData, sync::Arc, time::Instant};
use tracing::debug;

/// What happened while firing due timers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The previewed draft is due for live evaluation; the host should call
    /// [`AdvancedSearch::evaluate`] again.
    PreviewReady(PredicateId),
    /// The predicates of `profile` were written to storage.
    Persisted { profile: String },
}

/// The advanced search panel as seen by the host.
///
/// Holds one [`AdvancedSearchState`] per profile, of which only the selected one is active.
/// Timers are never driven by a clock: operations that can start one take `now`, and the host
/// calls [`AdvancedSearch::tick`] to fire those that are due.
#[derive(Debug)]
pub struct AdvancedSearch<R, F, S> {
    resolver: F,
    persistence: PersistenceGateway<S>,
    hidden: HiddenGroups,
    profile: String,
    active: AdvancedSearchState,
    parked: HashMap<String, AdvancedSearchState>,
    config: SearchConfig,
    rows: PhantomData<fn(&R)>,
}

impl<R, F: FieldResolver<R>, S: KeyValueStore> AdvancedSearch<R, F, S> {
    pub fn new(resolver: F, store: S, config: SearchConfig) -> Self {
        Self {
            resolver,
            persistence: PersistenceGateway::new(store, &config),
            hidden: HiddenGroups::new(&config),
            profile: config.default_profile.clone(),
            active: AdvancedSearchState::new(&config),
            parked: HashMap::new(),
            config,
            rows: PhantomData,
        }
    }

    #[inline]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    #[inline]
    pub fn resolver(&self) -> &F {
        &self.resolver
    }

    #[inline]
    pub fn storage(&self) -> &S {
        self.persistence.store()
    }

    #[inline]
    pub fn storage_mut(&mut self) -> &mut S {
        self.persistence.store_mut()
    }

    #[inline]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    #[inline]
    pub fn state(&self) -> &AdvancedSearchState {
        &self.active
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.active.enabled
    }

    #[inline]
    pub fn predicates(&self) -> &[Predicate] {
        self.active.store.predicates()
    }

    #[inline]
    pub fn preview_id(&self) -> Option<&PredicateId> {
        self.active.preview.active()
    }

    #[inline]
    pub fn committed_count(&self) -> usize {
        self.active.store.committed_count()
    }

    /// Switch to the panel of `profile`, creating it on first use.
    ///
    /// The preview of the panel being left is dropped; its predicates are kept in memory.
    pub fn select_profile(&mut self, profile: Option<&str>) {
        let profile = self.config.profile_key(profile).to_owned();
        if profile == self.profile {
            return;
        }

        self.active.preview.clear();
        let next = self
            .parked
            .remove(&profile)
            .unwrap_or_else(|| AdvancedSearchState::new(&self.config));
        let previous = std::mem::replace(&mut self.active, next);
        let previous_profile = std::mem::replace(&mut self.profile, profile);
        self.parked.insert(previous_profile, previous);
        debug!(profile = %self.profile, "selected profile");
        self.restore();
    }

    /// Switch the panel on or off. Switching it on restores the persisted predicates once.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.active.enabled = enabled;
        if enabled {
            self.restore();
        } else {
            self.active.preview.clear();
        }
    }

    /// Flip the panel; returns whether it is now enabled.
    pub fn toggle(&mut self) -> bool {
        let enabled = !self.active.enabled;
        self.set_enabled(enabled);
        enabled
    }

    /// The keys of the columns that can receive a new predicate.
    pub fn filterable_fields(&self) -> Vec<String> {
        let columns = self.resolver.columns();
        valid_keys(&columns)
            .into_iter()
            .filter(|key| !self.config.is_excluded(key))
            .map(str::to_owned)
            .collect()
    }

    pub fn add_draft(&mut self, field_key: &str) -> Result<PredicateId, SearchError> {
        self.sweep();
        let columns = self.resolver.columns();
        let filterable = valid_keys(&columns)
            .into_iter()
            .filter(|key| !self.config.is_excluded(key))
            .collect_vec();
        let predicate = self.active.store.add_draft(field_key, &filterable)?;
        debug!(id = %predicate.id(), field_key, "started a draft");
        Ok(predicate.id().clone())
    }

    pub fn set_operator(
        &mut self,
        id: &PredicateId,
        operator: Operator,
        now: Instant,
    ) -> Result<(), SearchError> {
        self.sweep();
        self.active.store.set_operator(id, operator)?;
        self.preview(id, PreviewSpeed::Fast, now);
        self.request_persist(now);
        Ok(())
    }

    /// Replace the values of a predicate with the normalized `values`.
    pub fn set_values<I, V>(&mut self, id: &PredicateId, values: I, now: Instant) -> Result<(), SearchError>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        self.sweep();
        let field_key = self.field_key(id)?;
        let tokens = values
            .into_iter()
            .filter_map(|raw| self.resolver.normalize(raw.as_ref(), &field_key))
            .collect_vec();
        self.active.store.set_values(id, tokens)?;
        self.preview(id, PreviewSpeed::Slow, now);
        self.request_persist(now);
        Ok(())
    }

    /// Normalize and append one value; returns whether it was added.
    pub fn add_value(&mut self, id: &PredicateId, raw: &str, now: Instant) -> Result<bool, SearchError> {
        self.sweep();
        let field_key = self.field_key(id)?;
        let Some(token) = self.resolver.normalize(raw, &field_key) else {
            return Ok(false);
        };
        if !self.active.store.push_value(id, token)? {
            return Ok(false);
        }
        self.preview(id, PreviewSpeed::Slow, now);
        self.request_persist(now);
        Ok(true)
    }

    /// Remove one value; a complete predicate left without values goes back to being a draft.
    pub fn remove_value(&mut self, id: &PredicateId, value: &str, now: Instant) -> Result<bool, SearchError> {
        self.sweep();
        if !self.active.store.remove_value(id, value)? {
            return Ok(false);
        }
        self.preview(id, PreviewSpeed::Fast, now);
        self.request_persist(now);
        Ok(true)
    }

    pub fn commit(&mut self, id: &PredicateId, now: Instant) -> Result<(), SearchError> {
        self.sweep();
        self.active.store.commit(id)?;
        self.active.preview.clear_if(id);
        self.request_persist(now);
        Ok(())
    }

    /// Delete a predicate; a draft left behind is previewed again.
    pub fn delete(&mut self, id: &PredicateId, now: Instant) -> Result<(), SearchError> {
        self.sweep();
        self.active.store.delete(id)?;
        self.active.preview.clear_if(id);
        if let Some(draft) = self.active.store.draft().map(|draft| draft.id().clone()) {
            self.preview(&draft, PreviewSpeed::Slow, now);
        }
        self.request_persist(now);
        Ok(())
    }

    /// Drop every predicate of the profile, in memory and in storage, and switch the panel on.
    pub fn clear_all(&mut self) {
        self.active.reset();
        self.persistence.forget(&self.profile);
        debug!(profile = %self.profile, "cleared every predicate");
    }

    /// Preview a draft again without changing it, e.g. on a keystroke.
    pub fn schedule_preview(
        &mut self,
        id: &PredicateId,
        speed: PreviewSpeed,
        now: Instant,
    ) -> Result<PreviewOutcome, SearchError> {
        if self.active.store.get(id).is_none() {
            return Err(SearchError::NotFound(id.clone()));
        }
        Ok(self.preview(id, speed, now))
    }

    /// The rows of `dataset` matching the committed predicates and the previewed draft.
    pub fn evaluate<'a>(&mut self, dataset: &'a [R]) -> Vec<&'a R> {
        self.sweep();
        if !self.active.enabled {
            return dataset.iter().collect();
        }
        self.evaluator().apply(dataset, &self.resolver)
    }

    /// The visible rows: hidden groups first, then the advanced search when enabled.
    pub fn filter_offers<'a>(&mut self, dataset: &'a [R]) -> Vec<&'a R> {
        self.sweep();
        self.hidden.load(self.persistence.store_mut());
        let visible = self.hidden.apply(dataset.iter().collect(), &self.resolver);
        if !self.active.enabled {
            return visible;
        }
        let evaluator = self.evaluator();
        if evaluator.is_pass_through() {
            return visible;
        }
        visible
            .into_iter()
            .filter(|row| evaluator.matches(*row, &self.resolver))
            .collect()
    }

    /// The choices offered for `field_key`; the same list is returned while only drafts change.
    pub fn suggestions(&mut self, field_key: &str, dataset: &[R]) -> Arc<[String]> {
        self.sweep();
        self.active.cache.get_values(
            &self.profile,
            field_key,
            dataset,
            &self.active.store,
            &self.resolver,
        )
    }

    pub fn hide_group(&mut self, path: &str) -> bool {
        self.hidden.add(self.persistence.store_mut(), path)
    }

    pub fn show_group(&mut self, path: &str) -> bool {
        self.hidden.remove(self.persistence.store_mut(), path)
    }

    /// The hidden groups in display order.
    pub fn hidden_groups(&mut self) -> Vec<&str> {
        self.hidden.load(self.persistence.store_mut());
        self.hidden.sorted()
    }

    /// Fire the timers that are due at `now`.
    pub fn tick(&mut self, now: Instant) -> Vec<Event> {
        let mut events = vec![];
        if let Some(id) = self.active.preview.fire(now, &self.active.store) {
            debug!(%id, "preview due");
            events.push(Event::PreviewReady(id));
        }
        if let Some(profile) = self.persistence.due_write(now) {
            if self.write(&profile) {
                events.push(Event::Persisted { profile });
            }
        }
        events
    }

    /// When [`AdvancedSearch::tick`] has something to do next.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.active.preview.due(), self.persistence.next_write()]
            .into_iter()
            .flatten()
            .min()
    }

    fn evaluator(&self) -> FilterEvaluator<'_> {
        FilterEvaluator::new(
            self.active.store.predicates(),
            EvaluationOptions::with_preview(self.active.preview.active()),
        )
    }

    fn field_key(&self, id: &PredicateId) -> Result<String, SearchError> {
        self.active
            .store
            .get(id)
            .map(|predicate| predicate.field_key().to_owned())
            .ok_or_else(|| SearchError::NotFound(id.clone()))
    }

    fn preview(&mut self, id: &PredicateId, speed: PreviewSpeed, now: Instant) -> PreviewOutcome {
        let state = &mut self.active;
        match state.store.get(id) {
            Some(predicate) => state.preview.schedule(state.enabled, predicate, speed, now),
            None => PreviewOutcome::Ignored,
        }
    }

    // Excluded columns are displayed but can never carry a predicate, restored ones included.
    fn sweep(&mut self) {
        let columns = self.resolver.columns();
        let filterable = valid_keys(&columns)
            .into_iter()
            .filter(|key| !self.config.is_excluded(key))
            .collect_vec();
        let removed = self.active.store.sweep_invalid_fields(&filterable);
        for id in &removed {
            self.active.preview.clear_if(id);
        }
    }

    fn restore(&mut self) {
        let resolver = &self.resolver;
        let outcome = self.persistence.restore(&self.profile, self.active.enabled, |raw, field_key| {
            resolver.normalize(raw, field_key)
        });
        if let RestoreOutcome::Restored(predicates) = outcome {
            self.active.store.replace_all(predicates);
            self.active.preview.clear();
            self.sweep();
        }
    }

    fn request_persist(&mut self, now: Instant) {
        if let Some(previous) = self.persistence.request_persist(&self.profile, now) {
            self.write(&previous);
        }
    }

    fn write(&mut self, profile: &str) -> bool {
        let predicates = if profile == self.profile {
            self.active.store.predicates()
        } else {
            self.parked
                .get(profile)
                .map(|state| state.store.predicates())
                .unwrap_or_default()
        };
        self.persistence.persist(profile, predicates)
    }
}
