use crate::{
    cache::DistinctValueCache,
    config::SearchConfig,
    predicates::{Predicate, PredicateId},
    preview::PreviewScheduler,
    store::PredicateStore,
};

/// The advanced search panel of one profile.
///
/// The preview and the distinct-value cache belong to the panel and are dropped with it.
#[derive(Debug)]
pub struct AdvancedSearchState {
    pub(crate) enabled: bool,
    pub(crate) store: PredicateStore,
    pub(crate) preview: PreviewScheduler,
    pub(crate) cache: DistinctValueCache,
}

impl AdvancedSearchState {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            enabled: false,
            store: PredicateStore::new(),
            preview: PreviewScheduler::from_config(config),
            cache: DistinctValueCache::new(),
        }
    }

    /// When disabled, no predicate is applied.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn predicates(&self) -> &[Predicate] {
        self.store.predicates()
    }

    #[inline]
    pub fn store(&self) -> &PredicateStore {
        &self.store
    }

    #[inline]
    pub fn preview_id(&self) -> Option<&PredicateId> {
        self.preview.active()
    }

    /// Empty the panel and switch it back on.
    pub(crate) fn reset(&mut self) {
        self.enabled = true;
        self.store.clear_all();
        self.preview.clear();
        self.cache.clear();
    }
}
