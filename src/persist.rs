use crate::{
    config::SearchConfig,
    debounce::Debouncer,
    error::PersistenceError,
    predicates::{Operator, Predicate, PredicateId},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// A string key/value store living at least as long as the session, e.g. session storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;

    /// Every key starting with `prefix`. Stores that cannot enumerate return nothing.
    fn keys(&self, _prefix: &str) -> Result<Vec<String>, PersistenceError> {
        Ok(vec![])
    }
}

/// An in-memory [`KeyValueStore`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, PersistenceError> {
        Ok(self
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// The persisted form of the predicates of one profile.
///
/// ```json
/// { "predicates": [{ "id": "adv-1", "fieldKey": "ship", "operator": "in", "values": ["ICON"], "complete": true }] }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub predicates: Vec<StoredPredicate>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPredicate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub field_key: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub complete: bool,
}

// Entries are decoded one by one so a single malformed entry does not lose the others.
#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    predicates: Option<Vec<serde_json::Value>>,
}

impl Snapshot {
    /// Snapshot the predicates that have a field and an operator.
    pub fn capture(predicates: &[Predicate]) -> Self {
        let predicates = predicates
            .iter()
            .filter(|predicate| !predicate.field_key.is_empty())
            .filter_map(|predicate| {
                predicate.operator.map(|operator| StoredPredicate {
                    id: Some(predicate.id.as_str().to_owned()),
                    field_key: Some(predicate.field_key.clone()),
                    operator: Some(operator.as_str().to_owned()),
                    values: predicate.values.clone(),
                    complete: predicate.complete,
                })
            })
            .collect();
        Self { predicates }
    }

    /// Decode a stored snapshot, skipping entries that cannot be decoded.
    pub fn parse(raw: &str) -> Result<Self, PersistenceError> {
        let raw: RawSnapshot = serde_json::from_str(raw)?;
        let predicates = raw
            .predicates
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();
        Ok(Self { predicates })
    }

    /// Turn the stored entries back into predicates.
    ///
    /// Entries without a field or an operator are dropped, legacy operators are coerced and
    /// values are normalized with `normalize(raw, field_key)`.
    pub fn into_predicates<N>(self, normalize: N) -> Vec<Predicate>
    where
        N: Fn(&str, &str) -> Option<String>,
    {
        self.predicates
            .into_iter()
            .enumerate()
            .filter_map(|(index, stored)| {
                let field_key = stored.field_key.filter(|key| !key.is_empty())?;
                let raw_operator = stored.operator?;
                let Some(operator) = Operator::coerce_legacy(&raw_operator) else {
                    debug!(operator = %raw_operator, %field_key, "dropping predicate with unsupported operator");
                    return None;
                };
                let id = stored
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("restored-{index}"));
                let mut predicate = Predicate::draft(PredicateId::new(id), &field_key);
                predicate.operator = Some(operator);
                predicate.replace_values(
                    stored
                        .values
                        .iter()
                        .filter_map(|value| normalize(value, &field_key)),
                );
                predicate.complete = stored.complete && !predicate.values.is_empty();
                Some(predicate)
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyRestored,
    Disabled,
    NoSnapshot,
    Unreadable,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RestoreOutcome {
    Restored(Vec<Predicate>),
    Skipped(SkipReason),
}

/// Saves and restores the predicates of each profile.
///
/// Writes are debounced through a single pending slot; restores happen at most once per profile
/// for the lifetime of the gateway.
#[derive(Debug)]
pub struct PersistenceGateway<S> {
    store: S,
    prefix: String,
    default_profile: String,
    delay: Duration,
    restored: HashSet<String>,
    writes: Debouncer<String>,
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    pub fn new(store: S, config: &SearchConfig) -> Self {
        Self {
            store,
            prefix: config.storage_prefix.clone(),
            default_profile: config.default_profile.clone(),
            delay: config.persist_delay(),
            restored: HashSet::new(),
            writes: Debouncer::new(),
        }
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn storage_key(&self, profile: &str) -> String {
        let profile = if profile.trim().is_empty() {
            self.default_profile.as_str()
        } else {
            profile
        };
        format!("{}::{profile}", self.prefix)
    }

    /// Write the snapshot of `predicates` now. Failures are logged and otherwise ignored.
    pub fn persist(&mut self, profile: &str, predicates: &[Predicate]) -> bool {
        let key = self.storage_key(profile);
        let written = serde_json::to_string(&Snapshot::capture(predicates))
            .map_err(PersistenceError::from)
            .and_then(|payload| self.store.set(&key, &payload));
        match written {
            Ok(()) => {
                debug!(%key, "persisted predicates");
                true
            }
            Err(error) => {
                warn!(%error, %key, "failed to persist predicates");
                false
            }
        }
    }

    /// Ask for the predicates of `profile` to be written once the delay has elapsed.
    ///
    /// A pending write for another profile is superseded; its profile is returned so that the
    /// caller can write it immediately instead of losing it.
    pub fn request_persist(&mut self, profile: &str, now: Instant) -> Option<String> {
        self.writes
            .schedule(now, self.delay, profile.to_owned())
            .filter(|previous| previous != profile)
    }

    /// The profile whose pending write is due, if any.
    #[inline]
    pub fn due_write(&mut self, now: Instant) -> Option<String> {
        self.writes.poll(now)
    }

    #[inline]
    pub fn next_write(&self) -> Option<Instant> {
        self.writes.due()
    }

    /// Drop the pending write of `profile`, if any.
    pub fn cancel_write(&mut self, profile: &str) {
        if self.writes.pending().is_some_and(|pending| pending == profile) {
            self.writes.cancel();
        }
    }

    /// Delete the snapshot of `profile`.
    pub fn forget(&mut self, profile: &str) {
        self.cancel_write(profile);
        let key = self.storage_key(profile);
        if let Err(error) = self.store.remove(&key) {
            warn!(%error, %key, "failed to delete persisted predicates");
        }
    }

    #[inline]
    pub fn was_restored(&self, profile: &str) -> bool {
        self.restored.contains(profile)
    }

    /// Read back the predicates of `profile`, once per profile.
    ///
    /// Nothing is recorded while the panel is disabled, so enabling it later still restores.
    pub fn restore<N>(&mut self, profile: &str, enabled: bool, normalize: N) -> RestoreOutcome
    where
        N: Fn(&str, &str) -> Option<String>,
    {
        if !enabled {
            return RestoreOutcome::Skipped(SkipReason::Disabled);
        }
        if !self.restored.insert(profile.to_owned()) {
            return RestoreOutcome::Skipped(SkipReason::AlreadyRestored);
        }

        let key = self.storage_key(profile);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return RestoreOutcome::Skipped(SkipReason::NoSnapshot),
            Err(error) => {
                warn!(%error, %key, "failed to read persisted predicates");
                return RestoreOutcome::Skipped(SkipReason::Unreadable);
            }
        };
        match Snapshot::parse(&raw) {
            Ok(snapshot) => {
                let predicates = snapshot.into_predicates(normalize);
                debug!(%key, count = predicates.len(), "restored predicates");
                RestoreOutcome::Restored(predicates)
            }
            Err(error) => {
                warn!(%error, %key, "ignoring unreadable snapshot");
                RestoreOutcome::Skipped(SkipReason::Unreadable)
            }
        }
    }
}
