use crate::{
    columns::FieldResolver,
    config::SearchConfig,
    error::PersistenceError,
    persist::KeyValueStore,
};
use itertools::Itertools;
use tracing::{debug, warn};

/// Groups of rows hidden by the user, shared by every profile.
///
/// A group is a `"Label: Value"` path: rows whose `Label` column holds `Value` are hidden. Both
/// halves are compared case-insensitively.
#[derive(Clone, Debug)]
pub struct HiddenGroups {
    key: String,
    legacy_prefix: String,
    paths: Vec<String>,
    loaded: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct Group {
    label: String,
    value: String,
}

impl Group {
    fn parse(path: &str) -> Option<Self> {
        let (label, value) = path.split_once(':')?;
        let (label, value) = (label.trim(), value.trim());
        if label.is_empty() || value.is_empty() {
            return None;
        }
        Some(Self {
            label: label.to_lowercase(),
            value: value.to_lowercase(),
        })
    }
}

impl HiddenGroups {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            key: config.hidden_groups_key.clone(),
            legacy_prefix: config.legacy_hidden_groups_prefix.clone(),
            paths: vec![],
            loaded: false,
        }
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[inline]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// The paths in display order.
    pub fn sorted(&self) -> Vec<&str> {
        self.paths
            .iter()
            .map(String::as_str)
            .sorted_by_cached_key(|path| path.to_lowercase())
            .collect()
    }

    /// Read the global list, merging the legacy per-profile lists when it was never written.
    ///
    /// Only the first call reads the store.
    pub fn load<S: KeyValueStore>(&mut self, store: &mut S) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        match store.get(&self.key) {
            Ok(Some(raw)) => self.paths = parse_paths(&raw, &self.key),
            Ok(None) => self.migrate(store),
            Err(error) => warn!(%error, key = %self.key, "failed to read hidden groups"),
        }
    }

    /// Hide a group; returns whether it was not hidden yet.
    pub fn add<S: KeyValueStore>(&mut self, store: &mut S, path: &str) -> bool {
        self.load(store);
        let path = path.trim();
        if path.is_empty() || self.paths.iter().any(|hidden| hidden == path) {
            return false;
        }
        self.paths.push(path.to_owned());
        self.save(store);
        true
    }

    /// Show a group again; returns whether it was hidden.
    pub fn remove<S: KeyValueStore>(&mut self, store: &mut S, path: &str) -> bool {
        self.load(store);
        let path = path.trim();
        let before = self.paths.len();
        self.paths.retain(|hidden| hidden != path);
        if before == self.paths.len() {
            return false;
        }
        self.save(store);
        true
    }

    /// Drop the hidden rows from `rows`, keeping the order of the others.
    pub fn apply<'a, R, F: FieldResolver<R>>(&self, rows: Vec<&'a R>, resolver: &F) -> Vec<&'a R> {
        let groups = self.resolve(resolver);
        if groups.is_empty() {
            return rows;
        }
        rows.into_iter()
            .filter(|row| !groups.iter().any(|(key, value)| is_in_group(*row, key, value, resolver)))
            .collect()
    }

    // Paths naming a label no column carries are ignored.
    fn resolve<R, F: FieldResolver<R>>(&self, resolver: &F) -> Vec<(String, String)> {
        let columns = resolver.columns();
        self.paths
            .iter()
            .filter_map(|path| Group::parse(path))
            .filter_map(|group| {
                columns
                    .iter()
                    .find(|column| column.label.trim().to_lowercase() == group.label)
                    .map(|column| (column.key.clone(), group.value))
            })
            .collect()
    }

    fn migrate<S: KeyValueStore>(&mut self, store: &mut S) {
        let keys = match store.keys(&self.legacy_prefix) {
            Ok(keys) => keys,
            Err(error) => {
                warn!(%error, prefix = %self.legacy_prefix, "failed to list legacy hidden groups");
                return;
            }
        };
        let merged = keys
            .iter()
            .filter(|key| **key != self.key)
            .filter_map(|key| match store.get(key) {
                Ok(raw) => raw.map(|raw| parse_paths(&raw, key)),
                Err(error) => {
                    warn!(%error, %key, "failed to read legacy hidden groups");
                    None
                }
            })
            .flatten()
            .unique()
            .collect_vec();
        if merged.is_empty() {
            return;
        }
        debug!(count = merged.len(), "migrated legacy hidden groups");
        self.paths = merged;
        self.save(store);
    }

    fn save<S: KeyValueStore>(&self, store: &mut S) {
        let written = serde_json::to_string(&self.paths)
            .map_err(PersistenceError::from)
            .and_then(|payload| store.set(&self.key, &payload));
        if let Err(error) = written {
            warn!(%error, key = %self.key, "failed to persist hidden groups");
        }
    }
}

fn parse_paths(raw: &str, key: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(paths) => paths
            .into_iter()
            .map(|path| path.trim().to_owned())
            .filter(|path| !path.is_empty())
            .unique()
            .collect(),
        Err(error) => {
            warn!(%error, key, "ignoring unreadable hidden groups");
            vec![]
        }
    }
}

fn is_in_group<R, F: FieldResolver<R>>(row: &R, key: &str, value: &str, resolver: &F) -> bool {
    matches!(
        resolver.resolve(row, key),
        Ok(Some(raw)) if raw.trim().to_lowercase() == value
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        persist::MemoryStore,
        test_utils::{offers, OfferResolver},
    };

    const GLOBAL_KEY: &str = "goboHiddenGroups-global";
    const ROWS: [(&str, &str); 4] = [
        ("Icon", "Suite"),
        ("Wonder", "Interior"),
        ("icon", "Balcony"),
        ("Star", "Suite"),
    ];

    fn hidden_groups() -> HiddenGroups {
        HiddenGroups::new(&SearchConfig::default())
    }

    fn ships<'a>(rows: &[&'a crate::test_utils::Offer]) -> Vec<&'a str> {
        rows.iter().filter_map(|row| row.ship.as_deref()).collect()
    }

    #[test]
    fn can_hide_the_rows_of_a_group() {
        let dataset = offers(&ROWS);
        let mut store = MemoryStore::new();
        let mut groups = hidden_groups();
        groups.add(&mut store, "Ship: ICON");

        let visible = groups.apply(dataset.iter().collect(), &OfferResolver::new());

        assert_eq!(vec!["Wonder", "Star"], ships(&visible));
    }

    #[test]
    fn match_labels_regardless_of_case() {
        let dataset = offers(&ROWS);
        let mut store = MemoryStore::new();
        let mut groups = hidden_groups();
        groups.add(&mut store, "category : suite");

        let visible = groups.apply(dataset.iter().collect(), &OfferResolver::new());

        assert_eq!(vec!["Wonder", "icon"], ships(&visible));
    }

    #[test]
    fn ignore_malformed_paths_and_unknown_labels() {
        let dataset = offers(&ROWS);
        let mut store = MemoryStore::new();
        let mut groups = hidden_groups();
        groups.add(&mut store, "Ship");
        groups.add(&mut store, "Ship:");
        groups.add(&mut store, "Deck: 7");

        let visible = groups.apply(dataset.iter().collect(), &OfferResolver::new());

        assert_eq!(4, visible.len());
    }

    #[test]
    fn persist_groups_under_the_global_key() {
        let mut store = MemoryStore::new();
        let mut groups = hidden_groups();

        assert!(groups.add(&mut store, "Ship: Icon"));
        assert!(!groups.add(&mut store, " Ship: Icon "));
        assert!(groups.add(&mut store, "Category: Suite"));

        assert_eq!(
            Some(r#"["Ship: Icon","Category: Suite"]"#.to_owned()),
            store.get(GLOBAL_KEY).unwrap()
        );
    }

    #[test]
    fn can_show_a_group_again() {
        let mut store = MemoryStore::new();
        let mut groups = hidden_groups();
        groups.add(&mut store, "Ship: Icon");

        assert!(groups.remove(&mut store, "Ship: Icon"));
        assert!(!groups.remove(&mut store, "Ship: Icon"));
        assert_eq!(Some("[]".to_owned()), store.get(GLOBAL_KEY).unwrap());
    }

    #[test]
    fn sort_groups_regardless_of_case() {
        let mut store = MemoryStore::new();
        let mut groups = hidden_groups();
        for path in ["ship: Wonder", "Category: Suite", "Ship: Icon"] {
            groups.add(&mut store, path);
        }

        assert_eq!(vec!["Category: Suite", "Ship: Icon", "ship: Wonder"], groups.sorted());
    }

    #[test]
    fn merge_legacy_groups_on_first_load() {
        let mut store = MemoryStore::new();
        store.set("goboHiddenGroups-gobo-1", r#"["Ship: Icon", "Ship: Star"]"#).unwrap();
        store.set("goboHiddenGroups-gobo-2", r#"["Ship: Star", "Category: Suite"]"#).unwrap();
        let mut groups = hidden_groups();

        groups.load(&mut store);

        assert_eq!(vec!["Ship: Icon", "Ship: Star", "Category: Suite"], groups.paths());
        assert_eq!(
            Some(r#"["Ship: Icon","Ship: Star","Category: Suite"]"#.to_owned()),
            store.get(GLOBAL_KEY).unwrap()
        );
    }

    #[test]
    fn prefer_the_global_list_over_legacy_ones() {
        let mut store = MemoryStore::new();
        store.set(GLOBAL_KEY, r#"["Ship: Wonder"]"#).unwrap();
        store.set("goboHiddenGroups-gobo-1", r#"["Ship: Icon"]"#).unwrap();
        let mut groups = hidden_groups();

        groups.load(&mut store);

        assert_eq!(vec!["Ship: Wonder"], groups.paths());
    }

    #[test]
    fn degrade_to_no_groups_when_the_list_is_unreadable() {
        let mut store = MemoryStore::new();
        store.set(GLOBAL_KEY, "{").unwrap();
        let mut groups = hidden_groups();

        groups.load(&mut store);

        assert!(groups.is_loaded());
        assert!(groups.paths().is_empty());
    }
}
