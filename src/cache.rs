use crate::{
    columns::FieldResolver,
    evaluation::{EvaluationOptions, FilterEvaluator},
    store::PredicateStore,
};
use itertools::Itertools;
use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};
use tracing::{debug, trace};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    profile: String,
    field_key: String,
    dataset_len: usize,
    signature: String,
}

/// Memoized distinct values of a column, used to populate `in`/`not in` choices.
///
/// Entries are keyed by profile, column, dataset size and the signature of the committed
/// predicates; a draft being edited never changes the key, so the returned lists stay the same
/// (pointer-equal) while the user types.
#[derive(Debug, Default)]
pub struct DistinctValueCache {
    entries: HashMap<CacheKey, Arc<[String]>>,
}

impl DistinctValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sorted distinct tokens of `field_key`.
    ///
    /// Values are drawn from the rows matching the committed predicates; when those exclude every
    /// row, the whole dataset is used instead.
    pub fn get_values<R, F: FieldResolver<R>>(
        &mut self,
        profile: &str,
        field_key: &str,
        dataset: &[R],
        store: &PredicateStore,
        resolver: &F,
    ) -> Arc<[String]> {
        let key = CacheKey {
            profile: profile.to_owned(),
            field_key: field_key.to_owned(),
            dataset_len: dataset.len(),
            signature: store.committed_signature(),
        };
        if let Some(values) = self.entries.get(&key) {
            return Arc::clone(values);
        }

        let evaluator = FilterEvaluator::new(store.predicates(), EvaluationOptions::committed_only());
        let mut source = evaluator.apply(dataset, resolver);
        if source.is_empty() {
            source = dataset.iter().collect();
        }

        let mut distinct = BTreeSet::new();
        for row in source {
            match resolver.token(row, field_key) {
                Ok(Some(token)) => {
                    distinct.insert(token);
                }
                Ok(None) => {}
                Err(error) => trace!(%error, "row skipped while collecting values"),
            }
        }
        let values: Arc<[String]> = distinct
            .into_iter()
            .sorted_by_cached_key(|token| collation_key(token))
            .collect();
        debug!(profile, field_key, count = values.len(), "computed distinct values");
        self.entries.insert(key, Arc::clone(&values));
        values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// Accents and case only break ties between otherwise equal tokens.
fn collation_key(token: &str) -> String {
    token
        .chars()
        .map(base_letter)
        .flat_map(char::to_lowercase)
        .collect()
}

fn base_letter(c: char) -> char {
    match c {
        'À'..='Å' | 'à'..='å' => 'a',
        'Ç' | 'ç' => 'c',
        'È'..='Ë' | 'è'..='ë' => 'e',
        'Ì'..='Ï' | 'ì'..='ï' => 'i',
        'Ð' | 'ð' => 'd',
        'Ñ' | 'ñ' => 'n',
        'Ò'..='Ö' | 'Ø' | 'ò'..='ö' | 'ø' => 'o',
        'Ù'..='Ü' | 'ù'..='ü' => 'u',
        'Ý' | 'ý' | 'ÿ' => 'y',
        _ => c,
    }
}
