//! An interactive advanced search over a table of cruise offers.
//!
//! Users build the filter one predicate at a time: a column, an operator and a set of values.
//! Predicates are combined with a logical AND and the values of a predicate with a logical OR.
//! While a predicate is still a draft it can be previewed live; evaluation is debounced so that
//! typing does not re-filter the table on every keystroke. Committed predicates are persisted
//! per profile and restored once per session.
//!
//! # Examples
//!
//! Filtering a few offers:
//!
//! ```
//! use offer_search::{AdvancedSearch, Column, FieldResolver, MemoryStore, Operator, ResolutionError, SearchConfig};
//! use std::time::Instant;
//!
//! struct Offer {
//!     ship: &'static str,
//!     category: &'static str,
//! }
//!
//! struct Offers;
//!
//! impl FieldResolver<Offer> for Offers {
//!     fn columns(&self) -> Vec<Column> {
//!         vec![Column::new("ship", "Ship"), Column::new("category", "Category")]
//!     }
//!
//!     fn resolve(&self, offer: &Offer, field_key: &str) -> Result<Option<String>, ResolutionError> {
//!         match field_key {
//!             "ship" => Ok(Some(offer.ship.to_owned())),
//!             "category" => Ok(Some(offer.category.to_owned())),
//!             _ => Err(ResolutionError::new(field_key, "unknown column")),
//!         }
//!     }
//! }
//!
//! let offers = [
//!     Offer { ship: "Icon", category: "Suite" },
//!     Offer { ship: "Wonder", category: "Interior" },
//!     Offer { ship: "Icon", category: "Junior Suite" },
//! ];
//! let now = Instant::now();
//! let mut search = AdvancedSearch::new(Offers, MemoryStore::new(), SearchConfig::default());
//! search.set_enabled(true);
//!
//! // Only Icon offers...
//! let ships = search.add_draft("ship").unwrap();
//! search.set_operator(&ships, Operator::In, now).unwrap();
//! search.set_values(&ships, ["icon"], now).unwrap();
//! search.commit(&ships, now).unwrap();
//!
//! // ...that are not suites
//! let categories = search.add_draft("category").unwrap();
//! search.set_operator(&categories, "not contains".parse().unwrap(), now).unwrap();
//! search.add_value(&categories, "junior", now).unwrap();
//! search.commit(&categories, now).unwrap();
//!
//! let matches = search.evaluate(&offers);
//! assert_eq!(1, matches.len());
//! assert_eq!("Suite", matches[0].category);
//! ```
//!
//! # Operators
//!
//! * `in` and `not in` compare the normalized value of the column with a closed set of values,
//!   usually picked from [`AdvancedSearch::suggestions`];
//! * `contains` and `not contains` look for free-form substrings, regardless of case.
//!
//! A row whose value cannot be resolved never matches, whatever the operator.
//!
//! # Timers
//!
//! Nothing in this crate reads the clock or spawns a task. Operations that can start a timer
//! receive `now`, and the host fires what is due with [`AdvancedSearch::tick`], using
//! [`AdvancedSearch::next_deadline`] to know when to call it.
mod cache;
mod columns;
mod config;
mod debounce;
mod engine;
mod error;
mod evaluation;
mod hidden;
mod persist;
mod predicates;
mod preview;
mod state;
mod store;
#[cfg(test)]
mod test_utils;

pub use crate::{
    cache::DistinctValueCache,
    columns::{normalize_token, Column, FieldResolver},
    config::SearchConfig,
    debounce::Debouncer,
    engine::{AdvancedSearch, Event},
    error::{InvalidState, PersistenceError, RejectReason, ResolutionError, SearchError},
    evaluation::{apply, EvaluationOptions, FilterEvaluator},
    hidden::HiddenGroups,
    persist::{
        KeyValueStore, MemoryStore, PersistenceGateway, RestoreOutcome, SkipReason, Snapshot,
        StoredPredicate,
    },
    predicates::{Operator, OperatorError, Predicate, PredicateId},
    preview::{PreviewOutcome, PreviewScheduler, PreviewSpeed},
    state::AdvancedSearchState,
    store::PredicateStore,
};
