use crate::{
    columns::FieldResolver,
    predicates::{Operator, Predicate, PredicateId},
};
use itertools::Itertools;
use tracing::trace;

/// Which predicates take part in an evaluation besides the committed ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvaluationOptions<'a> {
    preview: Option<&'a PredicateId>,
}

impl<'a> EvaluationOptions<'a> {
    /// Only committed predicates.
    pub const fn committed_only() -> Self {
        Self { preview: None }
    }

    /// Committed predicates plus the draft `preview`, when it has an operator and values.
    pub const fn with_preview(preview: Option<&'a PredicateId>) -> Self {
        Self { preview }
    }

    #[inline]
    pub const fn includes_preview(&self) -> bool {
        self.preview.is_some()
    }
}

/// The predicates of one evaluation pass, compiled for matching.
///
/// Predicates are combined with a logical AND, values within a predicate with a logical OR.
#[derive(Debug)]
pub struct FilterEvaluator<'p> {
    participants: Vec<CompiledPredicate<'p>>,
}

#[derive(Debug)]
struct CompiledPredicate<'p> {
    field_key: &'p str,
    operator: Operator,
    // Sorted for the set operators, case-folded for the substring operators.
    needles: Vec<String>,
}

impl<'p> CompiledPredicate<'p> {
    fn new(predicate: &'p Predicate, operator: Operator) -> Self {
        let needles = if operator.is_closed_set() {
            predicate.values.iter().sorted().dedup().cloned().collect()
        } else {
            predicate
                .values
                .iter()
                .map(|value| value.to_lowercase())
                .unique()
                .collect()
        };
        Self {
            field_key: &predicate.field_key,
            operator,
            needles,
        }
    }

    fn matches<R, F: FieldResolver<R>>(&self, row: &R, resolver: &F) -> bool {
        let token = match resolver.token(row, self.field_key) {
            Ok(Some(token)) => token,
            Ok(None) => return false,
            Err(error) => {
                trace!(%error, "row excluded");
                return false;
            }
        };

        if self.operator.is_closed_set() {
            self.operator.apply(&self.needles, &token)
        } else {
            self.operator.apply(&self.needles, &token.to_lowercase())
        }
    }
}

impl<'p> FilterEvaluator<'p> {
    pub fn new(predicates: &'p [Predicate], options: EvaluationOptions<'_>) -> Self {
        let participants = predicates
            .iter()
            .filter(|predicate| predicate.is_evaluable())
            .filter(|predicate| {
                predicate.complete || options.preview.is_some_and(|id| *id == predicate.id)
            })
            .filter_map(|predicate| {
                predicate
                    .operator
                    .map(|operator| CompiledPredicate::new(predicate, operator))
            })
            .collect();
        Self { participants }
    }

    /// Nothing to apply: every row passes.
    #[inline]
    pub fn is_pass_through(&self) -> bool {
        self.participants.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn matches<R, F: FieldResolver<R>>(&self, row: &R, resolver: &F) -> bool {
        self.participants
            .iter()
            .all(|predicate| predicate.matches(row, resolver))
    }

    /// The rows of `dataset` that match, in their original order.
    pub fn apply<'a, R, F: FieldResolver<R>>(&self, dataset: &'a [R], resolver: &F) -> Vec<&'a R> {
        if self.is_pass_through() {
            return dataset.iter().collect();
        }
        dataset
            .iter()
            .filter(|row| self.matches(*row, resolver))
            .collect()
    }
}

/// Filter `dataset` with `predicates` in one go.
pub fn apply<'a, R, F: FieldResolver<R>>(
    dataset: &'a [R],
    predicates: &[Predicate],
    options: EvaluationOptions<'_>,
    resolver: &F,
) -> Vec<&'a R> {
    FilterEvaluator::new(predicates, options).apply(dataset, resolver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        offers,
        predicates::{draft, predicate},
        Offer, OfferResolver, BROKEN, CABIN, SHIP,
    };
    use proptest::prelude::*;

    const SHIPS: [(&str, &str); 5] = [
        ("Icon", "Suite"),
        ("Wonder", "Interior"),
        ("Icon", "Junior Suite"),
        ("Star", "Balcony"),
        ("Wonder", "Suite"),
    ];

    fn ships(rows: &[&Offer]) -> Vec<String> {
        rows.iter()
            .map(|row| row.ship.clone().unwrap_or_default())
            .collect()
    }

    fn cabins(rows: &[&Offer]) -> Vec<String> {
        rows.iter()
            .map(|row| row.cabin.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn return_every_row_when_there_are_no_predicates() {
        let dataset = offers(&SHIPS);

        let result = apply(&dataset, &[], EvaluationOptions::committed_only(), &OfferResolver::new());

        assert_eq!(5, result.len());
    }

    #[test]
    fn return_the_rows_that_are_in_the_set() {
        let dataset = offers(&SHIPS);
        let predicates = [predicate!("p1", SHIP, Operator::In, ["ICON"])];

        let result = apply(
            &dataset,
            &predicates,
            EvaluationOptions::committed_only(),
            &OfferResolver::new(),
        );

        assert_eq!(vec!["Icon", "Icon"], ships(&result));
    }

    #[test]
    fn return_the_rows_that_are_not_in_the_set() {
        let dataset = offers(&SHIPS);
        let predicates = [predicate!("p1", SHIP, Operator::NotIn, ["ICON", "WONDER"])];

        let result = apply(
            &dataset,
            &predicates,
            EvaluationOptions::committed_only(),
            &OfferResolver::new(),
        );

        assert_eq!(vec!["Star"], ships(&result));
    }

    #[test]
    fn match_substrings_regardless_of_case() {
        let dataset = offers(&[("Icon", "Suite"), ("Icon", "Interior"), ("Icon", "Junior Suite")]);
        let predicates = [predicate!("p1", CABIN, Operator::Contains, ["suite"])];

        let result = apply(
            &dataset,
            &predicates,
            EvaluationOptions::committed_only(),
            &OfferResolver::new(),
        );

        assert_eq!(vec!["Suite", "Junior Suite"], cabins(&result));
    }

    #[test]
    fn match_any_of_the_substrings() {
        let dataset = offers(&SHIPS);
        let predicates = [predicate!("p1", CABIN, Operator::Contains, ["BALC", "INTER"])];

        let result = apply(
            &dataset,
            &predicates,
            EvaluationOptions::committed_only(),
            &OfferResolver::new(),
        );

        assert_eq!(vec!["Interior", "Balcony"], cabins(&result));
    }

    #[test]
    fn exclude_rows_containing_any_of_the_substrings() {
        let dataset = offers(&SHIPS);
        let predicates = [predicate!("p1", CABIN, Operator::NotContains, ["SUITE", "BALCONY"])];

        let result = apply(
            &dataset,
            &predicates,
            EvaluationOptions::committed_only(),
            &OfferResolver::new(),
        );

        assert_eq!(vec!["Interior"], cabins(&result));
    }

    #[test]
    fn combine_predicates_with_and() {
        let dataset = offers(&SHIPS);
        let predicates = [
            predicate!("p1", SHIP, Operator::In, ["ICON", "WONDER"]),
            predicate!("p2", CABIN, Operator::NotContains, ["suite"]),
        ];

        let result = apply(
            &dataset,
            &predicates,
            EvaluationOptions::committed_only(),
            &OfferResolver::new(),
        );

        assert_eq!(vec!["Wonder"], ships(&result));
        assert_eq!(vec!["Interior"], cabins(&result));
    }

    #[test]
    fn ignore_drafts_unless_they_are_previewed() {
        let dataset = offers(&SHIPS);
        let predicates = [draft!("p1", SHIP, Operator::In, ["STAR"])];
        let id = PredicateId::new("p1");

        let committed = apply(
            &dataset,
            &predicates,
            EvaluationOptions::committed_only(),
            &OfferResolver::new(),
        );
        let previewed = apply(
            &dataset,
            &predicates,
            EvaluationOptions::with_preview(Some(&id)),
            &OfferResolver::new(),
        );

        assert_eq!(5, committed.len());
        assert_eq!(vec!["Star"], ships(&previewed));
    }

    #[test]
    fn ignore_a_previewed_draft_without_values() {
        let dataset = offers(&SHIPS);
        let predicates = [draft!("p1", SHIP, Operator::In, [])];
        let id = PredicateId::new("p1");

        let evaluator = FilterEvaluator::new(&predicates, EvaluationOptions::with_preview(Some(&id)));

        assert!(evaluator.is_pass_through());
        assert_eq!(5, evaluator.apply(&dataset, &OfferResolver::new()).len());
    }

    #[test]
    fn exclude_rows_whose_value_is_missing() {
        let mut dataset = offers(&SHIPS);
        dataset[3].ship = None;
        let predicates = [predicate!("p1", SHIP, Operator::NotIn, ["ICON"])];

        let result = apply(
            &dataset,
            &predicates,
            EvaluationOptions::committed_only(),
            &OfferResolver::new(),
        );

        assert_eq!(vec!["Wonder", "Wonder"], ships(&result));
    }

    #[test]
    fn exclude_rows_that_cannot_be_resolved_without_aborting() {
        let dataset = offers(&SHIPS);
        let predicates = [predicate!("p1", BROKEN, Operator::NotContains, ["X"])];

        let result = apply(
            &dataset,
            &predicates,
            EvaluationOptions::committed_only(),
            &OfferResolver::new(),
        );

        assert!(result.is_empty());
    }

    #[test]
    fn do_not_modify_the_inputs() {
        let dataset = offers(&SHIPS);
        let before = dataset.clone();
        let predicates = vec![predicate!("p1", SHIP, Operator::In, ["WONDER", "ICON"])];
        let predicates_before = predicates.clone();

        let _ = apply(
            &dataset,
            &predicates,
            EvaluationOptions::committed_only(),
            &OfferResolver::new(),
        );

        assert_eq!(before, dataset);
        assert_eq!(predicates_before, predicates);
    }

    fn a_ship() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("Icon"), Just("Wonder"), Just("Star"), Just("Oasis")]
    }

    fn a_cabin() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("Suite"), Just("Junior Suite"), Just("Interior"), Just("Balcony")]
    }

    proptest! {
        #[test]
        fn match_iff_every_predicate_matches(
            rows in prop::collection::vec((a_ship(), a_cabin()), 0..32),
            selected in prop::collection::vec(a_ship(), 1..3),
        ) {
            let dataset = offers(&rows);
            let values = selected.iter().map(|ship| ship.to_uppercase()).collect_vec();
            let mut ships = predicate!("p1", SHIP, Operator::In, []);
            ships.values = values.clone();
            let predicates = [ships, predicate!("p2", CABIN, Operator::NotContains, ["suite"])];

            let result = apply(&dataset, &predicates, EvaluationOptions::committed_only(), &OfferResolver::new());

            let expected = dataset
                .iter()
                .filter(|row| {
                    let ship = row.ship.clone().unwrap_or_default().to_uppercase();
                    let cabin = row.cabin.clone().unwrap_or_default().to_lowercase();
                    values.contains(&ship) && !cabin.contains("suite")
                })
                .collect_vec();
            prop_assert_eq!(expected, result);
        }
    }
}
