use crate::{
    columns::{Column, FieldResolver},
    error::ResolutionError,
};
use std::cell::RefCell;

pub const SHIP: &str = "ship";
pub const CABIN: &str = "category";
pub const PORT: &str = "departurePort";
pub const FAVORITE: &str = "favorite";
pub const BROKEN: &str = "broken";

#[derive(Clone, Debug, PartialEq)]
pub struct Offer {
    pub ship: Option<String>,
    pub cabin: Option<String>,
    pub port: Option<String>,
}

impl Offer {
    pub fn new(ship: &str, cabin: &str) -> Self {
        Self {
            ship: Some(ship.to_owned()),
            cabin: Some(cabin.to_owned()),
            port: None,
        }
    }

    pub fn at(mut self, port: &str) -> Self {
        self.port = Some(port.to_owned());
        self
    }
}

pub fn offers(rows: &[(&str, &str)]) -> Vec<Offer> {
    rows.iter().map(|(ship, cabin)| Offer::new(ship, cabin)).collect()
}

/// Resolves [`Offer`] fields; `broken` always fails to resolve.
#[derive(Debug)]
pub struct OfferResolver {
    columns: RefCell<Vec<Column>>,
}

impl OfferResolver {
    pub fn new() -> Self {
        Self {
            columns: RefCell::new(vec![
                Column::new(FAVORITE, "Favorite"),
                Column::new(SHIP, "Ship"),
                Column::new(CABIN, "Category"),
                Column::new(PORT, "Departure Port"),
                Column::new(BROKEN, "Broken"),
            ]),
        }
    }

    /// Stop displaying a column.
    pub fn hide(&self, key: &str) {
        self.columns.borrow_mut().retain(|column| column.key != key);
    }
}

impl FieldResolver<Offer> for OfferResolver {
    fn columns(&self) -> Vec<Column> {
        self.columns.borrow().clone()
    }

    fn resolve(&self, row: &Offer, field_key: &str) -> Result<Option<String>, ResolutionError> {
        match field_key {
            SHIP => Ok(row.ship.clone()),
            CABIN => Ok(row.cabin.clone()),
            PORT => Ok(row.port.clone()),
            FAVORITE => Ok(None),
            _ => Err(ResolutionError::new(field_key, "no such field")),
        }
    }
}

pub mod predicates {
    macro_rules! predicate {
        ($id:expr, $field:expr, $operator:expr, [$($value:expr),* $(,)?]) => {
            $crate::predicates::Predicate {
                id: $crate::predicates::PredicateId::new($id),
                field_key: $field.to_owned(),
                operator: Some($operator),
                values: vec![$($value.to_owned()),*],
                complete: true,
            }
        };
    }

    macro_rules! draft {
        ($id:expr, $field:expr, $operator:expr, [$($value:expr),* $(,)?]) => {{
            let mut predicate = $crate::test_utils::predicates::predicate!($id, $field, $operator, [$($value),*]);
            predicate.complete = false;
            predicate
        }};
    }

    pub(crate) use draft;
    pub(crate) use predicate;
}
