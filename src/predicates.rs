use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

/// Opaque identifier of a [`Predicate`], stable for the predicate's lifetime.
#[derive(Clone, Eq, Ord, PartialEq, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredicateId(String);

impl PredicateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PredicateId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperatorError {
    #[error("unknown operator '{0}'")]
    Unknown(String),
}

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum Operator {
    In,
    NotIn,
    Contains,
    NotContains,
}

impl Operator {
    pub const ALL: [Operator; 4] = [
        Operator::In,
        Operator::NotIn,
        Operator::Contains,
        Operator::NotContains,
    ];

    /// Parse an operator coming from a stored snapshot.
    ///
    /// Retired operators are mapped to their closest supported equivalent (`starts with` becomes
    /// `contains`); anything else that is not one of the four supported operators is `None`.
    pub fn coerce_legacy(raw: &str) -> Option<Self> {
        let canonical = canonicalize(raw);
        match canonical.as_str() {
            "starts with" => Some(Self::Contains),
            _ => Self::from_canonical(&canonical),
        }
    }

    /// Whether the values of this operator are drawn from the distinct values of the column.
    #[inline]
    pub const fn is_closed_set(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    #[inline]
    pub const fn is_negated(&self) -> bool {
        matches!(self, Self::NotIn | Self::NotContains)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Contains => "contains",
            Self::NotContains => "not contains",
        }
    }

    /// Apply the operator to `needle`.
    ///
    /// For the set operators `haystack` must be sorted; for the substring operators both
    /// `haystack` and `needle` must already be case-folded.
    pub(crate) fn apply(&self, haystack: &[String], needle: &str) -> bool {
        match self {
            Self::In => contains_exactly(haystack, needle),
            Self::NotIn => !contains_exactly(haystack, needle),
            Self::Contains => haystack.iter().any(|value| needle.contains(value.as_str())),
            Self::NotContains => haystack.iter().all(|value| !needle.contains(value.as_str())),
        }
    }

    fn from_canonical(canonical: &str) -> Option<Self> {
        match canonical {
            "in" => Some(Self::In),
            "not in" => Some(Self::NotIn),
            "contains" => Some(Self::Contains),
            "not contains" => Some(Self::NotContains),
            _ => None,
        }
    }
}

impl FromStr for Operator {
    type Err = OperatorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::from_canonical(&canonicalize(raw)).ok_or_else(|| OperatorError::Unknown(raw.to_owned()))
    }
}

impl Display for Operator {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

impl Serialize for Operator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Operator::coerce_legacy(&raw)
            .ok_or_else(|| serde::de::Error::custom(OperatorError::Unknown(raw)))
    }
}

// `Not In`, `not-in`, `NOT_IN` and `not  in` are all spelled `not in`.
fn canonicalize(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .join(" ")
}

#[inline]
fn contains_exactly(haystack: &[String], needle: &str) -> bool {
    haystack
        .binary_search_by(|value| value.as_str().cmp(needle))
        .is_ok()
}

/// One field/operator/value-set condition of the advanced search panel.
///
/// Values are normalized tokens, kept in insertion order without duplicates; a row matches a
/// predicate when it matches any one of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Predicate {
    pub(crate) id: PredicateId,
    pub(crate) field_key: String,
    pub(crate) operator: Option<Operator>,
    pub(crate) values: Vec<String>,
    pub(crate) complete: bool,
}

impl Predicate {
    pub(crate) fn draft(id: PredicateId, field_key: &str) -> Self {
        Self {
            id,
            field_key: field_key.to_owned(),
            operator: None,
            values: vec![],
            complete: false,
        }
    }

    #[inline]
    pub fn id(&self) -> &PredicateId {
        &self.id
    }

    #[inline]
    pub fn field_key(&self) -> &str {
        &self.field_key
    }

    #[inline]
    pub fn operator(&self) -> Option<Operator> {
        self.operator
    }

    #[inline]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// A field, an operator and at least one value: enough to be evaluated.
    #[inline]
    pub fn is_evaluable(&self) -> bool {
        !self.field_key.is_empty() && self.operator.is_some() && !self.values.is_empty()
    }

    /// Replace the values, dropping empty tokens and later duplicates.
    pub(crate) fn replace_values<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.values = values
            .into_iter()
            .filter(|value| !value.is_empty())
            .unique()
            .collect();
    }

    /// Append a value unless it is empty or already present.
    pub(crate) fn push_value(&mut self, value: String) -> bool {
        if value.is_empty() || self.values.contains(&value) {
            return false;
        }
        self.values.push(value);
        true
    }

    /// Remove a value; a complete predicate left with no values goes back to being a draft.
    pub(crate) fn remove_value(&mut self, value: &str) -> bool {
        let before = self.values.len();
        self.values.retain(|v| v != value);
        if self.complete && self.values.is_empty() {
            self.complete = false;
        }
        before != self.values.len()
    }
}

impl Display for Predicate {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        let operator = self.operator.map(|o| o.as_str()).unwrap_or("?");
        write!(
            formatter,
            "⟨{}, {operator}, [{}]⟩",
            self.field_key,
            self.values.join(", ")
        )
    }
}
