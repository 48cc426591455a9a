use crate::error::ResolutionError;

/// A column of the offers table, as exposed by the host.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Column {
    pub key: String,
    pub label: String,
}

impl Column {
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_owned(),
            label: label.to_owned(),
        }
    }

    /// Columns without a key or a label cannot carry a predicate.
    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.key.is_empty() && !self.label.is_empty()
    }
}

/// Access to the rows of the host's dataset.
///
/// The engine makes no assumption about the shape of a row `R`; everything it knows about rows
/// goes through this trait.
pub trait FieldResolver<R> {
    /// The columns that are currently displayed.
    fn columns(&self) -> Vec<Column>;

    /// The raw value of `field_key` for `row`, or `None` when the row has no such value.
    fn resolve(&self, row: &R, field_key: &str) -> Result<Option<String>, ResolutionError>;

    /// Canonicalize a raw value into a comparison token.
    ///
    /// By default, values are trimmed and upper-cased. Empty results are `None`.
    fn normalize(&self, raw: &str, _field_key: &str) -> Option<String> {
        normalize_token(raw)
    }

    /// Resolve and normalize in one step.
    fn token(&self, row: &R, field_key: &str) -> Result<Option<String>, ResolutionError> {
        Ok(self
            .resolve(row, field_key)?
            .and_then(|raw| self.normalize(&raw, field_key)))
    }
}

/// The default normalization: trimmed and upper-cased, `None` when nothing is left.
pub fn normalize_token(raw: &str) -> Option<String> {
    let token = raw.trim().to_uppercase();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// The keys of the valid columns, in display order.
pub(crate) fn valid_keys(columns: &[Column]) -> Vec<&str> {
    columns
        .iter()
        .filter(|column| column.is_valid())
        .map(|column| column.key.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_normalize_a_token() {
        assert_eq!(Some("JUNIOR SUITE".to_owned()), normalize_token("  Junior Suite "));
    }

    #[test]
    fn return_none_when_normalizing_a_blank_token() {
        assert_eq!(None, normalize_token("   "));
    }

    #[test]
    fn ignore_columns_without_a_label() {
        let columns = [
            Column::new("ship", "Ship"),
            Column::new("hidden", ""),
            Column::new("", "Orphan"),
        ];

        assert_eq!(vec!["ship"], valid_keys(&columns));
    }
}
