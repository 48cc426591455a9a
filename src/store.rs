use crate::{
    error::{InvalidState, RejectReason, SearchError},
    predicates::{Operator, Predicate, PredicateId},
};
use itertools::Itertools;
use tracing::debug;

/// The ordered predicates of one advanced search panel.
///
/// Insertion order is display order. At most one draft can be started at a time: a new field
/// cannot be added while a predicate is still being authored.
#[derive(Clone, Debug, Default)]
pub struct PredicateStore {
    predicates: Vec<Predicate>,
    counter: u64,
}

impl PredicateStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn get(&self, id: &PredicateId) -> Option<&Predicate> {
        self.predicates.iter().find(|predicate| predicate.id == *id)
    }

    /// The predicate currently being authored, if any.
    pub fn draft(&self) -> Option<&Predicate> {
        self.predicates.iter().find(|predicate| !predicate.complete)
    }

    pub fn committed(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates
            .iter()
            .filter(|predicate| predicate.complete && predicate.is_evaluable())
    }

    #[inline]
    pub fn committed_count(&self) -> usize {
        self.committed().count()
    }

    /// A canonical string describing every committed predicate.
    ///
    /// Drafts never take part in it, so it does not change while a draft is being edited. Every
    /// part is length-prefixed: two different sets of predicates never share a signature.
    pub fn committed_signature(&self) -> String {
        self.committed()
            .map(|predicate| {
                format!(
                    "{}{}{}#{}",
                    length_prefixed(&predicate.field_key),
                    length_prefixed(predicate.operator.map(|o| o.as_str()).unwrap_or_default()),
                    predicate.values.len(),
                    predicate.values.iter().map(|value| length_prefixed(value)).join("")
                )
            })
            .join("|")
    }

    /// Start a new draft on `field_key`, which must be one of `filterable`.
    pub fn add_draft(
        &mut self,
        field_key: &str,
        filterable: &[&str],
    ) -> Result<&Predicate, SearchError> {
        if let Some(draft) = self.draft() {
            debug!(draft = %draft.id, field_key, "refusing a second draft");
            return Err(InvalidState::DraftInProgress(draft.id.clone()).into());
        }
        if !filterable.contains(&field_key) {
            debug!(field_key, "refusing a draft on a non-filterable column");
            return Err(InvalidState::UnknownField(field_key.to_owned()).into());
        }

        let id = self.next_id();
        self.predicates.push(Predicate::draft(id, field_key));
        let index = self.predicates.len() - 1;
        Ok(&self.predicates[index])
    }

    /// Choose the operator of a draft; complete predicates are left untouched.
    ///
    /// Switching between a set operator and a substring operator discards the values, since
    /// exact column values and free-form substrings are not interchangeable.
    pub fn set_operator(&mut self, id: &PredicateId, operator: Operator) -> Result<(), SearchError> {
        let predicate = self.get_mut(id)?;
        if predicate.complete {
            return Ok(());
        }
        if let Some(previous) = predicate.operator {
            if previous.is_closed_set() != operator.is_closed_set() {
                predicate.values.clear();
            }
        }
        predicate.operator = Some(operator);
        Ok(())
    }

    /// Replace the values of a predicate with already normalized tokens.
    pub fn set_values<I>(&mut self, id: &PredicateId, values: I) -> Result<(), SearchError>
    where
        I: IntoIterator<Item = String>,
    {
        let values = values
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect_vec();
        if values.is_empty() {
            self.ensure_can_revert(id)?;
        }
        let predicate = self.get_mut(id)?;
        predicate.replace_values(values);
        if predicate.complete && predicate.values.is_empty() {
            predicate.complete = false;
        }
        Ok(())
    }

    /// Append one normalized token; returns whether it was new.
    pub fn push_value(&mut self, id: &PredicateId, value: String) -> Result<bool, SearchError> {
        Ok(self.get_mut(id)?.push_value(value))
    }

    /// Remove one value; a complete predicate left without values reverts to a draft.
    ///
    /// The removal is refused when that revert would leave two drafts.
    pub fn remove_value(&mut self, id: &PredicateId, value: &str) -> Result<bool, SearchError> {
        let predicate = self.get(id).ok_or_else(|| SearchError::NotFound(id.clone()))?;
        if predicate.values.iter().all(|v| v == value) {
            self.ensure_can_revert(id)?;
        }
        Ok(self.get_mut(id)?.remove_value(value))
    }

    /// Finalize a draft. Nothing changes when the commit is rejected.
    pub fn commit(&mut self, id: &PredicateId) -> Result<(), SearchError> {
        let predicate = self.get_mut(id)?;
        let rejection = if predicate.complete {
            Some(RejectReason::AlreadyComplete)
        } else if predicate.operator.is_none() {
            Some(RejectReason::MissingOperator)
        } else if predicate.values.is_empty() {
            Some(RejectReason::NoValues)
        } else {
            None
        };

        match rejection {
            Some(reason) => {
                debug!(%id, %reason, "commit rejected");
                Err(SearchError::Rejected {
                    id: id.clone(),
                    reason,
                })
            }
            None => {
                predicate.complete = true;
                Ok(())
            }
        }
    }

    pub fn delete(&mut self, id: &PredicateId) -> Result<Predicate, SearchError> {
        let index = self
            .predicates
            .iter()
            .position(|predicate| predicate.id == *id)
            .ok_or_else(|| SearchError::NotFound(id.clone()))?;
        Ok(self.predicates.remove(index))
    }

    /// Remove every predicate whose field is not in `valid_fields`, returning their ids.
    pub fn sweep_invalid_fields(&mut self, valid_fields: &[&str]) -> Vec<PredicateId> {
        let (kept, removed): (Vec<_>, Vec<_>) = std::mem::take(&mut self.predicates)
            .into_iter()
            .partition(|predicate| valid_fields.contains(&predicate.field_key.as_str()));
        self.predicates = kept;
        removed
            .into_iter()
            .map(|predicate| {
                debug!(id = %predicate.id, field_key = %predicate.field_key, "column disappeared, dropping predicate");
                predicate.id
            })
            .collect()
    }

    pub fn clear_all(&mut self) {
        self.predicates.clear();
    }

    /// Replace the whole list, e.g. with predicates read back from a snapshot.
    ///
    /// Complete predicates without values are turned back into drafts and only the first draft
    /// is kept.
    pub(crate) fn replace_all(&mut self, predicates: Vec<Predicate>) {
        let mut has_draft = false;
        self.predicates = predicates
            .into_iter()
            .map(|mut predicate| {
                if predicate.values.is_empty() {
                    predicate.complete = false;
                }
                predicate
            })
            .filter(|predicate| {
                if predicate.complete {
                    return true;
                }
                let keep = !has_draft;
                has_draft = true;
                keep
            })
            .unique_by(|predicate| predicate.id.clone())
            .collect();
    }

    /// A fresh identifier, guaranteed not to collide with any restored one.
    pub(crate) fn next_id(&mut self) -> PredicateId {
        loop {
            self.counter += 1;
            let id = PredicateId::new(format!("adv-{:x}", self.counter));
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    // A complete predicate about to lose its last value becomes a draft, which is only allowed
    // when no other draft exists.
    fn ensure_can_revert(&self, id: &PredicateId) -> Result<(), SearchError> {
        let Some(predicate) = self.get(id) else {
            return Err(SearchError::NotFound(id.clone()));
        };
        if !predicate.complete {
            return Ok(());
        }
        match self.draft() {
            Some(draft) => {
                debug!(%id, draft = %draft.id, "refusing to empty a predicate while a draft exists");
                Err(InvalidState::DraftInProgress(draft.id.clone()).into())
            }
            None => Ok(()),
        }
    }

    fn get_mut(&mut self, id: &PredicateId) -> Result<&mut Predicate, SearchError> {
        self.predicates
            .iter_mut()
            .find(|predicate| predicate.id == *id)
            .ok_or_else(|| SearchError::NotFound(id.clone()))
    }
}

#[inline]
fn length_prefixed(part: &str) -> String {
    format!("{}:{part}", part.len())
}
