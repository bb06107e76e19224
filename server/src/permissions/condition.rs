//! Person predicates and the disjunction builder used to assemble them.
//!
//! A predicate is evaluated per person. Person-level atoms look at the person
//! row; group and role atoms only make sense inside [`Predicate::HasActiveRole`],
//! which asks whether any of the person's active roles satisfies the inner
//! predicate. Outside that scope they are false.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::people::{Membership, PersonRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Always,
    Never,

    // === Person fields ===
    /// `person.id = id`
    PersonIs { id: Uuid },
    /// `person.contact_data_visible = true`
    ContactDataVisible,

    // === Role scope ===
    /// Role's group id is one of `ids`.
    GroupIn { ids: Vec<Uuid> },
    /// Role's group cached layer is one of `ids`.
    LayerIn { ids: Vec<Uuid> },
    /// Role's group bounds lie within `lft..=rgt`.
    GroupWithin { lft: i32, rgt: i32 },
    /// Role type is one of `types`.
    RoleTypeIn { types: Vec<String> },

    // === Combinators ===
    And { all: Vec<Predicate> },
    Or { any: Vec<Predicate> },
    /// Some active role of the person satisfies `filter`.
    HasActiveRole { filter: Box<Predicate> },
}

impl Predicate {
    #[must_use]
    pub fn has_active_role(filter: Self) -> Self {
        Self::HasActiveRole {
            filter: Box::new(filter),
        }
    }

    #[must_use]
    pub const fn is_never(&self) -> bool {
        matches!(self, Self::Never)
    }

    #[must_use]
    pub const fn is_always(&self) -> bool {
        matches!(self, Self::Always)
    }

    /// Evaluate against one person and their active memberships.
    #[must_use]
    pub fn matches(&self, record: &PersonRecord) -> bool {
        self.eval(record, None)
    }

    fn eval(&self, record: &PersonRecord, membership: Option<&Membership>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::PersonIs { id } => record.person_id == *id,
            Self::ContactDataVisible => record.contact_data_visible,
            Self::GroupIn { ids } => membership.is_some_and(|m| ids.contains(&m.group_id)),
            Self::LayerIn { ids } => membership
                .and_then(|m| m.layer_group_id)
                .is_some_and(|layer_id| ids.contains(&layer_id)),
            Self::GroupWithin { lft, rgt } => {
                membership.is_some_and(|m| m.lft >= *lft && m.rgt <= *rgt)
            }
            Self::RoleTypeIn { types } => {
                membership.is_some_and(|m| types.iter().any(|t| *t == m.role_type))
            }
            Self::And { all } => all.iter().all(|p| p.eval(record, membership)),
            Self::Or { any } => any.iter().any(|p| p.eval(record, membership)),
            Self::HasActiveRole { filter } => record
                .memberships
                .iter()
                .any(|m| filter.eval(record, Some(m))),
        }
    }
}

/// Accumulates independent predicates into one OR.
///
/// Callers add whichever reasons apply without knowing how many others will
/// be combined. An empty accumulator yields [`Predicate::Never`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disjunction {
    clauses: Vec<Predicate>,
}

impl Disjunction {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// Append a predicate. `Never` adds nothing to an OR and is dropped.
    pub fn or(&mut self, predicate: Predicate) -> &mut Self {
        if !predicate.is_never() {
            self.clauses.push(predicate);
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// The OR of everything appended so far.
    #[must_use]
    pub fn combined(self) -> Predicate {
        let mut clauses = self.clauses;
        match clauses.len() {
            0 => Predicate::Never,
            1 => clauses.remove(0),
            _ => Predicate::Or { any: clauses },
        }
    }
}
