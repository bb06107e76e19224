//! People, their roles, and in-memory application of visibility predicates.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use roster_common::{FieldProjection, Person, PersonView};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::groups::{GroupTree, TreeError};
use crate::permissions::Predicate;

/// A person's position in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub person_id: Uuid,
    pub group_id: Uuid,
    pub role_type: String,
    /// Free-text qualifier shown next to the role type.
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Revoked roles are soft-deleted, never removed.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Role {
    #[must_use]
    pub fn new(person_id: Uuid, group_id: Uuid, role_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            person_id,
            group_id,
            role_type: role_type.into(),
            label: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Active when neither the role nor its group is soft-deleted.
    #[must_use]
    pub fn is_active(&self, tree: &GroupTree) -> bool {
        !self.is_deleted() && tree.is_active(self.group_id)
    }
}

/// An active role joined with the tree data of its group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub role_type: String,
    pub group_id: Uuid,
    pub layer_group_id: Option<Uuid>,
    pub lft: i32,
    pub rgt: i32,
}

/// Everything a predicate may look at for one person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    pub person_id: Uuid,
    pub contact_data_visible: bool,
    pub memberships: Vec<Membership>,
}

impl PersonRecord {
    /// Join the person's active roles with the tree.
    ///
    /// Roles of other people, revoked roles, and roles in deleted groups are
    /// skipped; a role pointing at a group missing from the tree is an error.
    pub fn build(person: &Person, roles: &[Role], tree: &GroupTree) -> Result<Self, TreeError> {
        let mut memberships = Vec::new();
        for role in roles.iter().filter(|r| r.person_id == person.id) {
            let group = tree
                .find(role.group_id)
                .ok_or(TreeError::UnknownGroup(role.group_id))?;
            if role.is_deleted() || group.is_deleted() {
                continue;
            }
            memberships.push(Membership {
                role_type: role.role_type.clone(),
                group_id: group.id,
                layer_group_id: group.layer_group_id,
                lft: group.lft,
                rgt: group.rgt,
            });
        }

        Ok(Self {
            person_id: person.id,
            contact_data_visible: person.contact_data_visible,
            memberships,
        })
    }
}

/// People of `population` matching the predicate, in input order.
pub fn filter_visible<'a>(
    population: &'a [Person],
    roles: &[Role],
    tree: &GroupTree,
    predicate: &Predicate,
) -> Result<Vec<&'a Person>, TreeError> {
    let mut roles_by_person: HashMap<Uuid, Vec<Role>> = HashMap::new();
    for role in roles {
        roles_by_person
            .entry(role.person_id)
            .or_default()
            .push(role.clone());
    }

    let mut visible = Vec::new();
    for person in population {
        let own_roles = roles_by_person
            .get(&person.id)
            .map_or(&[][..], Vec::as_slice);
        let record = PersonRecord::build(person, own_roles, tree)?;
        if predicate.matches(&record) {
            visible.push(person);
        }
    }
    Ok(visible)
}

/// Like [`filter_visible`], cut down to the granted projection.
pub fn visible_people(
    population: &[Person],
    roles: &[Role],
    tree: &GroupTree,
    predicate: &Predicate,
    projection: FieldProjection,
) -> Result<Vec<PersonView>, TreeError> {
    Ok(filter_visible(population, roles, tree, predicate)?
        .into_iter()
        .map(|person| person.project(projection))
        .collect())
}
