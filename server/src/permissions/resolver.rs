//! Visibility resolution.
//!
//! Turns a viewer's [`UserContext`] into a predicate over people:
//! - Global: the union of every independent reason the viewer may see someone
//! - Group-scoped: the first matching reason for listing one group's members

use std::collections::BTreeSet;

use roster_common::FieldProjection;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::condition::{Disjunction, Predicate};
use super::context::UserContext;
use crate::groups::{collapse_to_highest, Group, GroupTree, RoleRegistry, TreeError};

/// Who a viewer may see across the whole organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalVisibility {
    pub predicate: Predicate,
    pub projection: FieldProjection,
}

/// Which branch granted access to a group's members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupAccess {
    /// Every member of the group.
    Full,
    /// Members whose role type is visible from above.
    Above,
    /// Members who share their contact data.
    ContactDataOnly,
    Denied,
}

impl GroupAccess {
    #[must_use]
    pub const fn is_granted(self) -> bool {
        !matches!(self, Self::Denied)
    }
}

/// Outcome of a group-scoped resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub access: GroupAccess,
    pub granted: bool,
    pub predicate: Predicate,
    pub projection: FieldProjection,
}

impl Decision {
    fn grant(access: GroupAccess, predicate: Predicate) -> Self {
        Self {
            access,
            granted: true,
            predicate,
            projection: FieldProjection::Public,
        }
    }

    fn denied() -> Self {
        Self {
            access: GroupAccess::Denied,
            granted: false,
            predicate: Predicate::Never,
            projection: FieldProjection::Public,
        }
    }
}

/// Everyone the viewer may see, for any reason.
///
/// Reasons are independent and ORed together:
/// 1. The person shares contact data (only for viewers sharing theirs)
/// 2. An active role in a readable layer
/// 3. An active role, visible from above, anywhere below a readable layer
/// 4. An active role in a readable group
/// 5. The person is the viewer
pub fn resolve_global<R: RoleRegistry>(
    viewer: &UserContext,
    tree: &GroupTree,
    registry: &R,
) -> Result<GlobalVisibility, TreeError> {
    if viewer.is_root {
        debug!(user_id = %viewer.user_id, "Root viewer sees everyone");
        return Ok(GlobalVisibility {
            predicate: Predicate::Always,
            projection: FieldProjection::Public,
        });
    }

    let mut condition = Disjunction::new();

    if viewer.contact_data_visible {
        condition.or(Predicate::ContactDataVisible);
    }

    if !viewer.layers_read.is_empty() {
        let layers = readable_layers(viewer, tree)?;
        condition.or(Predicate::has_active_role(Predicate::LayerIn {
            ids: layers.iter().map(|g| g.id).collect(),
        }));

        let ranges = collapse_to_highest(&layers)
            .into_iter()
            .map(|g| Predicate::GroupWithin {
                lft: g.lft,
                rgt: g.rgt,
            })
            .collect();
        condition.or(Predicate::has_active_role(Predicate::And {
            all: vec![
                Predicate::Or { any: ranges },
                Predicate::RoleTypeIn {
                    types: registry.visible_from_above_role_types(),
                },
            ],
        }));
    }

    if !viewer.groups_group_read.is_empty() {
        condition.or(Predicate::has_active_role(Predicate::GroupIn {
            ids: viewer.groups_group_read.iter().copied().collect(),
        }));
    }

    condition.or(Predicate::PersonIs {
        id: viewer.user_id,
    });

    debug!(
        user_id = %viewer.user_id,
        clauses = condition.len(),
        "Resolved global visibility"
    );
    Ok(GlobalVisibility {
        predicate: condition.combined(),
        projection: FieldProjection::Public,
    })
}

/// Which members of one group the viewer may list.
///
/// Checks run in a fixed order and the first match wins:
/// 1. Root, a read grant on the group, or on its own layer: all members
/// 2. A read grant on a layer above the group's layer: members visible from above
/// 3. The viewer shares contact data: members sharing theirs
/// 4. Otherwise denied, which is not an error
pub fn resolve_for_group<R: RoleRegistry>(
    viewer: &UserContext,
    group_id: Uuid,
    tree: &GroupTree,
    registry: &R,
) -> Result<Decision, TreeError> {
    let group = tree.get(group_id)?;
    let layer_id = tree.layer_group_of(group_id)?.id;
    let readable: BTreeSet<Uuid> = readable_layers(viewer, tree)?
        .iter()
        .map(|layer| layer.id)
        .collect();
    let in_group = Predicate::GroupIn {
        ids: vec![group.id],
    };

    let decision = if viewer.is_root
        || viewer.groups_group_read.contains(&group.id)
        || readable.contains(&layer_id)
    {
        Decision::grant(GroupAccess::Full, Predicate::has_active_role(in_group))
    } else if tree
        .upper_layer_groups(group_id)?
        .iter()
        .any(|layer| readable.contains(&layer.id))
    {
        Decision::grant(
            GroupAccess::Above,
            Predicate::has_active_role(Predicate::And {
                all: vec![
                    in_group,
                    Predicate::RoleTypeIn {
                        types: registry.visible_from_above_role_types(),
                    },
                ],
            }),
        )
    } else if viewer.contact_data_visible {
        Decision::grant(
            GroupAccess::ContactDataOnly,
            Predicate::And {
                all: vec![
                    Predicate::has_active_role(in_group),
                    Predicate::ContactDataVisible,
                ],
            },
        )
    } else {
        Decision::denied()
    };

    debug!(
        user_id = %viewer.user_id,
        group_id = %group.id,
        access = ?decision.access,
        "Resolved group visibility"
    );
    Ok(decision)
}

/// The viewer's readable layers as layer groups.
///
/// Ids that are not layers resolve to their layer group. Each layer is kept
/// once, at the position of the first id mapping to it.
fn readable_layers<'a>(
    viewer: &UserContext,
    tree: &'a GroupTree,
) -> Result<Vec<&'a Group>, TreeError> {
    let mut seen = BTreeSet::new();
    let mut layers = Vec::with_capacity(viewer.layers_read.len());
    for id in &viewer.layers_read {
        let layer = tree.layer_group_of(*id)?;
        if seen.insert(layer.id) {
            layers.push(layer);
        }
    }
    Ok(layers)
}
