//! Group tree stored as nested sets.
//!
//! Every group carries `(lft, rgt)` bounds such that all descendants lie
//! strictly inside the bounds of their ancestors. Bounds are renumbered on
//! every structural change; queries never touch parent links except to build
//! the root-to-group chain.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::error::TreeError;
use super::types::{GroupTypeDef, TypeRegistry};

/// A node of the group tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    /// `None` only for the root.
    pub parent_id: Option<Uuid>,
    pub group_type: String,
    pub name: String,
    pub lft: i32,
    pub rgt: i32,
    /// Taken from the group type.
    pub is_layer: bool,
    /// Nearest layer at or above this group, fixed when the group is attached.
    pub layer_group_id: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Group {
    /// Strict nested-set containment; a group is not its own ancestor.
    #[must_use]
    pub const fn is_ancestor_of(&self, other: &Self) -> bool {
        self.lft < other.lft && self.rgt > other.rgt
    }

    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Group to be attached to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub group_type: String,
    pub name: String,
}

impl NewGroup {
    #[must_use]
    pub fn new(group_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group_type: group_type.into(),
            name: name.into(),
        }
    }
}

/// In-memory snapshot of the whole group tree, indexed by id.
#[derive(Debug, Clone)]
pub struct GroupTree {
    groups: HashMap<Uuid, Group>,
    /// Child ids per parent, in nested-set order.
    children: HashMap<Uuid, Vec<Uuid>>,
    root_id: Uuid,
}

impl GroupTree {
    /// Start a new tree with the given root and its default children.
    pub fn new(root: NewGroup, registry: &TypeRegistry) -> Result<Self, TreeError> {
        let def = registry.find_group_type(&root.group_type)?;
        if !registry.root_types.contains(&root.group_type) {
            return Err(TreeError::NotARootType(root.group_type));
        }
        if !def.layer {
            return Err(TreeError::invalid(format!(
                "root type {} is not a layer",
                def.name
            )));
        }

        let id = Uuid::now_v7();
        let group = Group {
            id,
            parent_id: None,
            group_type: root.group_type,
            name: root.name,
            lft: 1,
            rgt: 2,
            is_layer: true,
            layer_group_id: Some(id),
            deleted_at: None,
        };

        let mut tree = Self {
            groups: HashMap::from([(id, group)]),
            children: HashMap::new(),
            root_id: id,
        };
        tree.create_default_children(id, def, registry, &mut Vec::new())?;
        Ok(tree)
    }

    /// Build a tree from a loaded snapshot and check its invariants.
    pub fn from_groups(groups: impl IntoIterator<Item = Group>) -> Result<Self, TreeError> {
        let mut map = HashMap::new();
        let mut root_id = None;

        for group in groups {
            let id = group.id;
            if group.is_root() {
                if let Some(existing) = root_id {
                    return Err(TreeError::invalid(format!(
                        "multiple roots: {existing} and {id}"
                    )));
                }
                root_id = Some(id);
            }
            if map.insert(id, group).is_some() {
                return Err(TreeError::invalid(format!("group {id} appears twice")));
            }
        }

        let root_id = root_id.ok_or_else(|| TreeError::invalid("tree has no root"))?;

        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for group in map.values() {
            if let Some(parent_id) = group.parent_id {
                if !map.contains_key(&parent_id) {
                    return Err(TreeError::invalid(format!(
                        "group {} references missing parent {parent_id}",
                        group.id
                    )));
                }
                children.entry(parent_id).or_default().push(group.id);
            }
        }
        for siblings in children.values_mut() {
            siblings.sort_by_key(|id| map.get(id).map_or(0, |g| g.lft));
        }

        let tree = Self {
            groups: map,
            children,
            root_id,
        };
        tree.validate()?;
        Ok(tree)
    }

    /// Attach a new group below `parent_id`.
    ///
    /// The child type must be one of the parent type's possible children. The
    /// layer cache is set here and never recomputed; default children of the
    /// new type are created recursively.
    pub fn attach(
        &mut self,
        parent_id: Uuid,
        new: NewGroup,
        registry: &TypeRegistry,
    ) -> Result<Uuid, TreeError> {
        self.attach_with_defaults(parent_id, new, registry, &mut Vec::new())
    }

    fn attach_with_defaults(
        &mut self,
        parent_id: Uuid,
        new: NewGroup,
        registry: &TypeRegistry,
        defaulting: &mut Vec<String>,
    ) -> Result<Uuid, TreeError> {
        let parent = self.get(parent_id)?;
        let parent_def = registry.find_group_type(&parent.group_type)?;
        let def = registry.find_group_type(&new.group_type)?;

        if !parent_def.children.contains(&new.group_type) {
            return Err(TreeError::TypeNotAllowed {
                parent_type: parent.group_type.clone(),
                child_type: new.group_type,
            });
        }

        let id = Uuid::now_v7();
        let layer_group_id = if def.layer {
            id
        } else {
            parent.layer_group_id.ok_or_else(|| {
                TreeError::invalid(format!("group {parent_id} has no layer group"))
            })?
        };

        self.groups.insert(
            id,
            Group {
                id,
                parent_id: Some(parent_id),
                group_type: new.group_type,
                name: new.name,
                lft: 0,
                rgt: 0,
                is_layer: def.layer,
                layer_group_id: Some(layer_group_id),
                deleted_at: None,
            },
        );
        self.children.entry(parent_id).or_default().push(id);
        self.renumber();

        debug!(
            group_id = %id,
            parent_id = %parent_id,
            group_type = %def.name,
            layer_group_id = %layer_group_id,
            "Group attached"
        );

        self.create_default_children(id, def, registry, defaulting)?;
        Ok(id)
    }

    /// Soft-delete a group and everything beneath it.
    ///
    /// Returns the ids that were newly marked, in nested-set order.
    pub fn soft_delete(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<Vec<Uuid>, TreeError> {
        if id == self.root_id {
            return Err(TreeError::RootProtected);
        }
        let group = self.get(id)?;
        let (lft, rgt) = (group.lft, group.rgt);

        let mut affected: Vec<(i32, Uuid)> = self
            .groups
            .values()
            .filter(|g| g.lft >= lft && g.rgt <= rgt && !g.is_deleted())
            .map(|g| (g.lft, g.id))
            .collect();
        affected.sort_unstable();

        for (_, affected_id) in &affected {
            if let Some(group) = self.groups.get_mut(affected_id) {
                group.deleted_at = Some(at);
            }
        }

        debug!(group_id = %id, count = affected.len(), "Group subtree soft-deleted");
        Ok(affected.into_iter().map(|(_, id)| id).collect())
    }

    /// Check nested-set bounds, parent links and layer caches.
    pub fn validate(&self) -> Result<(), TreeError> {
        let root = self
            .groups
            .get(&self.root_id)
            .ok_or_else(|| TreeError::invalid("root group is missing"))?;
        if !root.is_layer {
            return Err(TreeError::invalid(format!(
                "root group {} is not a layer",
                root.id
            )));
        }
        if root.layer_group_id.is_some_and(|layer_id| layer_id != root.id) {
            return Err(TreeError::invalid(format!(
                "root group {} caches a foreign layer",
                root.id
            )));
        }

        let mut visited = 0usize;
        let mut stack = vec![(root.id, root.id)];
        while let Some((id, layer_id)) = stack.pop() {
            let group = self.lookup(id)?;
            visited += 1;

            if group.lft >= group.rgt {
                return Err(TreeError::invalid(format!(
                    "group {id} has empty bounds {}..{}",
                    group.lft, group.rgt
                )));
            }
            if !group.is_root() && group.layer_group_id != Some(layer_id) {
                return Err(TreeError::invalid(format!(
                    "group {id} caches layer {:?}, expected {layer_id}",
                    group.layer_group_id
                )));
            }

            let mut previous_rgt = None;
            for child_id in self.children.get(&id).into_iter().flatten() {
                let child = self.lookup(*child_id)?;
                if !group.is_ancestor_of(child) {
                    return Err(TreeError::invalid(format!(
                        "group {child_id} lies outside its parent {id}"
                    )));
                }
                if previous_rgt.is_some_and(|rgt| child.lft <= rgt) {
                    return Err(TreeError::invalid(format!(
                        "children of {id} have overlapping bounds"
                    )));
                }
                if group.is_deleted() && !child.is_deleted() {
                    return Err(TreeError::invalid(format!(
                        "group {child_id} is active below deleted group {id}"
                    )));
                }
                previous_rgt = Some(child.rgt);

                let child_layer = if child.is_layer { child.id } else { layer_id };
                stack.push((child.id, child_layer));
            }
        }

        if visited != self.groups.len() {
            return Err(TreeError::invalid(format!(
                "{} groups are not reachable from the root",
                self.groups.len() - visited
            )));
        }

        Ok(())
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Raw lookup, including soft-deleted groups.
    #[must_use]
    pub fn find(&self, id: Uuid) -> Option<&Group> {
        self.groups.get(&id)
    }

    /// Lookup for tree queries; deleted groups are rejected.
    pub fn get(&self, id: Uuid) -> Result<&Group, TreeError> {
        let group = self.lookup(id)?;
        if group.is_deleted() {
            return Err(TreeError::DeletedGroup(id));
        }
        Ok(group)
    }

    #[must_use]
    pub fn is_active(&self, id: Uuid) -> bool {
        self.groups.get(&id).is_some_and(|g| !g.is_deleted())
    }

    #[must_use]
    pub fn root(&self) -> &Group {
        &self.groups[&self.root_id]
    }

    #[must_use]
    pub const fn root_id(&self) -> Uuid {
        self.root_id
    }

    /// Number of groups, including soft-deleted ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Active groups in nested-set order.
    #[must_use]
    pub fn groups(&self) -> Vec<&Group> {
        let mut groups: Vec<&Group> = self.groups.values().filter(|g| !g.is_deleted()).collect();
        groups.sort_by_key(|g| g.lft);
        groups
    }

    /// All groups in nested-set order, soft-deleted ones included.
    #[must_use]
    pub fn all_groups(&self) -> Vec<&Group> {
        let mut groups: Vec<&Group> = self.groups.values().collect();
        groups.sort_by_key(|g| g.lft);
        groups
    }

    // ========================================================================
    // Hierarchy Queries
    // ========================================================================

    /// The chain from the root down to the group, both included.
    pub fn ancestors_of(&self, id: Uuid) -> Result<Vec<&Group>, TreeError> {
        let group = self.get(id)?;
        let mut chain = vec![group];
        let mut current = group;
        while let Some(parent_id) = current.parent_id {
            let parent = self.lookup(parent_id)?;
            chain.push(parent);
            current = parent;
            if chain.len() > self.groups.len() {
                return Err(TreeError::invalid("parent links form a cycle"));
            }
        }
        chain.reverse();
        Ok(chain)
    }

    pub fn is_ancestor_of(&self, ancestor: Uuid, descendant: Uuid) -> Result<bool, TreeError> {
        Ok(self.get(ancestor)?.is_ancestor_of(self.get(descendant)?))
    }

    /// The group itself when it is a layer, otherwise its cached layer group.
    pub fn layer_group_of(&self, id: Uuid) -> Result<&Group, TreeError> {
        let group = self.get(id)?;
        if group.is_layer {
            return Ok(group);
        }
        let layer_id = group
            .layer_group_id
            .ok_or_else(|| TreeError::invalid(format!("group {id} has no layer group")))?;
        self.get(layer_id)
    }

    /// Layers on the chain from the root to the group, top-down.
    pub fn layer_hierarchy_of(&self, id: Uuid) -> Result<Vec<&Group>, TreeError> {
        Ok(self
            .ancestors_of(id)?
            .into_iter()
            .filter(|g| g.is_layer)
            .collect())
    }

    /// The layer hierarchy without the group's own layer.
    pub fn upper_layer_groups(&self, id: Uuid) -> Result<Vec<&Group>, TreeError> {
        let own_layer = self.layer_group_of(id)?.id;
        Ok(self
            .layer_hierarchy_of(id)?
            .into_iter()
            .filter(|g| g.id != own_layer)
            .collect())
    }

    /// Active groups sharing the group's layer, the layer itself included.
    pub fn groups_in_same_layer(&self, id: Uuid) -> Result<Vec<&Group>, TreeError> {
        let layer_id = self.layer_group_of(id)?.id;
        let mut groups: Vec<&Group> = self
            .groups
            .values()
            .filter(|g| !g.is_deleted() && g.layer_group_id == Some(layer_id))
            .collect();
        groups.sort_by_key(|g| g.lft);
        Ok(groups)
    }

    /// Active strict descendants in nested-set order.
    pub fn descendants_of(&self, id: Uuid) -> Result<Vec<&Group>, TreeError> {
        let group = self.get(id)?;
        let mut groups: Vec<&Group> = self
            .groups
            .values()
            .filter(|g| !g.is_deleted() && group.is_ancestor_of(g))
            .collect();
        groups.sort_by_key(|g| g.lft);
        Ok(groups)
    }

    /// Active children ordered by the parent type's child order, then by name.
    pub fn children_of(&self, id: Uuid, registry: &TypeRegistry) -> Result<Vec<&Group>, TreeError> {
        let group = self.get(id)?;
        let order = &registry.find_group_type(&group.group_type)?.children;
        let rank = |g: &Group| {
            order
                .iter()
                .position(|t| *t == g.group_type)
                .unwrap_or(order.len())
        };

        let mut children: Vec<&Group> = self
            .children
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|child_id| self.groups.get(child_id))
            .filter(|g| !g.is_deleted())
            .collect();
        children.sort_by(|a, b| rank(*a).cmp(&rank(*b)).then_with(|| a.name.cmp(&b.name)));
        Ok(children)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn lookup(&self, id: Uuid) -> Result<&Group, TreeError> {
        self.groups.get(&id).ok_or(TreeError::UnknownGroup(id))
    }

    /// `defaulting` holds the types whose default children are being created
    /// further up; meeting one of them again means the table never terminates.
    fn create_default_children(
        &mut self,
        parent_id: Uuid,
        def: &GroupTypeDef,
        registry: &TypeRegistry,
        defaulting: &mut Vec<String>,
    ) -> Result<(), TreeError> {
        if def.default_children.is_empty() {
            return Ok(());
        }
        defaulting.push(def.name.clone());
        for group_type in &def.default_children {
            if defaulting.contains(group_type) {
                return Err(TreeError::invalid(format!(
                    "default children of {} form a cycle through {group_type}",
                    def.name
                )));
            }
            self.attach_with_defaults(
                parent_id,
                NewGroup::new(group_type.clone(), default_group_name(group_type)),
                registry,
                defaulting,
            )?;
        }
        defaulting.pop();
        Ok(())
    }

    fn renumber(&mut self) {
        let mut bounds = Vec::with_capacity(self.groups.len());
        let mut counter = 0;
        self.number(self.root_id, &mut counter, &mut bounds);
        for (id, lft, rgt) in bounds {
            if let Some(group) = self.groups.get_mut(&id) {
                group.lft = lft;
                group.rgt = rgt;
            }
        }
    }

    fn number(&self, id: Uuid, counter: &mut i32, bounds: &mut Vec<(Uuid, i32, i32)>) {
        *counter += 1;
        let lft = *counter;
        for child in self.children.get(&id).into_iter().flatten() {
            self.number(*child, counter, bounds);
        }
        *counter += 1;
        bounds.push((id, lft, *counter));
    }
}

/// Drop every group that has a strict ancestor in the same set.
///
/// Stable on input order; repeated ids keep their first occurrence.
#[must_use]
pub fn collapse_to_highest<'a>(groups: &[&'a Group]) -> Vec<&'a Group> {
    let mut seen = HashSet::new();
    groups
        .iter()
        .copied()
        .filter(|group| seen.insert(group.id))
        .filter(|group| !groups.iter().any(|other| other.is_ancestor_of(group)))
        .collect()
}

/// "canton_board" -> "Canton board"
fn default_group_name(group_type: &str) -> String {
    let spaced = group_type.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{registry, sample_tree};

    #[test]
    fn test_new_tree_creates_default_children() {
        let registry = registry();
        let tree = GroupTree::new(NewGroup::new("federation", "Federation"), &registry).unwrap();

        assert_eq!(tree.len(), 2);
        let children = tree.children_of(tree.root_id(), &registry).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].group_type, "federal_board");
        assert_eq!(children[0].name, "Federal board");
        assert_eq!(tree.root().lft, 1);
        assert_eq!(tree.root().rgt, 4);
        tree.validate().unwrap();
    }

    #[test]
    fn test_default_children_cycle_is_an_error() {
        // assembled in code, so never passed through TypeRegistry::validate
        let registry = TypeRegistry::default()
            .with_root("top")
            .with_group_type(GroupTypeDef::layer("top").children(["unit"]).default_children(["unit"]))
            .with_group_type(GroupTypeDef::new("unit").children(["unit"]).default_children(["unit"]));

        let result = GroupTree::new(NewGroup::new("top", "Top"), &registry);
        assert!(matches!(
            result,
            Err(TreeError::InvalidTreeState(msg)) if msg.contains("cycle")
        ));
    }

    #[test]
    fn test_root_must_be_a_root_type() {
        let registry = registry();
        let result = GroupTree::new(NewGroup::new("canton", "Bern"), &registry);
        assert_eq!(result.unwrap_err(), TreeError::NotARootType("canton".into()));

        let result = GroupTree::new(NewGroup::new("nope", "Nope"), &registry);
        assert_eq!(result.unwrap_err(), TreeError::UnknownGroupType("nope".into()));
    }

    #[test]
    fn test_attach_rejects_disallowed_child_type() {
        let registry = registry();
        let mut sample = sample_tree();

        let result = sample
            .tree
            .attach(sample.wolves, NewGroup::new("canton", "Nested"), &registry);
        assert_eq!(
            result.unwrap_err(),
            TreeError::TypeNotAllowed {
                parent_type: "troop".into(),
                child_type: "canton".into(),
            }
        );
    }

    #[test]
    fn test_attach_keeps_bounds_valid() {
        let registry = registry();
        let mut sample = sample_tree();

        let spiez = sample
            .tree
            .attach(sample.oberland, NewGroup::new("flock", "Spiez"), &registry)
            .unwrap();

        sample.tree.validate().unwrap();
        let oberland = sample.tree.get(sample.oberland).unwrap();
        let spiez = sample.tree.get(spiez).unwrap();
        assert!(oberland.is_ancestor_of(spiez));
        assert!(sample.tree.root().is_ancestor_of(spiez));
    }

    #[test]
    fn test_layer_group_id_is_assigned_on_attach() {
        let sample = sample_tree();
        let tree = &sample.tree;

        assert_eq!(tree.get(sample.oberland).unwrap().layer_group_id, Some(sample.bern));
        assert_eq!(tree.get(sample.thun).unwrap().layer_group_id, Some(sample.thun));
        assert_eq!(tree.get(sample.wolves).unwrap().layer_group_id, Some(sample.thun));
        assert_eq!(
            tree.get(sample.federal_board).unwrap().layer_group_id,
            Some(sample.federation)
        );
    }

    #[test]
    fn test_ancestors_of_runs_root_to_self() {
        let sample = sample_tree();
        let ids: Vec<Uuid> = sample
            .tree
            .ancestors_of(sample.wolves)
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();

        assert_eq!(
            ids,
            vec![sample.federation, sample.bern, sample.oberland, sample.thun, sample.wolves]
        );
    }

    #[test]
    fn test_is_ancestor_of_is_strict() {
        let sample = sample_tree();
        let tree = &sample.tree;

        assert!(tree.is_ancestor_of(sample.bern, sample.wolves).unwrap());
        assert!(!tree.is_ancestor_of(sample.wolves, sample.bern).unwrap());
        assert!(!tree.is_ancestor_of(sample.bern, sample.bern).unwrap());
        assert!(!tree.is_ancestor_of(sample.bern, sample.uster).unwrap());
    }

    #[test]
    fn test_layer_group_of_is_idempotent() {
        let sample = sample_tree();
        let tree = &sample.tree;

        for group in tree.groups() {
            let layer = tree.layer_group_of(group.id).unwrap();
            assert!(layer.is_layer);
            assert_eq!(tree.layer_group_of(layer.id).unwrap().id, layer.id);
        }
    }

    #[test]
    fn test_layer_hierarchy_and_upper_layers() {
        let sample = sample_tree();
        let tree = &sample.tree;

        let hierarchy: Vec<Uuid> = tree
            .layer_hierarchy_of(sample.wolves)
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(hierarchy, vec![sample.federation, sample.bern, sample.thun]);

        let upper: Vec<Uuid> = tree
            .upper_layer_groups(sample.wolves)
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(upper, vec![sample.federation, sample.bern]);

        // a layer's own layer is itself, so it is excluded as well
        let upper: Vec<Uuid> = tree
            .upper_layer_groups(sample.bern)
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(upper, vec![sample.federation]);

        assert!(tree.upper_layer_groups(sample.federation).unwrap().is_empty());
    }

    #[test]
    fn test_groups_in_same_layer() {
        let sample = sample_tree();
        let ids: Vec<Uuid> = sample
            .tree
            .groups_in_same_layer(sample.oberland)
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();

        assert_eq!(ids, vec![sample.bern, sample.bern_board, sample.oberland]);

        // Uster is a layer of its own
        let ids: Vec<Uuid> = sample
            .tree
            .groups_in_same_layer(sample.zurich_board)
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec![sample.zurich, sample.zurich_board]);
    }

    #[test]
    fn test_collapse_to_highest_drops_nested_layers() {
        let sample = sample_tree();
        let tree = &sample.tree;
        let federation = tree.get(sample.federation).unwrap();
        let bern = tree.get(sample.bern).unwrap();
        let thun = tree.get(sample.thun).unwrap();
        let zurich = tree.get(sample.zurich).unwrap();

        let collapsed = collapse_to_highest(&[bern, thun]);
        assert_eq!(collapsed, vec![bern]);

        let collapsed = collapse_to_highest(&[thun, zurich, bern]);
        assert_eq!(collapsed, vec![zurich, bern]);

        let collapsed = collapse_to_highest(&[thun, federation, zurich]);
        assert_eq!(collapsed, vec![federation]);

        assert!(collapse_to_highest(&[]).is_empty());
    }

    #[test]
    fn test_collapse_to_highest_covers_every_input_exactly_once() {
        let sample = sample_tree();
        let all = sample.tree.groups();
        let collapsed = collapse_to_highest(&all);

        for group in &all {
            let covering = collapsed
                .iter()
                .filter(|top| top.id == group.id || top.is_ancestor_of(group))
                .count();
            assert_eq!(covering, 1, "group {} covered {covering} times", group.name);
        }
        for a in &collapsed {
            assert!(!collapsed.iter().any(|b| b.is_ancestor_of(a)));
        }
    }

    #[test]
    fn test_collapse_to_highest_dedupes_repeats() {
        let sample = sample_tree();
        let bern = sample.tree.get(sample.bern).unwrap();

        assert_eq!(collapse_to_highest(&[bern, bern]), vec![bern]);
    }

    #[test]
    fn test_soft_delete_hides_subtree() {
        let mut sample = sample_tree();
        let deleted = sample.tree.soft_delete(sample.oberland, Utc::now()).unwrap();

        assert_eq!(deleted, vec![sample.oberland, sample.thun, sample.wolves]);
        assert_eq!(
            sample.tree.get(sample.wolves).unwrap_err(),
            TreeError::DeletedGroup(sample.wolves)
        );
        assert!(!sample.tree.is_active(sample.thun));
        assert!(sample.tree.find(sample.thun).is_some());
        assert!(sample
            .tree
            .descendants_of(sample.bern)
            .unwrap()
            .iter()
            .all(|g| g.id == sample.bern_board));
        sample.tree.validate().unwrap();
    }

    #[test]
    fn test_root_cannot_be_deleted() {
        let mut sample = sample_tree();
        let root = sample.tree.root_id();
        assert_eq!(
            sample.tree.soft_delete(root, Utc::now()).unwrap_err(),
            TreeError::RootProtected
        );
    }

    #[test]
    fn test_unknown_group_lookup_fails() {
        let sample = sample_tree();
        let missing = Uuid::now_v7();
        assert_eq!(
            sample.tree.ancestors_of(missing).unwrap_err(),
            TreeError::UnknownGroup(missing)
        );
    }

    #[test]
    fn test_children_of_orders_by_type_then_name() {
        let registry = registry();
        let mut sample = sample_tree();
        sample
            .tree
            .attach(sample.bern, NewGroup::new("flock", "Aarberg"), &registry)
            .unwrap();

        let types: Vec<(&str, &str)> = sample
            .tree
            .children_of(sample.bern, &registry)
            .unwrap()
            .iter()
            .map(|g| (g.group_type.as_str(), g.name.as_str()))
            .collect();
        assert_eq!(
            types,
            vec![
                ("canton_board", "Canton board"),
                ("region", "Oberland"),
                ("flock", "Aarberg"),
            ]
        );
    }

    #[test]
    fn test_from_groups_roundtrip() {
        let sample = sample_tree();
        let groups: Vec<Group> = sample.tree.all_groups().into_iter().cloned().collect();
        let rebuilt = GroupTree::from_groups(groups).unwrap();

        assert_eq!(rebuilt.len(), sample.tree.len());
        assert_eq!(rebuilt.root_id(), sample.tree.root_id());
    }

    #[test]
    fn test_from_groups_rejects_broken_bounds() {
        let sample = sample_tree();
        let mut groups: Vec<Group> = sample.tree.all_groups().into_iter().cloned().collect();
        let wolves = groups.iter_mut().find(|g| g.id == sample.wolves).unwrap();
        wolves.rgt += 100;

        assert!(matches!(
            GroupTree::from_groups(groups),
            Err(TreeError::InvalidTreeState(msg)) if msg.contains("outside its parent")
        ));
    }

    #[test]
    fn test_from_groups_rejects_missing_layer_cache() {
        let sample = sample_tree();
        let mut groups: Vec<Group> = sample.tree.all_groups().into_iter().cloned().collect();
        let oberland = groups.iter_mut().find(|g| g.id == sample.oberland).unwrap();
        oberland.layer_group_id = None;

        assert!(matches!(
            GroupTree::from_groups(groups),
            Err(TreeError::InvalidTreeState(msg)) if msg.contains("caches layer")
        ));
    }

    #[test]
    fn test_from_groups_rejects_second_root() {
        let sample = sample_tree();
        let mut groups: Vec<Group> = sample.tree.all_groups().into_iter().cloned().collect();
        let uster = groups.iter_mut().find(|g| g.id == sample.uster).unwrap();
        uster.parent_id = None;

        assert!(matches!(
            GroupTree::from_groups(groups),
            Err(TreeError::InvalidTreeState(msg)) if msg.contains("multiple roots")
        ));
    }

    #[test]
    fn test_default_group_name() {
        assert_eq!(default_group_name("canton_board"), "Canton board");
        assert_eq!(default_group_name(""), "");
    }
}
