//! Reusable helpers for visibility integration tests.
//!
//! Builds an in-memory organization from the sample type table, plus a
//! population of people and roles to run predicates against.
#![allow(dead_code)]

use chrono::Utc;
use roster_common::Person;
use roster_server::groups::{GroupTree, NewGroup, TypeRegistry};
use roster_server::people::{filter_visible, Role};
use roster_server::permissions::Predicate;
use uuid::Uuid;

/// Load the type table shipped with the server.
pub fn registry() -> TypeRegistry {
    TypeRegistry::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/group_types.json"))
        .expect("Failed to load type table")
}

// ============================================================================
// Organization
// ============================================================================

/// A tree under construction together with its type table.
pub struct Org {
    pub registry: TypeRegistry,
    pub tree: GroupTree,
}

impl Org {
    /// A federation with its default board.
    pub fn new() -> Self {
        let registry = registry();
        let tree = GroupTree::new(NewGroup::new("federation", "Federation"), &registry)
            .expect("Failed to create root");
        Self { registry, tree }
    }

    pub fn root(&self) -> Uuid {
        self.tree.root_id()
    }

    pub fn add(&mut self, parent: Uuid, group_type: &str, name: &str) -> Uuid {
        self.tree
            .attach(parent, NewGroup::new(group_type, name), &self.registry)
            .expect("Failed to attach group")
    }

    /// First child of the given type, e.g. a default board.
    pub fn child_of_type(&self, parent: Uuid, group_type: &str) -> Uuid {
        self.tree
            .children_of(parent, &self.registry)
            .expect("Parent not found")
            .into_iter()
            .find(|g| g.group_type == group_type)
            .expect("Child not found")
            .id
    }
}

// ============================================================================
// Population
// ============================================================================

/// People and their roles.
#[derive(Default)]
pub struct Population {
    pub people: Vec<Person>,
    pub roles: Vec<Role>,
}

impl Population {
    pub fn add(&mut self, first_name: &str, contact_data_visible: bool, roles: &[(Uuid, &str)]) -> Person {
        let person = Person {
            id: Uuid::now_v7(),
            first_name: Some(first_name.to_string()),
            last_name: Some("Test".to_string()),
            nickname: None,
            company_name: None,
            email: Some(format!("{}@example.com", first_name.to_lowercase())),
            address: None,
            zip_code: None,
            town: None,
            country: None,
            contact_data_visible,
            gender: None,
            birthday: None,
            additional_information: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        for (group_id, role_type) in roles {
            self.roles.push(Role::new(person.id, *group_id, *role_type));
        }
        self.people.push(person.clone());
        person
    }

    pub fn roles_of(&self, person_id: Uuid) -> Vec<Role> {
        self.roles
            .iter()
            .filter(|r| r.person_id == person_id)
            .cloned()
            .collect()
    }

    /// First names of everyone matching the predicate, sorted.
    pub fn names_matching(&self, tree: &GroupTree, predicate: &Predicate) -> Vec<String> {
        let mut names: Vec<String> = filter_visible(&self.people, &self.roles, tree, predicate)
            .expect("Failed to evaluate predicate")
            .into_iter()
            .filter_map(|p| p.first_name.clone())
            .collect();
        names.sort();
        names
    }
}
