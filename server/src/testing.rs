//! Shared fixtures for unit tests.

use chrono::Utc;
use roster_common::Person;
use uuid::Uuid;

use crate::groups::{GroupTree, NewGroup, TypeRegistry};

pub const GROUP_TYPES: &str = include_str!("../config/group_types.json");

pub fn registry() -> TypeRegistry {
    TypeRegistry::from_json(GROUP_TYPES).expect("sample type table is valid")
}

/// Ids of the sample organization.
///
/// ```text
/// Federation (layer)
/// +- Federal board
/// +- Bern (layer)
/// |  +- Canton board
/// |  +- Oberland (region)
/// |     +- Thun (layer)
/// |        +- Wolves (troop)
/// +- Zurich (layer)
///    +- Canton board
///    +- Uster (layer)
///       +- Foxes (troop)
/// ```
pub struct SampleTree {
    pub tree: GroupTree,
    pub federation: Uuid,
    pub federal_board: Uuid,
    pub bern: Uuid,
    pub bern_board: Uuid,
    pub oberland: Uuid,
    pub thun: Uuid,
    pub wolves: Uuid,
    pub zurich: Uuid,
    pub zurich_board: Uuid,
    pub uster: Uuid,
    pub foxes: Uuid,
}

pub fn sample_tree() -> SampleTree {
    let registry = registry();
    let mut tree = GroupTree::new(NewGroup::new("federation", "Federation"), &registry)
        .expect("root is created");
    let federation = tree.root_id();
    let federal_board = default_child(&tree, &registry, federation);

    let bern = attach(&mut tree, &registry, federation, "canton", "Bern");
    let bern_board = default_child(&tree, &registry, bern);
    let oberland = attach(&mut tree, &registry, bern, "region", "Oberland");
    let thun = attach(&mut tree, &registry, oberland, "flock", "Thun");
    let wolves = attach(&mut tree, &registry, thun, "troop", "Wolves");

    let zurich = attach(&mut tree, &registry, federation, "canton", "Zurich");
    let zurich_board = default_child(&tree, &registry, zurich);
    let uster = attach(&mut tree, &registry, zurich, "flock", "Uster");
    let foxes = attach(&mut tree, &registry, uster, "troop", "Foxes");

    SampleTree {
        tree,
        federation,
        federal_board,
        bern,
        bern_board,
        oberland,
        thun,
        wolves,
        zurich,
        zurich_board,
        uster,
        foxes,
    }
}

fn attach(
    tree: &mut GroupTree,
    registry: &TypeRegistry,
    parent: Uuid,
    group_type: &str,
    name: &str,
) -> Uuid {
    tree.attach(parent, NewGroup::new(group_type, name), registry)
        .expect("sample group is attached")
}

fn default_child(tree: &GroupTree, registry: &TypeRegistry, parent: Uuid) -> Uuid {
    tree.children_of(parent, registry)
        .expect("parent exists")
        .first()
        .expect("default child exists")
        .id
}

pub fn person(first_name: &str, contact_data_visible: bool) -> Person {
    Person {
        id: Uuid::now_v7(),
        first_name: Some(first_name.to_string()),
        last_name: Some("Muster".to_string()),
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
    }
}
