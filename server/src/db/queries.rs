//! Database Queries
//!
//! Runtime queries (no compile-time `DATABASE_URL` required).
//!
//! All query functions include error context logging to aid debugging.

use chrono::{DateTime, Utc};
use roster_common::Person;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use tracing::{error, info};
use uuid::Uuid;

use super::models::{gender_to_db, GroupRow, PersonRow, RoleRow};
use super::SnapshotError;
use crate::config::Config;
use crate::groups::{Group, GroupTree, RoleRegistry, TreeError, TypeRegistry};
use crate::people::Role;
use crate::permissions::{Predicate, UserContext};

/// Log and return a database error with context.
///
/// This helper ensures all database errors are logged with relevant context
/// before being propagated, making production debugging easier.
macro_rules! db_error {
    ($query:expr) => {
        |e| {
            error!(query = $query, error = %e, "Database query failed");
            e
        }
    };
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            e
        }
    };
}

const GROUP_COLUMNS: &str =
    "id, parent_id, group_type, name, lft, rgt, is_layer, layer_group_id, deleted_at";

const PERSON_COLUMNS: &str = "p.id, p.first_name, p.last_name, p.nickname, p.company_name, \
     p.email, p.address, p.zip_code, p.town, p.country, p.contact_data_visible, p.gender, \
     p.birthday, p.additional_information, p.created_at, p.updated_at";

// ============================================================================
// Group Queries
// ============================================================================

/// Load every group, soft-deleted ones included, in nested-set order.
#[tracing::instrument(skip(pool))]
pub async fn load_groups(pool: &PgPool) -> sqlx::Result<Vec<Group>> {
    let rows = sqlx::query_as::<_, GroupRow>(&format!(
        "SELECT {GROUP_COLUMNS} FROM groups ORDER BY lft"
    ))
    .fetch_all(pool)
    .await
    .map_err(db_error!("load_groups"))?;

    Ok(rows.into_iter().map(Group::from).collect())
}

/// Load the whole tree and check it against the type table.
#[tracing::instrument(skip(pool, registry))]
pub async fn load_tree(pool: &PgPool, registry: &TypeRegistry) -> Result<GroupTree, SnapshotError> {
    let groups = load_groups(pool).await?;

    for group in &groups {
        let def = registry.find_group_type(&group.group_type)?;
        if def.layer != group.is_layer {
            return Err(TreeError::InvalidTreeState(format!(
                "group {} has is_layer = {} but type {} says {}",
                group.id, group.is_layer, def.name, def.layer
            ))
            .into());
        }
    }

    let tree = GroupTree::from_groups(groups)?;
    info!(groups = tree.len(), "Group tree loaded");
    Ok(tree)
}

/// Insert a group, or update the mutable columns of an existing one.
pub async fn insert_group<'e, E>(executor: E, group: &Group) -> sqlx::Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r"
        INSERT INTO groups (id, parent_id, group_type, name, lft, rgt, is_layer, layer_group_id, deleted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            lft = EXCLUDED.lft,
            rgt = EXCLUDED.rgt,
            deleted_at = EXCLUDED.deleted_at,
            updated_at = NOW()
        ",
    )
    .bind(group.id)
    .bind(group.parent_id)
    .bind(&group.group_type)
    .bind(&group.name)
    .bind(group.lft)
    .bind(group.rgt)
    .bind(group.is_layer)
    .bind(group.layer_group_id)
    .bind(group.deleted_at)
    .execute(executor)
    .await
    .map_err(db_error!("insert_group", group_id = %group.id))?;

    Ok(())
}

/// Write the whole tree in one transaction.
///
/// Attaching a group renumbers every bound, so the tree is always saved as a
/// unit. Groups are written parents first.
#[tracing::instrument(skip(pool, tree), fields(groups = tree.len()))]
pub async fn save_tree(pool: &PgPool, tree: &GroupTree) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    for group in tree.all_groups() {
        insert_group(&mut *tx, group).await?;
    }
    tx.commit().await?;
    Ok(())
}

// ============================================================================
// Person Queries
// ============================================================================

/// Find person by ID.
pub async fn find_person(pool: &PgPool, id: Uuid) -> Result<Person, SnapshotError> {
    let row = sqlx::query_as::<_, PersonRow>(&format!(
        "SELECT {PERSON_COLUMNS} FROM people p WHERE p.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(db_error!("find_person", person_id = %id))?;

    row.map(Person::from).ok_or(SnapshotError::UnknownPerson(id))
}

/// Find person by email, ignoring case.
pub async fn find_person_by_email(pool: &PgPool, email: &str) -> sqlx::Result<Option<Person>> {
    let row = sqlx::query_as::<_, PersonRow>(&format!(
        "SELECT {PERSON_COLUMNS} FROM people p WHERE LOWER(p.email) = LOWER($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(db_error!("find_person_by_email"))?;

    Ok(row.map(Person::from))
}

/// Insert a person.
pub async fn insert_person(pool: &PgPool, person: &Person) -> sqlx::Result<()> {
    sqlx::query(
        r"
        INSERT INTO people (
            id, first_name, last_name, nickname, company_name, email, address, zip_code,
            town, country, contact_data_visible, gender, birthday, additional_information,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        ",
    )
    .bind(person.id)
    .bind(&person.first_name)
    .bind(&person.last_name)
    .bind(&person.nickname)
    .bind(&person.company_name)
    .bind(&person.email)
    .bind(&person.address)
    .bind(&person.zip_code)
    .bind(&person.town)
    .bind(&person.country)
    .bind(person.contact_data_visible)
    .bind(person.gender.map(gender_to_db))
    .bind(person.birthday)
    .bind(&person.additional_information)
    .bind(person.created_at)
    .bind(person.updated_at)
    .execute(pool)
    .await
    .map_err(db_error!("insert_person", person_id = %person.id))?;

    Ok(())
}

// ============================================================================
// Role Queries
// ============================================================================

/// Unrevoked roles of one person. Roles in deleted groups are included; the
/// tree decides whether they still count.
#[tracing::instrument(skip(pool))]
pub async fn load_roles_for_person(pool: &PgPool, person_id: Uuid) -> sqlx::Result<Vec<Role>> {
    let rows = sqlx::query_as::<_, RoleRow>(
        r"
        SELECT id, person_id, group_id, role_type, label, created_at, deleted_at
        FROM roles
        WHERE person_id = $1 AND deleted_at IS NULL
        ORDER BY created_at
        ",
    )
    .bind(person_id)
    .fetch_all(pool)
    .await
    .map_err(db_error!("load_roles_for_person", person_id = %person_id))?;

    Ok(rows.into_iter().map(Role::from).collect())
}

/// Active roles of the given people (bulk lookup to avoid N+1 queries).
#[tracing::instrument(skip(pool, person_ids), fields(people = person_ids.len()))]
pub async fn load_active_roles(pool: &PgPool, person_ids: &[Uuid]) -> sqlx::Result<Vec<Role>> {
    if person_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, RoleRow>(
        r"
        SELECT r.id, r.person_id, r.group_id, r.role_type, r.label, r.created_at, r.deleted_at
        FROM roles r
        INNER JOIN groups g ON g.id = r.group_id
        WHERE r.person_id = ANY($1) AND r.deleted_at IS NULL AND g.deleted_at IS NULL
        ORDER BY r.created_at
        ",
    )
    .bind(person_ids)
    .fetch_all(pool)
    .await
    .map_err(db_error!("load_active_roles"))?;

    Ok(rows.into_iter().map(Role::from).collect())
}

/// Insert a role after checking it against the type table.
///
/// The holder's own `contact_data_visible` flag is left alone; what a role
/// grants is derived when the viewer context is built.
#[tracing::instrument(skip(pool, role, registry), fields(role_id = %role.id, role_type = %role.role_type))]
pub async fn insert_role<R: RoleRegistry>(
    pool: &PgPool,
    role: &Role,
    registry: &R,
) -> Result<(), SnapshotError> {
    if registry.role_permissions(&role.role_type).is_none() {
        return Err(TreeError::UnknownRoleType(role.role_type.clone()).into());
    }

    let mut tx = pool.begin().await?;

    let group_type: Option<String> =
        sqlx::query_scalar("SELECT group_type FROM groups WHERE id = $1 AND deleted_at IS NULL")
            .bind(role.group_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error!("insert_role.group", group_id = %role.group_id))?;
    let group_type = group_type.ok_or(TreeError::UnknownGroup(role.group_id))?;

    if !registry.group_type_allows_role(&group_type, &role.role_type) {
        return Err(SnapshotError::RoleNotAllowed {
            group_type,
            role_type: role.role_type.clone(),
        });
    }

    sqlx::query(
        r"
        INSERT INTO roles (id, person_id, group_id, role_type, label, created_at, deleted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ",
    )
    .bind(role.id)
    .bind(role.person_id)
    .bind(role.group_id)
    .bind(&role.role_type)
    .bind(&role.label)
    .bind(role.created_at)
    .bind(role.deleted_at)
    .execute(&mut *tx)
    .await
    .map_err(db_error!("insert_role", person_id = %role.person_id))?;

    tx.commit().await?;
    Ok(())
}

/// Revoke a role. Returns `false` when it was unknown or already revoked.
pub async fn soft_delete_role(pool: &PgPool, role_id: Uuid, at: DateTime<Utc>) -> sqlx::Result<bool> {
    let result =
        sqlx::query("UPDATE roles SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
            .bind(role_id)
            .bind(at)
            .execute(pool)
            .await
            .map_err(db_error!("soft_delete_role", role_id = %role_id))?;

    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Visibility Queries
// ============================================================================

/// Build the viewer's context from their stored roles.
#[tracing::instrument(skip(pool, tree, registry, config))]
pub async fn load_user_context<R: RoleRegistry>(
    pool: &PgPool,
    person_id: Uuid,
    tree: &GroupTree,
    registry: &R,
    config: &Config,
) -> Result<UserContext, SnapshotError> {
    let person = find_person(pool, person_id).await?;
    let roles = load_roles_for_person(pool, person_id).await?;
    let context = UserContext::for_person(&person, &roles, tree, registry)?
        .with_root(config.is_root_email(person.email.as_deref()));
    Ok(context)
}

/// People matching a visibility predicate, ordered by name.
#[tracing::instrument(skip(pool, predicate))]
pub async fn list_people_matching(
    pool: &PgPool,
    predicate: &Predicate,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Person>> {
    if predicate.is_never() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {PERSON_COLUMNS} FROM people p WHERE "));
    push_predicate(&mut builder, predicate);
    builder.push(" ORDER BY p.last_name, p.first_name, p.id LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));
    builder.push(" OFFSET ");
    builder.push_bind(offset.max(0));

    let rows: Vec<PersonRow> = builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(db_error!("list_people_matching"))?;

    Ok(rows.into_iter().map(Person::from).collect())
}

/// Render a predicate as a SQL condition over `people p`.
///
/// Inside [`Predicate::HasActiveRole`] the role and its group are in scope
/// as `r` and `g`. Role atoms outside that scope render as `FALSE`, as do
/// empty id sets.
pub fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    push_node(builder, predicate, false);
}

fn push_node(builder: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate, in_role: bool) {
    match predicate {
        Predicate::Always => {
            builder.push("TRUE");
        }
        Predicate::Never => {
            builder.push("FALSE");
        }
        Predicate::PersonIs { id } => {
            builder.push("p.id = ");
            builder.push_bind(*id);
        }
        Predicate::ContactDataVisible => {
            builder.push("p.contact_data_visible");
        }
        Predicate::GroupIn { ids } if in_role && !ids.is_empty() => {
            builder.push("r.group_id = ANY(");
            builder.push_bind(ids.clone());
            builder.push(")");
        }
        Predicate::LayerIn { ids } if in_role && !ids.is_empty() => {
            builder.push("g.layer_group_id = ANY(");
            builder.push_bind(ids.clone());
            builder.push(")");
        }
        Predicate::GroupWithin { lft, rgt } if in_role => {
            builder.push("(g.lft >= ");
            builder.push_bind(*lft);
            builder.push(" AND g.rgt <= ");
            builder.push_bind(*rgt);
            builder.push(")");
        }
        Predicate::RoleTypeIn { types } if in_role && !types.is_empty() => {
            builder.push("r.role_type = ANY(");
            builder.push_bind(types.clone());
            builder.push(")");
        }
        Predicate::GroupIn { .. }
        | Predicate::LayerIn { .. }
        | Predicate::GroupWithin { .. }
        | Predicate::RoleTypeIn { .. } => {
            builder.push("FALSE");
        }
        Predicate::And { all } => push_joined(builder, all, " AND ", "TRUE", in_role),
        Predicate::Or { any } => push_joined(builder, any, " OR ", "FALSE", in_role),
        Predicate::HasActiveRole { filter } => {
            builder.push(
                "EXISTS (SELECT 1 FROM roles r INNER JOIN groups g ON g.id = r.group_id \
                 WHERE r.person_id = p.id AND r.deleted_at IS NULL AND g.deleted_at IS NULL AND ",
            );
            push_node(builder, filter, true);
            builder.push(")");
        }
    }
}

fn push_joined(
    builder: &mut QueryBuilder<'_, Postgres>,
    parts: &[Predicate],
    separator: &str,
    empty: &str,
    in_role: bool,
) {
    if parts.is_empty() {
        builder.push(empty);
        return;
    }
    builder.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            builder.push(separator);
        }
        push_node(builder, part, in_role);
    }
    builder.push(")");
}

#[cfg(test)]
mod sql_tests {
    use super::*;

    fn render(predicate: &Predicate) -> String {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("");
        push_predicate(&mut builder, predicate);
        builder.sql().to_string()
    }

    #[test]
    fn test_person_atoms() {
        assert_eq!(render(&Predicate::Always), "TRUE");
        assert_eq!(render(&Predicate::Never), "FALSE");
        assert_eq!(render(&Predicate::ContactDataVisible), "p.contact_data_visible");
        assert_eq!(render(&Predicate::PersonIs { id: Uuid::now_v7() }), "p.id = $1");
    }

    #[test]
    fn test_role_atoms_outside_scope_are_false() {
        assert_eq!(render(&Predicate::GroupIn { ids: vec![Uuid::now_v7()] }), "FALSE");
        assert_eq!(render(&Predicate::GroupWithin { lft: 1, rgt: 4 }), "FALSE");
    }

    #[test]
    fn test_has_active_role_opens_role_scope() {
        let sql = render(&Predicate::has_active_role(Predicate::And {
            all: vec![
                Predicate::Or {
                    any: vec![Predicate::GroupWithin { lft: 2, rgt: 9 }],
                },
                Predicate::RoleTypeIn {
                    types: vec!["troop_leader".into()],
                },
            ],
        }));

        assert!(sql.starts_with("EXISTS (SELECT 1 FROM roles r INNER JOIN groups g"));
        assert!(sql.contains("r.deleted_at IS NULL AND g.deleted_at IS NULL"));
        assert!(sql.ends_with("(((g.lft >= $1 AND g.rgt <= $2)) AND r.role_type = ANY($3)))"));
    }

    #[test]
    fn test_empty_sets_render_false() {
        assert_eq!(
            render(&Predicate::has_active_role(Predicate::LayerIn { ids: vec![] })),
            "EXISTS (SELECT 1 FROM roles r INNER JOIN groups g ON g.id = r.group_id \
             WHERE r.person_id = p.id AND r.deleted_at IS NULL AND g.deleted_at IS NULL AND FALSE)"
        );
        assert_eq!(render(&Predicate::Or { any: vec![] }), "FALSE");
        assert_eq!(render(&Predicate::And { all: vec![] }), "TRUE");
    }

    #[test]
    fn test_disjunction_shape() {
        let sql = render(&Predicate::Or {
            any: vec![
                Predicate::ContactDataVisible,
                Predicate::has_active_role(Predicate::GroupIn {
                    ids: vec![Uuid::now_v7()],
                }),
                Predicate::PersonIs { id: Uuid::now_v7() },
            ],
        });

        assert!(sql.starts_with("(p.contact_data_visible OR EXISTS ("));
        assert!(sql.contains("r.group_id = ANY($1)"));
        assert!(sql.ends_with(" OR p.id = $2)"));
    }
}
