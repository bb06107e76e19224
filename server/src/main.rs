//! Roster Check - Main Entry Point
//!
//! Validates the stored group tree against the type table and, given a
//! viewer id, prints the people that viewer may see.
//!
//! ```text
//! roster-check [VIEWER_ID [GROUP_ID]]
//! ```

use anyhow::{Context, Result};
use roster_common::Person;
use tracing::info;
use uuid::Uuid;

use roster_server::groups::TypeRegistry;
use roster_server::{config, db, observability, permissions};

const LIST_LIMIT: i64 = 1000;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    observability::init_tracing(config.log_format);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting roster check");

    let registry = TypeRegistry::load(&config.types_path).with_context(|| {
        format!(
            "Failed to load type table from {}",
            config.types_path.display()
        )
    })?;

    // Initialize database
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;

    let tree = db::load_tree(&pool, &registry)
        .await
        .context("Stored group tree is invalid")?;
    let layers = tree.groups().iter().filter(|g| g.is_layer).count();
    info!(groups = tree.len(), layers, "Group tree is valid");

    let mut args = std::env::args().skip(1);
    let Some(viewer_arg) = args.next() else {
        return Ok(());
    };
    let viewer_id = parse_id(&viewer_arg)?;
    let viewer = db::load_user_context(&pool, viewer_id, &tree, &registry, &config).await?;

    let (predicate, projection) = if let Some(group_arg) = args.next() {
        let group_id = parse_id(&group_arg)?;
        let decision = permissions::resolve_for_group(&viewer, group_id, &tree, &registry)?;
        info!(
            viewer_id = %viewer_id,
            group_id = %group_id,
            access = ?decision.access,
            "Resolved group visibility"
        );
        (decision.predicate, decision.projection)
    } else {
        let visibility = permissions::resolve_global(&viewer, &tree, &registry)?;
        (visibility.predicate, visibility.projection)
    };

    let people = db::list_people_matching(&pool, &predicate, LIST_LIMIT, 0).await?;
    info!(viewer_id = %viewer_id, visible = people.len(), "Listing visible people");
    for person in &people {
        print_person(person, projection)?;
    }

    Ok(())
}

fn parse_id(value: &str) -> Result<Uuid> {
    value
        .parse()
        .with_context(|| format!("'{value}' is not a valid id"))
}

fn print_person(person: &Person, projection: roster_common::FieldProjection) -> Result<()> {
    println!("{}", serde_json::to_string(&person.project(projection))?);
    Ok(())
}
