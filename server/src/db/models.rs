//! Database Models

use chrono::{DateTime, NaiveDate, Utc};
use roster_common::{Gender, Person};
use sqlx::FromRow;
use uuid::Uuid;

use crate::groups::Group;
use crate::people::Role;

/// Group row.
#[derive(Debug, Clone, FromRow)]
pub struct GroupRow {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub group_type: String,
    pub name: String,
    pub lft: i32,
    pub rgt: i32,
    pub is_layer: bool,
    pub layer_group_id: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            parent_id: row.parent_id,
            group_type: row.group_type,
            name: row.name,
            lft: row.lft,
            rgt: row.rgt,
            is_layer: row.is_layer,
            layer_group_id: row.layer_group_id,
            deleted_at: row.deleted_at,
        }
    }
}

/// Person row. Gender is stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct PersonRow {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub zip_code: Option<String>,
    pub town: Option<String>,
    pub country: Option<String>,
    pub contact_data_visible: bool,
    pub gender: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub additional_information: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PersonRow> for Person {
    fn from(row: PersonRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            nickname: row.nickname,
            company_name: row.company_name,
            email: row.email,
            address: row.address,
            zip_code: row.zip_code,
            town: row.town,
            country: row.country,
            contact_data_visible: row.contact_data_visible,
            gender: row.gender.as_deref().and_then(gender_from_db),
            birthday: row.birthday,
            additional_information: row.additional_information,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Role row.
#[derive(Debug, Clone, FromRow)]
pub struct RoleRow {
    pub id: Uuid,
    pub person_id: Uuid,
    pub group_id: Uuid,
    pub role_type: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            id: row.id,
            person_id: row.person_id,
            group_id: row.group_id,
            role_type: row.role_type,
            label: row.label,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        }
    }
}

pub(crate) fn gender_from_db(value: &str) -> Option<Gender> {
    match value {
        "female" => Some(Gender::Female),
        "male" => Some(Gender::Male),
        _ => None,
    }
}

pub(crate) const fn gender_to_db(gender: Gender) -> &'static str {
    match gender {
        Gender::Female => "female",
        Gender::Male => "male",
    }
}
