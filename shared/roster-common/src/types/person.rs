//! Person Types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which subset of a person's fields a viewer may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldProjection {
    /// Only the fields listed on [`PublicPerson`].
    Public,
    /// The complete record.
    Full,
}

/// Gender as recorded on the person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

/// Person fields that may be shown to anyone allowed to list the person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicPerson {
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
    /// Whether the person opted in to show their contact data to other members.
    pub contact_data_visible: bool,
}

/// Full person record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
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
    pub gender: Option<Gender>,
    pub birthday: Option<NaiveDate>,
    pub additional_information: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A person as handed to a viewer, cut down to the granted projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersonView {
    Full(Box<Person>),
    Public(PublicPerson),
}

impl Person {
    /// Copy the public subset of this record.
    #[must_use]
    pub fn public(&self) -> PublicPerson {
        PublicPerson {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            nickname: self.nickname.clone(),
            company_name: self.company_name.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
            zip_code: self.zip_code.clone(),
            town: self.town.clone(),
            country: self.country.clone(),
            contact_data_visible: self.contact_data_visible,
        }
    }

    /// Cut this record down to the given projection.
    #[must_use]
    pub fn project(&self, projection: FieldProjection) -> PersonView {
        match projection {
            FieldProjection::Full => PersonView::Full(Box::new(self.clone())),
            FieldProjection::Public => PersonView::Public(self.public()),
        }
    }
}

impl PersonView {
    #[must_use]
    pub const fn id(&self) -> Uuid {
        match self {
            Self::Full(person) => person.id,
            Self::Public(person) => person.id,
        }
    }
}
