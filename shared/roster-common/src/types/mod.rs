//! Shared Types

pub mod person;

pub use person::{FieldProjection, Gender, Person, PersonView, PublicPerson};
