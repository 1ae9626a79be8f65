//! User entity - The owner of habits, tags and push subscriptions.
//!
//! Reminder hours and the work schedule are persisted as JSON text and decoded
//! into typed values by `core::user` and `core::work_schedule`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login address, stored trimmed and lowercased
    #[sea_orm(unique)]
    pub email_address: String,
    /// IANA timezone name; `None` or blank means UTC
    pub time_zone: Option<String>,
    /// JSON array of reminder hours (0-23), e.g. `"[9,12]"`
    pub notification_hours: String,
    /// JSON object holding the work schedule, if ever configured
    pub work_schedule: Option<String>,
    /// When the user was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many habits
    #[sea_orm(has_many = "super::habit::Entity")]
    Habits,
    /// One user has many tags
    #[sea_orm(has_many = "super::tag::Entity")]
    Tags,
    /// One user has many push subscriptions
    #[sea_orm(has_many = "super::push_subscription::Entity")]
    PushSubscriptions,
}

impl Related<super::habit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Habits.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tags.def()
    }
}

impl Related<super::push_subscription::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PushSubscriptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
