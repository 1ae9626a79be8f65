//! Habit entity - A named activity a user tracks time against.
//!
//! Each habit carries a color token from the fixed palette (1-8) and an
//! active flag; inactive habits keep their history but drop out of breakdowns.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Habit database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "habits")]
pub struct Model {
    /// Unique identifier for the habit
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Display name (e.g., "Reading", "Deep work")
    pub name: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Palette slot used for charts and the timeline
    pub color_token: i32,
    /// Whether the habit is shown and counted in breakdowns
    pub active: bool,
    /// When the habit was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Habit and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each habit belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One habit has many time blocks
    #[sea_orm(has_many = "super::time_block::Entity")]
    TimeBlocks,
    /// One habit has many taggings
    #[sea_orm(has_many = "super::tagging::Entity")]
    Taggings,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::time_block::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TimeBlocks.def()
    }
}

impl Related<super::tagging::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Taggings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
