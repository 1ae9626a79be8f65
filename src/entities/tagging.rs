//! Tagging entity - Join row between a habit and a tag.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Tagging database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "taggings")]
pub struct Model {
    /// Unique identifier for the tagging
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Tag being applied
    pub tag_id: i64,
    /// Habit receiving the tag
    pub habit_id: i64,
}

/// Defines relationships between Tagging and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each tagging references one tag
    #[sea_orm(
        belongs_to = "super::tag::Entity",
        from = "Column::TagId",
        to = "super::tag::Column::Id"
    )]
    Tag,
    /// Each tagging references one habit
    #[sea_orm(
        belongs_to = "super::habit::Entity",
        from = "Column::HabitId",
        to = "super::habit::Column::Id"
    )]
    Habit,
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tag.def()
    }
}

impl Related<super::habit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Habit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
