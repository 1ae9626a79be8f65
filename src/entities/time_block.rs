//! Time block entity - A logged interval of hours on a date for one habit.
//!
//! Hours are fractional with half-hour granularity: `start_hour` in [0, 23.5],
//! `end_hour` in [0.5, 24] and always greater than `start_hour`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Time block database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "time_blocks")]
pub struct Model {
    /// Unique identifier for the time block
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Habit this time was spent on
    pub habit_id: i64,
    /// Calendar date the block was logged on
    pub logged_on: Date,
    /// Start of the block in fractional hours
    pub start_hour: f64,
    /// End of the block in fractional hours
    pub end_hour: f64,
    /// Free-form notes
    pub notes: Option<String>,
    /// When the block was created
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Length of the block in hours.
    #[must_use]
    pub fn duration_hours(&self) -> f64 {
        self.end_hour - self.start_hour
    }
}

/// Defines relationships between `TimeBlock` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each time block belongs to one habit
    #[sea_orm(
        belongs_to = "super::habit::Entity",
        from = "Column::HabitId",
        to = "super::habit::Column::Id"
    )]
    Habit,
}

impl Related<super::habit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Habit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
