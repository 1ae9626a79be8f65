//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod habit;
pub mod push_subscription;
pub mod tag;
pub mod tagging;
pub mod time_block;
pub mod user;

// Re-export specific types to avoid conflicts
pub use habit::{Column as HabitColumn, Entity as Habit, Model as HabitModel};
pub use push_subscription::{
    Column as PushSubscriptionColumn, Entity as PushSubscription, Model as PushSubscriptionModel,
};
pub use tag::{Column as TagColumn, Entity as Tag, Model as TagModel};
pub use tagging::{Column as TaggingColumn, Entity as Tagging, Model as TaggingModel};
pub use time_block::{Column as TimeBlockColumn, Entity as TimeBlock, Model as TimeBlockModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
