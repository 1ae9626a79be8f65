//! Push subscription entity - A browser endpoint that receives reminders.
//! Keys are opaque to the core and handed to the delivery transport as-is.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Push subscription database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "push_subscriptions")]
pub struct Model {
    /// Unique identifier for the subscription
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Push service endpoint URL
    #[sea_orm(unique)]
    pub endpoint: String,
    /// Client public key
    pub p256dh_key: String,
    /// Client auth secret
    pub auth_key: String,
    /// When the subscription was registered
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `PushSubscription` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each subscription belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
