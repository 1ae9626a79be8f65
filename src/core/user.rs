//! User business logic - Accounts, reminder settings, work schedules and push endpoints.
//!
//! Reminder hours and the work schedule live on the user row as JSON text.
//! They are decoded into [`NotificationHours`] and [`WorkSchedule`] here so the
//! rest of the crate never handles the raw strings.

use crate::{
    core::work_schedule::WorkSchedule,
    entities::{PushSubscription, User, push_subscription, user},
    errors::{Error, Result, ValidationErrors},
};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Most reminder hours a user may configure.
pub const MAX_NOTIFICATION_HOURS: usize = 6;

/// Timezone used when the user has none set.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Sorted, distinct reminder hours in `0..=23`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<u32>")]
pub struct NotificationHours(Vec<u32>);

impl NotificationHours {
    /// Validates and normalises a list of hours.
    pub fn new(hours: impl IntoIterator<Item = i64>) -> Result<Self> {
        let mut errors = ValidationErrors::new();
        let mut valid = Vec::new();
        for hour in hours {
            match u32::try_from(hour) {
                Ok(h) if h <= 23 => valid.push(h),
                _ => {
                    if errors.on("notification_hours").is_empty() {
                        errors.add("notification_hours", "must be valid hours (0-23)");
                    }
                }
            }
        }
        valid.sort_unstable();
        valid.dedup();

        if valid.len() > MAX_NOTIFICATION_HOURS {
            errors.add(
                "notification_hours",
                format!("can have at most {MAX_NOTIFICATION_HOURS} notification times"),
            );
        }

        errors.into_result()?;
        Ok(Self(valid))
    }

    /// Decodes the stored JSON array. Blank text means no reminders.
    pub fn from_json(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "null" {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(Error::from)
    }

    /// Encodes the hours as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::from)
    }

    /// The hours, ascending.
    #[must_use]
    pub fn hours(&self) -> &[u32] {
        &self.0
    }

    /// True when no reminders are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when a reminder is configured for `hour`.
    #[must_use]
    pub fn contains(&self, hour: u32) -> bool {
        self.0.contains(&hour)
    }

    /// The largest configured hour strictly below `hour`, or 0 when there is none.
    #[must_use]
    pub fn previous_before(&self, hour: u32) -> u32 {
        self.0.iter().copied().filter(|h| *h < hour).max().unwrap_or(0)
    }
}

impl TryFrom<Vec<i64>> for NotificationHours {
    type Error = Error;

    fn try_from(hours: Vec<i64>) -> Result<Self> {
        Self::new(hours)
    }
}

impl From<NotificationHours> for Vec<u32> {
    fn from(hours: NotificationHours) -> Self {
        hours.0
    }
}

/// Fields for registering a browser push endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPushSubscription {
    /// Push service endpoint URL
    pub endpoint: String,
    /// Client public key
    pub p256dh_key: String,
    /// Client auth secret
    pub auth_key: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if email.is_empty() {
        errors.add("email_address", "can't be blank");
        return errors;
    }

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        errors.add("email_address", "is invalid");
    }
    errors
}

/// Resolves an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|_| Error::Timezone {
        name: name.to_string(),
    })
}

/// The user's timezone name, `"UTC"` when blank.
#[must_use]
pub fn effective_timezone(user: &user::Model) -> &str {
    user.time_zone
        .as_deref()
        .map(str::trim)
        .filter(|tz| !tz.is_empty())
        .unwrap_or(DEFAULT_TIMEZONE)
}

/// The user's local calendar date at `now`. Unknown zone names fall back to UTC.
#[must_use]
pub fn local_today(user: &user::Model, now: DateTime<Utc>) -> NaiveDate {
    let name = effective_timezone(user);
    match parse_timezone(name) {
        Ok(tz) => now.with_timezone(&tz).date_naive(),
        Err(_) => {
            warn!(user_id = user.id, time_zone = name, "Unknown timezone, using UTC");
            now.date_naive()
        }
    }
}

/// Decoded reminder hours of the user.
pub fn notification_hours_for(user: &user::Model) -> Result<NotificationHours> {
    NotificationHours::from_json(&user.notification_hours)
}

/// Decoded work schedule of the user. An unreadable schedule is logged and
/// replaced by the defaults.
#[must_use]
pub fn work_schedule_for(user: &user::Model) -> WorkSchedule {
    WorkSchedule::from_json(user.work_schedule.as_deref()).unwrap_or_else(|e| {
        warn!(user_id = user.id, error = %e, "Unreadable work schedule, using defaults");
        WorkSchedule::default()
    })
}

/// Creates a user with no reminders and no work schedule.
pub async fn create_user<C>(db: &C, email_address: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let email = normalize_email(email_address);
    let mut errors = validate_email(&email);

    if errors.is_empty() {
        let taken = User::find()
            .filter(user::Column::EmailAddress.eq(email.as_str()))
            .one(db)
            .await?
            .is_some();
        if taken {
            errors.add("email_address", "has already been taken");
        }
    }
    errors.into_result()?;

    let model = user::ActiveModel {
        email_address: Set(email),
        time_zone: Set(None),
        notification_hours: Set(NotificationHours::default().to_json()?),
        work_schedule: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let user = model.insert(db).await?;
    info!(user_id = user.id, "Created user");
    Ok(user)
}

/// Looks up a user by id.
pub async fn get_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))
}

/// Every user with at least one reminder hour. Users whose stored hours can't
/// be decoded are kept so the caller can report them.
pub async fn users_with_notifications<C>(db: &C) -> Result<Vec<user::Model>>
where
    C: ConnectionTrait,
{
    let users = User::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?;

    Ok(users
        .into_iter()
        .filter(|u| !notification_hours_for(u).is_ok_and(|h| h.is_empty()))
        .collect())
}

/// Replaces the user's reminder hours and timezone. A blank timezone clears it.
pub async fn update_notification_settings<C>(
    db: &C,
    user_id: i64,
    hours: Vec<i64>,
    time_zone: Option<&str>,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let existing = get_user(db, user_id).await?;
    let hours = NotificationHours::new(hours)?;

    let time_zone = match time_zone.map(str::trim).filter(|tz| !tz.is_empty()) {
        Some(name) => Some(parse_timezone(name)?.name().to_string()),
        None => None,
    };

    let mut active_model: user::ActiveModel = existing.into();
    active_model.notification_hours = Set(hours.to_json()?);
    active_model.time_zone = Set(time_zone);
    let user = active_model.update(db).await?;

    info!(user_id, hours = ?hours.hours(), "Updated notification settings");
    Ok(user)
}

/// Validates and stores the user's work schedule.
pub async fn update_work_schedule<C>(
    db: &C,
    user_id: i64,
    schedule: &WorkSchedule,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    schedule.validate()?;
    let existing = get_user(db, user_id).await?;

    let mut active_model: user::ActiveModel = existing.into();
    active_model.work_schedule = Set(Some(schedule.to_json()?));
    active_model.update(db).await.map_err(Into::into)
}

/// Registers a push endpoint for the user. A known endpoint is re-pointed at
/// this user with the new keys.
pub async fn register_push_subscription<C>(
    db: &C,
    user_id: i64,
    subscription: NewPushSubscription,
) -> Result<push_subscription::Model>
where
    C: ConnectionTrait,
{
    let mut errors = ValidationErrors::new();
    if subscription.endpoint.trim().is_empty() {
        errors.add("endpoint", "can't be blank");
    }
    if subscription.p256dh_key.trim().is_empty() {
        errors.add("p256dh_key", "can't be blank");
    }
    if subscription.auth_key.trim().is_empty() {
        errors.add("auth_key", "can't be blank");
    }
    errors.into_result()?;

    get_user(db, user_id).await?;

    let existing = PushSubscription::find()
        .filter(push_subscription::Column::Endpoint.eq(subscription.endpoint.as_str()))
        .one(db)
        .await?;

    let saved = match existing {
        Some(model) => {
            let mut active_model: push_subscription::ActiveModel = model.into();
            active_model.user_id = Set(user_id);
            active_model.p256dh_key = Set(subscription.p256dh_key);
            active_model.auth_key = Set(subscription.auth_key);
            active_model.update(db).await?
        }
        None => {
            push_subscription::ActiveModel {
                user_id: Set(user_id),
                endpoint: Set(subscription.endpoint),
                p256dh_key: Set(subscription.p256dh_key),
                auth_key: Set(subscription.auth_key),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    info!(user_id, subscription_id = saved.id, "Registered push subscription");
    Ok(saved)
}

/// Removes the user's subscription for `endpoint`. Returns whether one existed.
pub async fn unregister_push_subscription<C>(db: &C, user_id: i64, endpoint: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let removed = PushSubscription::delete_many()
        .filter(push_subscription::Column::UserId.eq(user_id))
        .filter(push_subscription::Column::Endpoint.eq(endpoint))
        .exec(db)
        .await?
        .rows_affected;
    Ok(removed > 0)
}

/// Removes a subscription by id, e.g. after the push service rejected it.
pub async fn delete_push_subscription<C>(db: &C, subscription_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    PushSubscription::delete_by_id(subscription_id).exec(db).await?;
    Ok(())
}

/// The user's push endpoints, oldest first.
pub async fn subscriptions_for_user<C>(db: &C, user_id: i64) -> Result<Vec<push_subscription::Model>>
where
    C: ConnectionTrait,
{
    PushSubscription::find()
        .filter(push_subscription::Column::UserId.eq(user_id))
        .order_by_asc(push_subscription::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
