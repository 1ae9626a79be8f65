//! Hourly push reminders.
//!
//! Each run looks at the current instant, finds the users whose local hour is
//! one of their configured reminder hours, and pushes a reminder to every
//! subscription they have unless they already logged time in the current
//! reminder window. The window runs from the previous configured hour (or
//! midnight) up to the current one.
//!
//! Delivery goes through [`PushSender`] so the web-push transport stays
//! outside the crate. Failures are counted and logged, never returned.

use crate::{
    config::settings::ReminderSettings,
    core::{
        time_block::time_blocks_for_date,
        user::{
            NotificationHours, delete_push_subscription, effective_timezone,
            notification_hours_for, parse_timezone, subscriptions_for_user,
            users_with_notifications,
        },
    },
    entities::{push_subscription, time_block, user},
    errors::Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::{TZ_VARIANTS, Tz};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// Content of a reminder notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushPayload {
    /// Notification title
    pub title: String,
    /// Notification body
    pub body: String,
    /// Path opened when the notification is clicked
    pub path: String,
}

impl PushPayload {
    /// Payload built from the configured reminder text.
    #[must_use]
    pub fn from_settings(settings: &ReminderSettings) -> Self {
        Self {
            title: settings.title.clone(),
            body: settings.body.clone(),
            path: settings.path.clone(),
        }
    }

    /// The JSON message a service worker expects.
    #[must_use]
    pub fn to_message(&self) -> serde_json::Value {
        json!({
            "title": self.title,
            "options": {
                "body": self.body,
                "icon": "/icon.png",
                "badge": "/icon.png",
                "data": { "path": self.path },
            },
        })
    }
}

/// Why a push could not be delivered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The push service rejected the subscription as expired or invalid
    #[error("subscription rejected: {message}")]
    Permanent {
        /// Transport message
        message: String,
    },

    /// Network or service failure; the subscription may work next time
    #[error("delivery failed: {message}")]
    Transient {
        /// Transport message
        message: String,
    },
}

/// Transport that delivers one notification to one subscription.
#[async_trait]
pub trait PushSender: Send + Sync + 'static {
    /// Sends `payload` to `subscription`.
    async fn send(
        &self,
        subscription: &push_subscription::Model,
        payload: &PushPayload,
    ) -> std::result::Result<(), DeliveryError>;
}

/// Sender that only logs what it would deliver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPushSender;

#[async_trait]
impl PushSender for TracingPushSender {
    async fn send(
        &self,
        subscription: &push_subscription::Model,
        payload: &PushPayload,
    ) -> std::result::Result<(), DeliveryError> {
        info!(
            subscription_id = subscription.id,
            endpoint = %subscription.endpoint,
            message = %payload.to_message(),
            "Would deliver push notification"
        );
        Ok(())
    }
}

/// Counts from one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderRunReport {
    /// Users whose local hour matched a reminder hour and who have a subscription
    pub users_due: usize,
    /// Users a reminder was sent to
    pub notified: usize,
    /// Users skipped because they already logged time in the window
    pub suppressed: usize,
    /// Successful deliveries
    pub delivered: usize,
    /// Failed or timed-out deliveries
    pub failed: usize,
    /// Subscriptions removed after a permanent failure
    pub deregistered: usize,
}

/// Names of every known timezone whose local hour is `hour` at `now`.
#[must_use]
pub fn timezones_at_hour(now: DateTime<Utc>, hour: u32) -> HashSet<&'static str> {
    TZ_VARIANTS
        .iter()
        .filter(|tz| now.with_timezone(*tz).hour() == hour)
        .map(|tz| tz.name())
        .collect()
}

/// The `[start, hour)` window a reminder at `hour` covers.
#[must_use]
pub fn reminder_window(hours: &NotificationHours, hour: u32) -> (f64, f64) {
    (f64::from(hours.previous_before(hour)), f64::from(hour))
}

/// True when the block overlaps `[window_start, window_end)`; touching ends do not count.
#[must_use]
pub fn overlaps_window(block: &time_block::Model, window_start: f64, window_end: f64) -> bool {
    block.end_hour > window_start && block.start_hour < window_end
}

/// Whether a reminder at `hour` should go out given the blocks logged today.
#[must_use]
pub fn should_notify(hours: &NotificationHours, hour: u32, logged_today: &[time_block::Model]) -> bool {
    if !hours.contains(hour) {
        return false;
    }
    let (start, end) = reminder_window(hours, hour);
    !logged_today.iter().any(|b| overlaps_window(b, start, end))
}

/// A user due for a reminder this run.
#[derive(Debug, Clone)]
struct DueUser {
    user: user::Model,
    hours: NotificationHours,
    hour: u32,
    zone: Tz,
}

/// Decides who gets a reminder and delivers it.
pub struct ReminderScheduler<S: PushSender> {
    db: DatabaseConnection,
    sender: Arc<S>,
    payload: PushPayload,
    delivery_timeout: Duration,
}

impl<S: PushSender> ReminderScheduler<S> {
    /// Creates a scheduler using the configured payload and timeout.
    pub fn new(db: DatabaseConnection, sender: Arc<S>, settings: &ReminderSettings) -> Self {
        Self {
            db,
            sender,
            payload: PushPayload::from_settings(settings),
            delivery_timeout: settings.delivery_timeout(),
        }
    }

    /// Users whose reminder hour is the current local hour in their timezone.
    async fn due_users(&self, now: DateTime<Utc>) -> Result<Vec<DueUser>> {
        let mut by_hour: BTreeMap<u32, Vec<(user::Model, NotificationHours)>> = BTreeMap::new();
        for user in users_with_notifications(&self.db).await? {
            let hours = match notification_hours_for(&user) {
                Ok(hours) => hours,
                Err(e) => {
                    warn!(user_id = user.id, error = %e, "Skipping unreadable reminder hours");
                    continue;
                }
            };
            for &hour in hours.hours() {
                by_hour
                    .entry(hour)
                    .or_default()
                    .push((user.clone(), hours.clone()));
            }
        }

        let mut due = Vec::new();
        for (hour, candidates) in by_hour {
            let zones = timezones_at_hour(now, hour);
            for (user, hours) in candidates {
                let name = effective_timezone(&user);
                if !zones.contains(name) {
                    continue;
                }
                match parse_timezone(name) {
                    Ok(zone) => due.push(DueUser {
                        user,
                        hours,
                        hour,
                        zone,
                    }),
                    Err(e) => warn!(user_id = user.id, error = %e, "Skipping user"),
                }
            }
        }

        debug!(count = due.len(), "Collected users due for a reminder");
        Ok(due)
    }

    /// Runs one scheduling pass at `now`.
    #[instrument(skip_all, fields(now = %now))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<ReminderRunReport> {
        let mut report = ReminderRunReport::default();

        for due in self.due_users(now).await? {
            if let Err(e) = self.remind(&due, now, &mut report).await {
                error!(user_id = due.user.id, error = %e, "Skipping user after lookup failure");
            }
        }

        info!(
            users_due = report.users_due,
            notified = report.notified,
            suppressed = report.suppressed,
            delivered = report.delivered,
            failed = report.failed,
            deregistered = report.deregistered,
            "Reminder run finished"
        );
        Ok(report)
    }

    /// Reminds one due user unless they already logged time in the window.
    async fn remind(
        &self,
        due: &DueUser,
        now: DateTime<Utc>,
        report: &mut ReminderRunReport,
    ) -> Result<()> {
        let subscriptions = subscriptions_for_user(&self.db, due.user.id).await?;
        if subscriptions.is_empty() {
            return Ok(());
        }
        report.users_due += 1;

        let local_date = now.with_timezone(&due.zone).date_naive();
        let logged_today = time_blocks_for_date(&self.db, due.user.id, local_date).await?;
        if !should_notify(&due.hours, due.hour, &logged_today) {
            debug!(user_id = due.user.id, hour = due.hour, "Already logged in reminder window");
            report.suppressed += 1;
            return Ok(());
        }

        report.notified += 1;
        for subscription in &subscriptions {
            self.deliver(subscription, report).await;
        }
        Ok(())
    }

    /// Sends to one subscription; failures are recorded and never propagated.
    #[instrument(skip(self, subscription, report), fields(subscription_id = subscription.id))]
    async fn deliver(&self, subscription: &push_subscription::Model, report: &mut ReminderRunReport) {
        let attempt = timeout(
            self.delivery_timeout,
            self.sender.send(subscription, &self.payload),
        )
        .await;

        match attempt {
            Ok(Ok(())) => report.delivered += 1,
            Ok(Err(DeliveryError::Permanent { message })) => {
                report.failed += 1;
                warn!(%message, "Subscription rejected, removing it");
                match delete_push_subscription(&self.db, subscription.id).await {
                    Ok(()) => report.deregistered += 1,
                    Err(e) => error!(error = %e, "Failed to remove subscription"),
                }
            }
            Ok(Err(DeliveryError::Transient { message })) => {
                report.failed += 1;
                warn!(%message, "Push delivery failed");
            }
            Err(_) => {
                report.failed += 1;
                warn!(timeout_secs = self.delivery_timeout.as_secs_f64(), "Push delivery timed out");
            }
        }
    }

    /// Runs a pass every `interval` until `shutdown` resolves.
    pub async fn run<F>(&self, interval: Duration, shutdown: F)
    where
        F: std::future::Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Reminder scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once(Utc::now()).await {
                        error!(error = %e, "Reminder run failed");
                    }
                }
            }
        }
    }
}
