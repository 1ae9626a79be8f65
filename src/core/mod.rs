/// Habit creation, lookup, update and removal
pub mod habit;
/// Hourly push reminders and the delivery transport seam
pub mod reminder;
/// Consecutive-day logging streaks
pub mod streak;
/// Day, week, month and year summaries
pub mod summary;
/// Tag naming rules, tagging and lookups
pub mod tag;
/// Time block validation and persistence
pub mod time_block;
/// Hour and duration formatting for display
pub mod time_format;
/// Accounts, reminder settings and push subscriptions
pub mod user;
/// Per-user work-hours window
pub mod work_schedule;
