//! Tag business logic - Per-user labels for grouping and filtering habits.
//!
//! Names are trimmed and lowercased before validation and storage, so
//! `"  My Tag "` and `"my tag"` are the same tag. Each tag keeps a count of the
//! habits it is applied to, which never drops below zero.

use crate::{
    entities::{Habit, Tag, Tagging, habit, tag, tagging},
    errors::{Error, Result, ValidationErrors},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info};

/// Longest allowed tag name, in characters.
pub const MAX_NAME_LENGTH: usize = 30;

/// Trims and lowercases a tag name.
#[must_use]
pub fn normalize_tag_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalises a name, returning `None` when it is blank or too long.
#[must_use]
pub fn sanitize_tag_name(name: &str) -> Option<String> {
    let sanitized = normalize_tag_name(name);
    (!sanitized.is_empty() && sanitized.chars().count() <= MAX_NAME_LENGTH).then_some(sanitized)
}

fn allowed_tag_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_ascii_whitespace() || c == '-' || c == '_'
}

/// Checks an already-normalised tag name against every naming rule.
#[must_use]
pub fn validate_tag_name(name: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if name.is_empty() {
        errors.add("name", "can't be blank");
        return errors;
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            "name",
            format!("is too long (maximum is {MAX_NAME_LENGTH} characters)"),
        );
    }
    if !name.chars().all(allowed_tag_char) {
        errors.add(
            "name",
            "only allows letters, numbers, spaces, hyphens, underscores",
        );
    }
    errors
}

async fn find_tag_by_name<C>(db: &C, user_id: i64, name: &str) -> Result<Option<tag::Model>>
where
    C: ConnectionTrait,
{
    Tag::find()
        .filter(tag::Column::UserId.eq(user_id))
        .filter(tag::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn insert_tag<C>(db: &C, user_id: i64, name: String) -> Result<tag::Model>
where
    C: ConnectionTrait,
{
    let model = tag::ActiveModel {
        user_id: Set(user_id),
        name: Set(name),
        taggings_count: Set(0),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let tag = model.insert(db).await?;
    debug!(user_id, tag_id = tag.id, name = %tag.name, "Created tag");
    Ok(tag)
}

/// Creates a new tag, failing when the user already has one with this name.
pub async fn create_tag<C>(db: &C, user_id: i64, name: &str) -> Result<tag::Model>
where
    C: ConnectionTrait,
{
    let name = normalize_tag_name(name);
    let mut errors = validate_tag_name(&name);
    if errors.is_empty() && find_tag_by_name(db, user_id, &name).await?.is_some() {
        errors.add("name", "has already been taken");
    }
    errors.into_result()?;

    insert_tag(db, user_id, name).await
}

/// Returns the user's tag with this name, creating it when missing.
pub async fn find_or_create_tag<C>(db: &C, user_id: i64, name: &str) -> Result<tag::Model>
where
    C: ConnectionTrait,
{
    let name = normalize_tag_name(name);
    validate_tag_name(&name).into_result()?;

    match find_tag_by_name(db, user_id, &name).await? {
        Some(tag) => Ok(tag),
        None => insert_tag(db, user_id, name).await,
    }
}

/// Looks up a tag owned by `user_id`.
pub async fn get_tag<C>(db: &C, user_id: i64, tag_id: i64) -> Result<tag::Model>
where
    C: ConnectionTrait,
{
    Tag::find_by_id(tag_id)
        .filter(tag::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Tag", tag_id))
}

/// Shifts a tag's habit counter by `delta`, clamping at zero.
pub async fn adjust_taggings_count<C>(db: &C, tag_id: i64, delta: i32) -> Result<()>
where
    C: ConnectionTrait,
{
    Tag::update_many()
        .col_expr(
            tag::Column::TaggingsCount,
            Expr::cust_with_values("MAX(\"taggings_count\" + ?, 0)", [delta]),
        )
        .filter(tag::Column::Id.eq(tag_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Applies a tag to a habit. Re-applying an existing tag is a no-op.
///
/// Returns `true` when a new tagging was created.
pub async fn tag_habit(
    db: &DatabaseConnection,
    user_id: i64,
    habit_id: i64,
    tag_id: i64,
) -> Result<bool> {
    let txn = db.begin().await?;

    let habit = crate::core::habit::get_habit(&txn, user_id, habit_id).await?;
    let tag = get_tag(&txn, user_id, tag_id).await?;

    let existing = Tagging::find()
        .filter(tagging::Column::HabitId.eq(habit.id))
        .filter(tagging::Column::TagId.eq(tag.id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Ok(false);
    }

    tagging::ActiveModel {
        tag_id: Set(tag.id),
        habit_id: Set(habit.id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    adjust_taggings_count(&txn, tag.id, 1).await?;

    txn.commit().await?;
    info!(user_id, habit_id, tag_id, "Tagged habit");
    Ok(true)
}

/// Finds or creates a tag by name and applies it to the habit.
pub async fn tag_habit_by_name(
    db: &DatabaseConnection,
    user_id: i64,
    habit_id: i64,
    name: &str,
) -> Result<tag::Model> {
    let tag = find_or_create_tag(db, user_id, name).await?;
    tag_habit(db, user_id, habit_id, tag.id).await?;
    get_tag(db, user_id, tag.id).await
}

/// Removes a tag from a habit. Returns `true` when a tagging was removed.
pub async fn untag_habit(
    db: &DatabaseConnection,
    user_id: i64,
    habit_id: i64,
    tag_id: i64,
) -> Result<bool> {
    let txn = db.begin().await?;

    let habit = crate::core::habit::get_habit(&txn, user_id, habit_id).await?;
    let removed = Tagging::delete_many()
        .filter(tagging::Column::HabitId.eq(habit.id))
        .filter(tagging::Column::TagId.eq(tag_id))
        .exec(&txn)
        .await?
        .rows_affected;

    if removed > 0 {
        adjust_taggings_count(&txn, tag_id, -1).await?;
    }

    txn.commit().await?;
    Ok(removed > 0)
}

/// The user's tags ordered by name.
pub async fn tags_alphabetically<C>(db: &C, user_id: i64) -> Result<Vec<tag::Model>>
where
    C: ConnectionTrait,
{
    Tag::find()
        .filter(tag::Column::UserId.eq(user_id))
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The user's tags, most used first.
pub async fn tags_by_popularity<C>(db: &C, user_id: i64) -> Result<Vec<tag::Model>>
where
    C: ConnectionTrait,
{
    Tag::find()
        .filter(tag::Column::UserId.eq(user_id))
        .order_by_desc(tag::Column::TaggingsCount)
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Tags whose name starts with `query`, compared literally after normalisation.
/// A blank query matches nothing.
pub async fn matching_tags<C>(db: &C, user_id: i64, query: Option<&str>) -> Result<Vec<tag::Model>>
where
    C: ConnectionTrait,
{
    let prefix = query.map(normalize_tag_name).unwrap_or_default();
    if prefix.is_empty() {
        return Ok(Vec::new());
    }

    let tags = tags_alphabetically(db, user_id).await?;
    Ok(tags
        .into_iter()
        .filter(|tag| tag.name.starts_with(&prefix))
        .collect())
}

/// Deletes a tag and removes it from every habit.
pub async fn delete_tag(db: &DatabaseConnection, user_id: i64, tag_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let tag = get_tag(&txn, user_id, tag_id).await?;

    Tagging::delete_many()
        .filter(tagging::Column::TagId.eq(tag.id))
        .exec(&txn)
        .await?;
    Tag::delete_by_id(tag.id).exec(&txn).await?;

    txn.commit().await?;
    info!(user_id, tag_id, "Deleted tag");
    Ok(())
}

/// Habits carrying the tag, oldest first.
pub async fn habits_with_tag<C>(db: &C, user_id: i64, tag_id: i64) -> Result<Vec<habit::Model>>
where
    C: ConnectionTrait,
{
    let tag = get_tag(db, user_id, tag_id).await?;
    Habit::find()
        .inner_join(Tagging)
        .filter(tagging::Column::TagId.eq(tag.id))
        .order_by_asc(habit::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_normalize_and_sanitize() {
        assert_eq!(normalize_tag_name("  My Tag  "), "my tag");
        assert_eq!(sanitize_tag_name("  Focus "), Some("focus".to_string()));
        assert_eq!(sanitize_tag_name("   "), None);
        assert_eq!(sanitize_tag_name(&"a".repeat(31)), None);
    }

    #[test]
    fn test_validate_tag_name_rules() {
        assert!(validate_tag_name("deep-work_2 am").is_empty());
        assert_eq!(validate_tag_name("").on("name"), vec!["can't be blank"]);
        assert_eq!(
            validate_tag_name(&"a".repeat(31)).on("name"),
            vec!["is too long (maximum is 30 characters)"]
        );
        assert_eq!(
            validate_tag_name("test<script>").on("name"),
            vec!["only allows letters, numbers, spaces, hyphens, underscores"]
        );
        assert_eq!(
            validate_tag_name("deep\u{a0}work").on("name"),
            vec!["only allows letters, numbers, spaces, hyphens, underscores"]
        );
    }

    #[tokio::test]
    async fn test_create_tag_normalizes_and_rejects_duplicates() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "tags@example.com").await?;
        let other = create_test_user(&db, "other@example.com").await?;

        let tag = create_tag(&db, user.id, "  My Tag  ").await?;
        assert_eq!(tag.name, "my tag");

        let duplicate = create_tag(&db, user.id, "MY TAG").await;
        match duplicate {
            Err(Error::Validation { errors }) => {
                assert_eq!(errors.on("name"), vec!["has already been taken"]);
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }

        assert!(create_tag(&db, other.id, "my tag").await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_tagging_maintains_counter() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "counter@example.com").await?;
        let a = create_test_habit(&db, user.id, "A").await?;
        let b = create_test_habit(&db, user.id, "B").await?;
        let tag = find_or_create_tag(&db, user.id, "health").await?;

        assert!(tag_habit(&db, user.id, a.id, tag.id).await?);
        assert!(!tag_habit(&db, user.id, a.id, tag.id).await?);
        assert!(tag_habit(&db, user.id, b.id, tag.id).await?);
        assert_eq!(get_tag(&db, user.id, tag.id).await?.taggings_count, 2);

        assert!(untag_habit(&db, user.id, a.id, tag.id).await?);
        assert!(!untag_habit(&db, user.id, a.id, tag.id).await?);
        assert_eq!(get_tag(&db, user.id, tag.id).await?.taggings_count, 1);

        let habits = habits_with_tag(&db, user.id, tag.id).await?;
        assert_eq!(habits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![b.id]);

        Ok(())
    }

    #[tokio::test]
    async fn test_counter_never_negative() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "floor@example.com").await?;
        let tag = find_or_create_tag(&db, user.id, "floor").await?;

        adjust_taggings_count(&db, tag.id, -1).await?;
        assert_eq!(get_tag(&db, user.id, tag.id).await?.taggings_count, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_ordering_scopes() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "order@example.com").await?;
        let habit = create_test_habit(&db, user.id, "Habit").await?;
        create_tag(&db, user.id, "zebra").await?;
        create_tag(&db, user.id, "alpha").await?;
        tag_habit_by_name(&db, user.id, habit.id, "zebra").await?;

        let alphabetical = tags_alphabetically(&db, user.id).await?;
        assert_eq!(alphabetical[0].name, "alpha");

        let popular = tags_by_popularity(&db, user.id).await?;
        assert_eq!(popular[0].name, "zebra");

        Ok(())
    }

    #[tokio::test]
    async fn test_matching_tags_is_literal_prefix() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "match@example.com").await?;
        create_tag(&db, user.id, "workout").await?;
        create_tag(&db, user.id, "work").await?;
        create_tag(&db, user.id, "reading").await?;
        create_tag(&db, user.id, "test-underscore").await?;
        create_tag(&db, user.id, "testing").await?;

        let matches = matching_tags(&db, user.id, Some("wor")).await?;
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|t| t.name.starts_with("wor")));

        assert!(matching_tags(&db, user.id, Some("test_")).await?.is_empty());
        assert!(matching_tags(&db, user.id, Some("")).await?.is_empty());
        assert!(matching_tags(&db, user.id, None).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_tag_removes_taggings() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "deltag@example.com").await?;
        let habit = create_test_habit(&db, user.id, "Habit").await?;
        let tag = tag_habit_by_name(&db, user.id, habit.id, "gone").await?;

        delete_tag(&db, user.id, tag.id).await?;

        assert_eq!(Tagging::find().count(&db).await?, 0);
        assert!(matches!(
            get_tag(&db, user.id, tag.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
