//! One diary entry per calendar day, stored as `diaries/<date>.json`.

use chrono::{NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult},
    storage::{DiaryEntry, LocalFileStorage},
};

/// Requires a `YYYY-MM-DD` date; it becomes part of a file name.
fn validate_date(date: Option<&str>) -> AppResult<&str> {
    let date = date
        .map(str::trim)
        .filter(|date| !date.is_empty())
        .ok_or_else(|| AppError::Validation("Date required".to_string()))?;
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) if parsed.format("%Y-%m-%d").to_string() == date => Ok(date),
        _ => Err(AppError::Validation(format!(
            "Invalid date {date:?}, expected YYYY-MM-DD"
        ))),
    }
}

pub async fn get_entry(storage: &LocalFileStorage, date: Option<&str>) -> AppResult<DiaryEntry> {
    let date = validate_date(date)?;
    let stored = storage
        .get_json::<DiaryEntry>(&LocalFileStorage::get_diary_key(date))
        .await?;
    Ok(stored.unwrap_or_else(|| DiaryEntry {
        date: date.to_string(),
        content: String::new(),
        updated_at: None,
    }))
}

/// Replaces the entry for `date` wholesale.
pub async fn put_entry(
    storage: &LocalFileStorage,
    date: Option<&str>,
    content: Option<&str>,
) -> AppResult<DiaryEntry> {
    let date = validate_date(date)?;
    let entry = DiaryEntry {
        date: date.to_string(),
        content: content.unwrap_or_default().to_string(),
        updated_at: Some(Utc::now().timestamp_millis() as f64 / 1000.0),
    };
    storage
        .put_json(&LocalFileStorage::get_diary_key(date), &entry)
        .await?;
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(dir: &std::path::Path) -> LocalFileStorage {
        LocalFileStorage::new(dir.to_path_buf(), "/static".to_string())
    }

    #[tokio::test]
    async fn empty_until_written() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let before = get_entry(&storage, Some("2024-01-01")).await.unwrap();
        assert_eq!(before.date, "2024-01-01");
        assert_eq!(before.content, "");

        put_entry(&storage, Some("2024-01-01"), Some("hello")).await.unwrap();
        let after = get_entry(&storage, Some("2024-01-01")).await.unwrap();
        assert_eq!(after.content, "hello");
        assert!(after.updated_at.is_some());
    }

    #[tokio::test]
    async fn put_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        put_entry(&storage, Some("2024-02-29"), Some("first")).await.unwrap();
        put_entry(&storage, Some("2024-02-29"), None).await.unwrap();
        let entry = get_entry(&storage, Some("2024-02-29")).await.unwrap();
        assert_eq!(entry.content, "");
    }

    #[tokio::test]
    async fn dates_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        for bad in [None, Some(""), Some("../secret"), Some("2024-1-1"), Some("2023-02-29")] {
            assert!(
                matches!(
                    put_entry(&storage, bad, Some("x")).await,
                    Err(AppError::Validation(_))
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!(matches!(
            get_entry(&storage, None).await,
            Err(AppError::Validation(message)) if message == "Date required"
        ));
    }
}
