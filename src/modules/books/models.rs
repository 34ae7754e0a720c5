use chrono::{DateTime, NaiveDate, SubsecRound, TimeDelta, Utc};
use uuid::Uuid;

/// Stored book row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Book {
    /// Primary key, assigned on insert and never changed
    pub uid: Uuid,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub published_date: NaiveDate,
    pub page_count: i32,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field values for a book about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub published_date: NaiveDate,
    pub page_count: i32,
    pub language: String,
}

/// Fields to overwrite on an existing book; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub page_count: Option<i32>,
    pub language: Option<String>,
}

impl BookPatch {
    /// True when applying the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.publisher.is_none()
            && self.published_date.is_none()
            && self.page_count.is_none()
            && self.language.is_none()
    }
}

impl Book {
    /// Materialize a new row with a fresh time-ordered id.
    pub fn create(input: NewBook, now: DateTime<Utc>) -> Self {
        Self {
            uid: Uuid::now_v7(),
            title: input.title,
            author: input.author,
            publisher: input.publisher,
            published_date: input.published_date,
            page_count: input.page_count,
            language: input.language,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the fields present in `patch` and restamp `updated_at`.
    pub fn apply(&mut self, patch: BookPatch, updated_at: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(author) = patch.author {
            self.author = author;
        }
        if let Some(publisher) = patch.publisher {
            self.publisher = publisher;
        }
        if let Some(published_date) = patch.published_date {
            self.published_date = published_date;
        }
        if let Some(page_count) = patch.page_count {
            self.page_count = page_count;
        }
        if let Some(language) = patch.language {
            self.language = language;
        }
        self.updated_at = updated_at;
    }
}

/// Current time at the storage precision (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Timestamp for an update of a row last stamped at `previous`.
///
/// Never earlier than `previous + 1µs`, so `updated_at` strictly advances
/// even when two writes land within one clock tick.
pub fn next_update_stamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    now().max(previous + TimeDelta::microseconds(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewBook {
        NewBook {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            publisher: "Chilton".to_string(),
            published_date: NaiveDate::from_ymd_opt(1965, 8, 1).unwrap(),
            page_count: 412,
            language: "en".to_string(),
        }
    }

    #[test]
    fn create_stamps_both_timestamps() {
        let at = now();
        let book = Book::create(sample(), at);
        assert_eq!(book.created_at, at);
        assert_eq!(book.updated_at, at);
        assert_eq!(book.uid.get_version_num(), 7);
    }

    #[test]
    fn apply_touches_only_present_fields() {
        let mut book = Book::create(sample(), now());
        let before = book.clone();
        let stamp = next_update_stamp(book.updated_at);

        book.apply(
            BookPatch {
                title: Some("Dune Messiah".to_string()),
                ..BookPatch::default()
            },
            stamp,
        );

        assert_eq!(book.title, "Dune Messiah");
        assert_eq!(book.author, before.author);
        assert_eq!(book.publisher, before.publisher);
        assert_eq!(book.page_count, before.page_count);
        assert_eq!(book.uid, before.uid);
        assert_eq!(book.created_at, before.created_at);
        assert!(book.updated_at > before.updated_at);
    }

    #[test]
    fn update_stamp_advances_past_future_previous() {
        let future = now() + TimeDelta::seconds(60);
        assert_eq!(next_update_stamp(future), future + TimeDelta::microseconds(1));
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(BookPatch::default().is_empty());
        assert!(!BookPatch {
            page_count: Some(0),
            ..BookPatch::default()
        }
        .is_empty());
    }

    #[test]
    fn now_is_truncated_to_microseconds() {
        assert_eq!(now().timestamp_subsec_nanos() % 1_000, 0);
    }
}
