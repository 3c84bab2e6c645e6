//! Field validation rules for task requests.
//!
//! # Responsibility
//! - Provide pure, per-field predicates composed by the task service.
//! - Produce human-readable, field-scoped messages.
//!
//! # Invariants
//! - Rules never touch storage or the clock; callers pass `now`.
//! - Lengths are measured in characters, after trimming where noted.
//!
//! Due-date policy: a due date must be at least one full day after `now`.

use chrono::{DateTime, Duration, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 250;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;
pub const TAGS_MAX_ENTRIES: usize = 15;
pub const TAG_MIN_CHARS: usize = 3;
pub const TAG_MAX_CHARS: usize = 50;
/// Separator used when tags are persisted as one string.
pub const TAG_DELIMITER: &str = ",";

/// One failing field and why it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

impl Error for FieldError {}

/// Every field error found in one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the error of a failed rule; passing rules are ignored.
    pub fn record(&mut self, outcome: Result<(), FieldError>) {
        if let Err(err) = outcome {
            self.errors.push(err);
        }
    }

    pub fn push(&mut self, err: FieldError) {
        self.errors.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns the first error recorded for `field`, if any.
    pub fn field(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|err| err.field == field)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(value: FieldError) -> Self {
        Self {
            errors: vec![value],
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, err) in self.errors.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl Error for ValidationErrors {}

/// Title must hold 3..=250 characters once surrounding whitespace is removed.
pub fn validate_title(title: &str) -> Result<(), FieldError> {
    let length = title.trim().chars().count();
    if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&length) {
        return Err(FieldError::new(
            "title",
            format!("must be between {TITLE_MIN_CHARS} and {TITLE_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

/// Absent due dates pass; present ones must be no earlier than `now + 1 day`.
pub fn validate_due_date(
    due_date: Option<&DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), FieldError> {
    let Some(due_date) = due_date else {
        return Ok(());
    };

    if *due_date < now + Duration::days(1) {
        return Err(FieldError::new("due_date", "must be at least tomorrow"));
    }
    Ok(())
}

pub fn validate_description(description: Option<&str>) -> Result<(), FieldError> {
    match description {
        Some(value) if value.chars().count() > DESCRIPTION_MAX_CHARS => Err(FieldError::new(
            "description",
            format!("must be at most {DESCRIPTION_MAX_CHARS} characters"),
        )),
        _ => Ok(()),
    }
}

/// At most 15 labels, each 3..=50 characters and free of the delimiter.
pub fn validate_tags(tags: &[String]) -> Result<(), FieldError> {
    if tags.len() > TAGS_MAX_ENTRIES {
        return Err(FieldError::new(
            "tags",
            format!("must contain at most {TAGS_MAX_ENTRIES} entries"),
        ));
    }

    for tag in tags {
        let trimmed = tag.trim();
        let length = trimmed.chars().count();
        if !(TAG_MIN_CHARS..=TAG_MAX_CHARS).contains(&length) {
            return Err(FieldError::new(
                "tags",
                format!(
                    "entry `{trimmed}` must be between {TAG_MIN_CHARS} and {TAG_MAX_CHARS} characters"
                ),
            ));
        }
        if trimmed.contains(TAG_DELIMITER) {
            return Err(FieldError::new(
                "tags",
                format!("entry `{trimmed}` must not contain `{TAG_DELIMITER}`"),
            ));
        }
    }
    Ok(())
}

/// Trims labels and drops repeats, keeping first occurrence order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim();
        if !trimmed.is_empty() && !normalized.iter().any(|known| known == trimmed) {
            normalized.push(trimmed.to_string());
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_tags, validate_description, validate_due_date, validate_tags, validate_title,
        ValidationErrors,
    };
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn title_accepts_valid_length() {
        assert!(validate_title("Valid Title").is_ok());
        assert!(validate_title("abc").is_ok());
        assert!(validate_title(&"x".repeat(250)).is_ok());
    }

    #[test]
    fn title_rejects_short_and_long_values() {
        let err = validate_title("No").unwrap_err();
        assert_eq!(err.to_string(), "title must be between 3 and 250 characters");
        assert!(validate_title(&"x".repeat(251)).is_err());
    }

    #[test]
    fn title_length_is_measured_after_trim() {
        assert!(validate_title("   ab   ").is_err());
        assert!(validate_title("  abc  ").is_ok());
    }

    #[test]
    fn title_counts_characters_not_bytes() {
        assert!(validate_title("äöü").is_ok());
        assert!(validate_title(&"ж".repeat(250)).is_ok());
    }

    #[test]
    fn due_date_absent_passes() {
        assert!(validate_due_date(None, Utc::now()).is_ok());
    }

    #[test]
    fn due_date_must_be_a_full_day_ahead() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap();

        let exactly_one_day = now + Duration::days(1);
        assert!(validate_due_date(Some(&exactly_one_day), now).is_ok());

        let almost_one_day = exactly_one_day - Duration::milliseconds(1);
        let err = validate_due_date(Some(&almost_one_day), now).unwrap_err();
        assert_eq!(err.to_string(), "due_date must be at least tomorrow");

        let yesterday = now - Duration::days(1);
        assert!(validate_due_date(Some(&yesterday), now).is_err());
        assert!(validate_due_date(Some(&now), now).is_err());
    }

    #[test]
    fn due_date_just_past_midnight_is_rejected() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 23, 59, 0).unwrap();
        let next_day = Utc.with_ymd_and_hms(2026, 3, 11, 0, 1, 0).unwrap();

        assert!(validate_due_date(Some(&next_day), now).is_err());
    }

    #[test]
    fn description_limit_is_inclusive() {
        assert!(validate_description(None).is_ok());
        assert!(validate_description(Some("")).is_ok());
        assert!(validate_description(Some(&"d".repeat(1000))).is_ok());
        let err = validate_description(Some(&"d".repeat(1001))).unwrap_err();
        assert_eq!(err.field, "description");
    }

    #[test]
    fn tags_reject_too_many_entries() {
        let tags: Vec<String> = (0..16).map(|idx| format!("tag{idx}")).collect();
        let err = validate_tags(&tags).unwrap_err();
        assert!(err.message.contains("at most 15"));
        assert!(validate_tags(&tags[..15]).is_ok());
    }

    #[test]
    fn tags_reject_bad_entries() {
        assert!(validate_tags(&["ta".to_string()]).is_err());
        assert!(validate_tags(&["t".repeat(51)]).is_err());
        assert!(validate_tags(&["home,work".to_string()]).is_err());
        assert!(validate_tags(&["home".to_string(), "work".to_string()]).is_ok());
    }

    #[test]
    fn normalize_tags_trims_and_dedupes_in_order() {
        let tags = vec![
            " work ".to_string(),
            "home".to_string(),
            "work".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["work", "home"]);
    }

    #[test]
    fn validation_errors_collect_every_failure() {
        let mut errors = ValidationErrors::new();
        errors.record(validate_title("ab"));
        errors.record(validate_description(Some("fine")));
        errors.record(validate_tags(&["x".to_string()]));

        assert_eq!(errors.errors().len(), 2);
        assert!(errors.field("title").is_some());
        assert!(errors.field("description").is_none());
        assert!(errors.to_string().contains("; tags entry `x`"));
        assert!(errors.into_result().is_err());
    }
}
