/// Field validation for activity drafts

use super::data::Record;

/// Per-field validation messages
///
/// Recomputed as a whole on every submit. A None field passed validation;
/// nothing here is ever persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
}

impl FieldErrors {
    /// True when every field passed
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.date.is_none()
    }
}

/// Validate a draft record against the field rules
///
/// All three fields are checked independently and every failure is
/// reported together, rather than stopping at the first one. The date is
/// only checked for presence; its format is guaranteed by whatever date
/// entry produced it.
pub fn validate(record: &Record) -> FieldErrors {
    let mut errors = FieldErrors::default();

    if record.title.trim().is_empty() {
        errors.title = Some("Title is required".to_string());
    }
    if record.description.is_empty() {
        errors.description = Some("Description is required".to_string());
    }
    if record.date.is_empty() {
        errors.date = Some("Date is required".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> Record {
        Record {
            id: 1,
            title: "Morning run".to_string(),
            description: "5k along the river".to_string(),
            date: "2024-01-01".to_string(),
            photo: None,
        }
    }

    #[test]
    fn test_filled_record_passes() {
        assert!(validate(&filled()).is_empty());
    }

    #[test]
    fn test_all_failures_reported_together() {
        let empty = Record {
            title: String::new(),
            description: String::new(),
            date: String::new(),
            ..filled()
        };
        let errors = validate(&empty);
        assert_eq!(errors.title.as_deref(), Some("Title is required"));
        assert_eq!(errors.description.as_deref(), Some("Description is required"));
        assert_eq!(errors.date.as_deref(), Some("Date is required"));
    }

    #[test]
    fn test_fields_checked_independently() {
        let mut r = filled();
        r.description = String::new();
        let errors = validate(&r);
        assert!(errors.title.is_none());
        assert!(errors.description.is_some());
        assert!(errors.date.is_none());
    }

    #[test]
    fn test_whitespace_title_fails() {
        let mut r = filled();
        r.title = "   ".to_string();
        assert!(validate(&r).title.is_some());
    }
}
