//! gripe-box/crates/gb-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Gripe Box.

pub mod auth;
pub mod error;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use auth::*;
pub use error::*;
pub use models::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use super::AppError;

    #[test]
    fn test_complaint_creation_from_draft() {
        let draft = NewComplaint::new("alice@corp.example", "Coffee", "The machine is broken");
        assert!(draft.validate().is_ok());

        let now = chrono::Utc::now();
        let complaint = draft.into_complaint(7, now);
        assert_eq!(complaint.id, 7);
        assert_eq!(complaint.created_at, now);
        assert!(!complaint.hidden);
    }

    #[test]
    fn test_blank_fields_fail_validation() {
        for (subject, description) in [("", "body"), ("subject", ""), ("   ", "body"), ("s", "\n\t")] {
            let draft = NewComplaint::new("alice@corp.example", subject, description);
            assert!(matches!(draft.validate(), Err(AppError::ValidationError(_))));
        }
    }

    #[test]
    fn test_json_field_names() {
        let complaint = NewComplaint::new("a@b.c", "s", "d")
            .into_complaint(1, "2024-03-01T12:00:00Z".parse().unwrap());
        let value = serde_json::to_value(&complaint).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["reporter"], "a@b.c");
        assert_eq!(value["created_at"], "2024-03-01T12:00:00Z");
        assert_eq!(value["hidden"], false);

        // records written before hiding existed have no `hidden` field
        let legacy: Complaint = serde_json::from_str(
            r#"{"id":3,"reporter":"a@b.c","subject":"s","description":"d","created_at":"2024-03-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert!(!legacy.hidden);
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("ya29.very-secret");
        assert!(!format!("{token:?}").contains("secret"));
        assert_eq!(token.secret(), "ya29.very-secret");
    }
}
