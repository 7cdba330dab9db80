use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;

/// Bucket layout per data type, mirroring the vault's organization on the
/// NAS: one bucket per kind of user data.
pub const BUCKETS: &[(&str, &str)] = &[
    ("profile_pictures", "user-profiles"),
    ("documents", "user-documents"),
    ("status_attachments", "user-attachments"),
    ("backups", "user-backups"),
];

pub const PROFILE_PICTURE_MAX_BYTES: usize = 10 * 1024 * 1024;
pub const DOCUMENT_MAX_BYTES: usize = 100 * 1024 * 1024;
pub const ATTACHMENT_MAX_BYTES: usize = 50 * 1024 * 1024;

pub fn bucket_for(data_type: &str) -> Option<&'static str> {
    BUCKETS
        .iter()
        .find(|(dt, _)| *dt == data_type)
        .map(|(_, bucket)| *bucket)
}

pub fn safe_filename(filename: &str) -> String {
    filename.replace([' ', '/'], "_")
}

/// Object names are partitioned by owner, data type, optional category and
/// upload month: `{user_id}/{data_type}[/{category}]/{YYYY}/{MM}/{HHMMSS}_{name}`.
/// The leading user-id segment is what the ownership check keys on.
pub fn object_name(
    user_id: Uuid,
    data_type: &str,
    category: Option<&str>,
    filename: &str,
    now: OffsetDateTime,
) -> String {
    let date_partition = format!("{:04}/{:02}", now.year(), now.month() as u8);
    let stamp = format!(
        "{:02}{:02}{:02}",
        now.hour(),
        now.minute(),
        now.second()
    );
    match category {
        Some(category) => format!(
            "{}/{}/{}/{}/{}_{}",
            user_id,
            data_type,
            category,
            date_partition,
            stamp,
            safe_filename(filename)
        ),
        None => format!(
            "{}/{}/{}/{}_{}",
            user_id,
            data_type,
            date_partition,
            stamp,
            safe_filename(filename)
        ),
    }
}

/// Ownership gate for downloads and deletes: an object name that is not
/// prefixed by the caller's own id is forbidden, and the check runs before
/// any store call so a non-owned name can never surface as "not found".
pub fn ensure_owned(user_id: Uuid, object_name: &str) -> Result<(), ApiError> {
    if object_name.starts_with(&format!("{}/", user_id)) {
        Ok(())
    } else {
        Err(ApiError::Authorization(
            "Access denied: you can only access your own files".into(),
        ))
    }
}

/// Listing prefix for a user, optionally narrowed by data type and category.
pub fn list_prefix(user_id: Uuid, data_type: Option<&str>, category: Option<&str>) -> String {
    let mut prefix = format!("{}/", user_id);
    if let Some(data_type) = data_type {
        prefix.push_str(data_type);
        prefix.push('/');
        if let Some(category) = category {
            prefix.push_str(category);
            prefix.push('/');
        }
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn bucket_layout_covers_all_data_types() {
        assert_eq!(bucket_for("profile_pictures"), Some("user-profiles"));
        assert_eq!(bucket_for("documents"), Some("user-documents"));
        assert_eq!(bucket_for("status_attachments"), Some("user-attachments"));
        assert_eq!(bucket_for("backups"), Some("user-backups"));
        assert_eq!(bucket_for("system_logs"), None);
    }

    #[test]
    fn object_names_are_owner_prefixed_and_partitioned() {
        let user_id = Uuid::new_v4();
        let now = datetime!(2026-08-06 14:30:05 UTC);
        let name = object_name(user_id, "documents", Some("taxes"), "w2 2025.pdf", now);
        assert_eq!(
            name,
            format!("{}/documents/taxes/2026/08/143005_w2_2025.pdf", user_id)
        );
        assert!(ensure_owned(user_id, &name).is_ok());
    }

    #[test]
    fn object_names_without_category_skip_the_segment() {
        let user_id = Uuid::new_v4();
        let now = datetime!(2026-01-02 03:04:05 UTC);
        let name = object_name(user_id, "profile_pictures", None, "me.png", now);
        assert_eq!(
            name,
            format!("{}/profile_pictures/2026/01/030405_me.png", user_id)
        );
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(safe_filename("a b/c.txt"), "a_b_c.txt");
    }

    #[test]
    fn foreign_objects_are_forbidden_not_missing() {
        let caller = Uuid::new_v4();
        let other = Uuid::new_v4();
        let err = ensure_owned(caller, &format!("{}/documents/2026/01/x.pdf", other))
            .expect_err("must be rejected");
        assert!(matches!(err, ApiError::Authorization(_)));
    }

    #[test]
    fn prefix_tricks_do_not_pass_ownership() {
        let caller = Uuid::new_v4();
        // Same id as a substring but not a full path segment.
        let sneaky = format!("{}abc/documents/x.pdf", caller);
        assert!(ensure_owned(caller, &sneaky).is_err());
        assert!(ensure_owned(caller, "").is_err());
    }

    #[test]
    fn list_prefix_narrows_by_type_and_category() {
        let user_id = Uuid::new_v4();
        assert_eq!(list_prefix(user_id, None, None), format!("{}/", user_id));
        assert_eq!(
            list_prefix(user_id, Some("documents"), None),
            format!("{}/documents/", user_id)
        );
        assert_eq!(
            list_prefix(user_id, Some("documents"), Some("taxes")),
            format!("{}/documents/taxes/", user_id)
        );
        // Category alone is meaningless without a data type.
        assert_eq!(
            list_prefix(user_id, None, Some("taxes")),
            format!("{}/", user_id)
        );
    }
}
