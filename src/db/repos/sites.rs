use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{SiteBaggage, SiteFileField, SiteStatus},
};

#[async_trait]
pub trait SiteRepo: Send + Sync {
    /// Ids of every site whose status is not `Archived`.
    async fn list_unarchived_ids(&self) -> DbResult<Vec<Uuid>>;

    /// Unmanaged sites created before `created_before` that still carry at
    /// least one non-empty provisioning file reference.
    async fn list_baggage_candidates(
        &self,
        created_before: DateTime<Utc>,
    ) -> DbResult<Vec<SiteBaggage>>;

    /// Set one reference field to NULL.
    ///
    /// Returns `false` when the field was already NULL or blank.
    async fn clear_file_reference(&self, site_id: Uuid, field: SiteFileField) -> DbResult<bool>;
}

/// Quoted, comma separated list of managed statuses for `NOT IN (...)`.
///
/// Built from fixed enum strings only.
pub fn managed_status_list() -> String {
    SiteStatus::MANAGED
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A reference made only of spaces counts as unset.
///
/// Matches SQL `TRIM(column) = ''`, which strips spaces on both backends.
pub fn is_blank_reference(value: &str) -> bool {
    value.trim_matches(' ').is_empty()
}

/// SQL predicate that holds when `column` carries a reference.
pub fn reference_present(column: &str) -> String {
    format!("({column} IS NOT NULL AND TRIM({column}) != '')")
}

/// SQL predicate that holds when any reference column is set.
pub fn has_file_reference_predicate() -> String {
    SiteFileField::ALL
        .iter()
        .map(|f| reference_present(f.column()))
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_managed_status_list() {
        assert_eq!(
            managed_status_list(),
            "'Pending', 'Installing', 'Updating', 'Active', 'Broken'"
        );
    }

    #[test]
    fn test_has_file_reference_predicate_covers_every_column() {
        let predicate = has_file_reference_predicate();
        for field in SiteFileField::ALL {
            assert!(predicate.contains(&format!("TRIM({}) != ''", field.column())));
        }
        assert_eq!(predicate.matches(" OR ").count(), SiteFileField::ALL.len() - 1);
    }

    #[test]
    fn test_is_blank_reference() {
        assert!(is_blank_reference(""));
        assert!(is_blank_reference("   "));
        assert!(!is_blank_reference(" db.sql.gz "));
    }
}
