//! Infraction store abstraction.
//!
//! The moderation core only needs the read/write contract below; the
//! sea-orm backed [`InfractionRepository`] is the production implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::Set;
use std::sync::Arc;
use warden_common::{AppResult, IdGenerator};
use warden_db::entities::infraction::{self, SeverityClass};
use warden_db::repositories::InfractionRepository;

/// A warn about to be recorded. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInfraction {
    pub subject_id: String,
    pub issuer_id: String,
    pub severity: SeverityClass,
    pub severity_weight: i32,
    pub reason: String,
}

/// Durable infraction history. Every call may fail with a database error;
/// implementations must not retry behind the caller's back.
#[async_trait]
pub trait InfractionStore: Send + Sync {
    /// Record a new infraction.
    async fn insert(&self, infraction: NewInfraction) -> AppResult<infraction::Model>;

    /// Non-discarded infractions of `subject_id` created at or after `since`,
    /// oldest first.
    async fn get_active(
        &self,
        subject_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<infraction::Model>>;

    /// Every infraction of `subject_id`, discarded ones included.
    async fn get_all(&self, subject_id: &str) -> AppResult<Vec<infraction::Model>>;

    /// Look up one infraction.
    async fn find_by_id(&self, id: &str) -> AppResult<Option<infraction::Model>>;

    /// Discard one infraction. Discarding is permanent.
    async fn discard_by_id(&self, id: &str) -> AppResult<()>;

    /// Discard every infraction of a subject.
    async fn discard_all_by_subject(&self, subject_id: &str) -> AppResult<()>;
}

/// Shared handle to an infraction store.
pub type InfractionStoreService = Arc<dyn InfractionStore>;

/// [`InfractionStore`] backed by the database.
#[derive(Clone)]
pub struct DbInfractionStore {
    repo: InfractionRepository,
    id_gen: IdGenerator,
}

impl DbInfractionStore {
    /// Wrap an infraction repository.
    #[must_use]
    pub const fn new(repo: InfractionRepository) -> Self {
        Self {
            repo,
            id_gen: IdGenerator::new(),
        }
    }
}

#[async_trait]
impl InfractionStore for DbInfractionStore {
    async fn insert(&self, infraction: NewInfraction) -> AppResult<infraction::Model> {
        let model = infraction::ActiveModel {
            id: Set(self.id_gen.generate()),
            subject_id: Set(infraction.subject_id),
            issuer_id: Set(infraction.issuer_id),
            severity: Set(infraction.severity),
            severity_weight: Set(infraction.severity_weight),
            reason: Set(infraction.reason),
            created_at: Set(Utc::now().into()),
            discarded: Set(false),
        };
        self.repo.create(model).await
    }

    async fn get_active(
        &self,
        subject_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<infraction::Model>> {
        self.repo.find_active_by_subject(subject_id, since).await
    }

    async fn get_all(&self, subject_id: &str) -> AppResult<Vec<infraction::Model>> {
        self.repo.find_all_by_subject(subject_id).await
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<infraction::Model>> {
        self.repo.find_by_id(id).await
    }

    async fn discard_by_id(&self, id: &str) -> AppResult<()> {
        self.repo.discard_by_id(id).await.map(|_| ())
    }

    async fn discard_all_by_subject(&self, subject_id: &str) -> AppResult<()> {
        self.repo.discard_all_by_subject(subject_id).await.map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_insert_returns_stored_row() {
        let stored = infraction::Model {
            id: "01hx".to_string(),
            subject_id: "user1".to_string(),
            issuer_id: "mod1".to_string(),
            severity: SeverityClass::High,
            severity_weight: 40,
            reason: "Raiding".to_string(),
            created_at: Utc::now().into(),
            discarded: false,
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[stored.clone()]])
                .into_connection(),
        );
        let store = DbInfractionStore::new(InfractionRepository::new(db));

        let result = store
            .insert(NewInfraction {
                subject_id: "user1".to_string(),
                issuer_id: "mod1".to_string(),
                severity: SeverityClass::High,
                severity_weight: 40,
                reason: "Raiding".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(result.id, "01hx");
        assert!(!result.discarded);
    }

    #[tokio::test]
    async fn test_discard_by_id() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let store = DbInfractionStore::new(InfractionRepository::new(db));

        assert!(store.discard_by_id("01hx").await.is_ok());
    }
}
