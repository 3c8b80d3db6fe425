//! Infraction repository.

use std::sync::Arc;

use crate::entities::{Infraction, infraction};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::Expr,
};
use warden_common::{AppError, AppResult};

/// Infraction repository for database operations.
///
/// Infractions are append-only: the only mutation offered is the one-way
/// discard flag.
#[derive(Clone)]
pub struct InfractionRepository {
    db: Arc<DatabaseConnection>,
}

impl InfractionRepository {
    /// Create a new infraction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a new infraction.
    pub async fn create(&self, model: infraction::ActiveModel) -> AppResult<infraction::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an infraction by ID, discarded or not.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<infraction::Model>> {
        Infraction::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Non-discarded infractions of a subject created at or after `since`,
    /// oldest first.
    pub async fn find_active_by_subject(
        &self,
        subject_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<infraction::Model>> {
        Infraction::find()
            .filter(infraction::Column::SubjectId.eq(subject_id))
            .filter(infraction::Column::Discarded.eq(false))
            .filter(infraction::Column::CreatedAt.gte(since))
            .order_by_asc(infraction::Column::CreatedAt)
            .order_by_asc(infraction::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Full infraction history of a subject, including discarded ones, newest first.
    pub async fn find_all_by_subject(&self, subject_id: &str) -> AppResult<Vec<infraction::Model>> {
        Infraction::find()
            .filter(infraction::Column::SubjectId.eq(subject_id))
            .order_by_desc(infraction::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark one infraction as discarded. Returns the number of rows changed.
    pub async fn discard_by_id(&self, id: &str) -> AppResult<u64> {
        let result = Infraction::update_many()
            .col_expr(infraction::Column::Discarded, Expr::value(true))
            .filter(infraction::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Mark every active infraction of a subject as discarded.
    pub async fn discard_all_by_subject(&self, subject_id: &str) -> AppResult<u64> {
        let result = Infraction::update_many()
            .col_expr(infraction::Column::Discarded, Expr::value(true))
            .filter(infraction::Column::SubjectId.eq(subject_id))
            .filter(infraction::Column::Discarded.eq(false))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(
            subject_id = %subject_id,
            discarded = result.rows_affected,
            "Discarded infractions"
        );
        Ok(result.rows_affected)
    }
}
