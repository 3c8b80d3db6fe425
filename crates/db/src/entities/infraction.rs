//! Infraction entity.

use std::fmt;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Severity tier of an infraction, ordered from least to most severe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum SeverityClass {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
}

impl fmt::Display for SeverityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        };
        f.write_str(name)
    }
}

/// Infraction model - one warn issued against a user.
///
/// Rows are never deleted and never edited, apart from `discarded`
/// flipping from `false` to `true`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "infraction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// The warned user.
    pub subject_id: String,
    /// The staff member who issued the warn.
    pub issuer_id: String,
    /// Severity tier.
    pub severity: SeverityClass,
    /// Weight of the tier at the time the warn was issued.
    pub severity_weight: i32,
    /// Reason given by the issuer.
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    /// When the warn was recorded.
    pub created_at: DateTimeWithTimeZone,
    /// Whether the warn was cleared. Discarded warns never count again.
    pub discarded: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
