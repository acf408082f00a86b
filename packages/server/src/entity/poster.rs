use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Storage model for a poster.
///
/// Blob columns hold the content hash plus the sanitized file name the blob was
/// uploaded under. Clients never see them directly; see
/// [`crate::models::poster::PosterResponse`].
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poster")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    pub year: i32,
    pub award: String,
    #[sea_orm(column_name = "type")]
    pub kind: String,
    pub area: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub image_hash: String,
    pub image_name: String,

    pub pdf_hash: Option<String>,
    pub pdf_name: Option<String>,

    pub hidden: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
