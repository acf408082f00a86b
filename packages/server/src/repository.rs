//! Data access for the `poster` table.
//!
//! Every function is generic over [`ConnectionTrait`] so handlers can pass
//! either the pool or a transaction. Absence is reported as `Ok(None)`;
//! mapping that to an HTTP 404 is the caller's job.

use chrono::Utc;
use sea_orm::sea_query::Condition;
use sea_orm::*;

use crate::entity::poster;

/// Reference to a blob held in the blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    /// Hex content hash.
    pub hash: String,
    /// Sanitized file name used in the public URL.
    pub name: String,
}

/// Fields needed to insert a poster. `id` and `created_at` are assigned here.
#[derive(Debug, Clone)]
pub struct NewPoster {
    pub title: String,
    pub year: i32,
    pub award: String,
    pub kind: String,
    pub area: String,
    pub description: String,
    pub hidden: bool,
    pub image: BlobRef,
    pub pdf: Option<BlobRef>,
}

/// Partial update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PosterChanges {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub award: Option<String>,
    pub kind: Option<String>,
    pub area: Option<String>,
    pub description: Option<String>,
    pub hidden: Option<bool>,
    pub image: Option<BlobRef>,
    /// `Some(None)` removes the PDF.
    pub pdf: Option<Option<BlobRef>>,
}

impl PosterChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Which rows a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    All,
    VisibleOnly,
}

pub async fn insert<C: ConnectionTrait>(db: &C, new: NewPoster) -> Result<poster::Model, DbErr> {
    let (pdf_hash, pdf_name) = match new.pdf {
        Some(pdf) => (Some(pdf.hash), Some(pdf.name)),
        None => (None, None),
    };

    poster::ActiveModel {
        title: Set(new.title),
        year: Set(new.year),
        award: Set(new.award),
        kind: Set(new.kind),
        area: Set(new.area),
        description: Set(new.description),
        image_hash: Set(new.image.hash),
        image_name: Set(new.image.name),
        pdf_hash: Set(pdf_hash),
        pdf_name: Set(pdf_name),
        hidden: Set(new.hidden),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn get<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<poster::Model>, DbErr> {
    poster::Entity::find_by_id(id).one(db).await
}

/// All posters matching `visibility`, newest year first, ties by id descending.
pub async fn list<C: ConnectionTrait>(
    db: &C,
    visibility: Visibility,
) -> Result<Vec<poster::Model>, DbErr> {
    let mut select = poster::Entity::find();
    if visibility == Visibility::VisibleOnly {
        select = select.filter(poster::Column::Hidden.eq(false));
    }

    select
        .order_by_desc(poster::Column::Year)
        .order_by_desc(poster::Column::Id)
        .all(db)
        .await
}

/// Apply `changes` to poster `id`, returning the updated row.
///
/// Only columns present in `changes` are written; `id` and `created_at` are
/// never touched.
pub async fn update<C: ConnectionTrait>(
    db: &C,
    id: i32,
    changes: PosterChanges,
) -> Result<Option<poster::Model>, DbErr> {
    let Some(existing) = get(db, id).await? else {
        return Ok(None);
    };
    if changes.is_empty() {
        return Ok(Some(existing));
    }

    let mut active = existing.into_active_model();

    if let Some(title) = changes.title {
        active.title = Set(title);
    }
    if let Some(year) = changes.year {
        active.year = Set(year);
    }
    if let Some(award) = changes.award {
        active.award = Set(award);
    }
    if let Some(kind) = changes.kind {
        active.kind = Set(kind);
    }
    if let Some(area) = changes.area {
        active.area = Set(area);
    }
    if let Some(description) = changes.description {
        active.description = Set(description);
    }
    if let Some(hidden) = changes.hidden {
        active.hidden = Set(hidden);
    }
    if let Some(image) = changes.image {
        active.image_hash = Set(image.hash);
        active.image_name = Set(image.name);
    }
    match changes.pdf {
        Some(Some(pdf)) => {
            active.pdf_hash = Set(Some(pdf.hash));
            active.pdf_name = Set(Some(pdf.name));
        }
        Some(None) => {
            active.pdf_hash = Set(None);
            active.pdf_name = Set(None);
        }
        None => {}
    }

    active.update(db).await.map(Some)
}

/// Write only the `hidden` column.
pub async fn set_hidden<C: ConnectionTrait>(
    db: &C,
    id: i32,
    hidden: bool,
) -> Result<Option<poster::Model>, DbErr> {
    let Some(existing) = get(db, id).await? else {
        return Ok(None);
    };

    let mut active = existing.into_active_model();
    active.hidden = Set(hidden);
    active.update(db).await.map(Some)
}

/// Delete poster `id`, returning the removed row so its blobs can be released.
pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<poster::Model>, DbErr> {
    let Some(existing) = get(db, id).await? else {
        return Ok(None);
    };

    let result = poster::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        // Lost a race with another delete.
        return Ok(None);
    }
    Ok(Some(existing))
}

/// Whether any poster still points at blob `hash`, as image or as PDF.
pub async fn blob_in_use<C: ConnectionTrait>(db: &C, hash: &str) -> Result<bool, DbErr> {
    let count = poster::Entity::find()
        .filter(
            Condition::any()
                .add(poster::Column::ImageHash.eq(hash))
                .add(poster::Column::PdfHash.eq(hash)),
        )
        .count(db)
        .await?;
    Ok(count > 0)
}

pub async fn count<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    poster::Entity::find().count(db).await
}
