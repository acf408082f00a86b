use std::collections::BTreeMap;

use poster_common::storage::ContentHash;
use serde::{Deserialize, Serialize};

use crate::entity::poster;
use crate::error::AppError;
use crate::extractors::origin::RequestOrigin;
use crate::models::shared::parse_form_bool;
use crate::repository::{BlobRef, NewPoster, PosterChanges};
use crate::utils::media_url::MediaUrls;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const INVALID_INTEGER: &str = "A valid integer is required.";
const INVALID_BOOLEAN: &str = "Must be a valid boolean.";
pub const NO_FILE: &str = "No file was submitted.";
pub const NOT_A_FILE: &str = "The submitted data was not a file. Check the encoding type on the form.";
pub const EMPTY_FILE: &str = "The submitted file is empty.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Query parameters for listing posters.
#[derive(Debug, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PosterListQuery {
    /// `1`, `true`, `True` or `yes` also returns hidden posters.
    #[param(example = "1")]
    pub include_hidden: Option<String>,
}

impl PosterListQuery {
    /// Build from raw query pairs. A repeated parameter keeps its last value
    /// and unknown parameters are ignored, so listing never rejects a query.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let include_hidden = pairs
            .into_iter()
            .filter(|(name, _)| name == "include_hidden")
            .map(|(_, value)| value)
            .last();
        Self { include_hidden }
    }
}

/// Public representation of a poster.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PosterResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Poster A")]
    pub title: String,
    #[schema(example = 2023)]
    pub year: i32,
    #[schema(example = "Gold")]
    pub award: String,
    #[serde(rename = "type")]
    #[schema(example = "Research")]
    pub kind: String,
    #[schema(example = "Synthetic biology")]
    pub area: String,
    pub description: String,
    pub hidden: bool,
    /// Absolute when the request carried a `Host` header.
    #[schema(example = "http://localhost:8000/media/ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad/poster-a.png")]
    pub image_url: String,
    /// `null` when the poster has no PDF.
    pub pdf_url: Option<String>,
}

impl PosterResponse {
    pub fn from_model(model: poster::Model, urls: &MediaUrls, origin: &RequestOrigin) -> Self {
        let image_url = urls.url(&model.image_hash, &model.image_name, origin);
        let pdf_url = match (&model.pdf_hash, &model.pdf_name) {
            (Some(hash), Some(name)) => Some(urls.url(hash, name, origin)),
            _ => None,
        };

        Self {
            id: model.id,
            title: model.title,
            year: model.year,
            award: model.award,
            kind: model.kind,
            area: model.area,
            description: model.description,
            hidden: model.hidden,
            image_url,
            pdf_url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityStatus {
    Hidden,
    Visible,
}

/// Body returned by hide and unhide.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VisibilityStatusResponse {
    pub status: VisibilityStatus,
}

/// Fields collected from a multipart poster form, before validation.
///
/// Text values are stored trimmed. File parts arrive already written to the
/// blob store; `written` lists every blob stored while reading the form,
/// including ones that were later rejected, so the caller can release them.
#[derive(Debug, Default)]
pub struct PosterForm {
    pub title: Option<String>,
    pub year: Option<String>,
    pub award: Option<String>,
    pub kind: Option<String>,
    pub area: Option<String>,
    pub description: Option<String>,
    pub hidden: Option<String>,
    pub image: Option<BlobRef>,
    /// `Some(None)` clears the PDF.
    pub pdf: Option<Option<BlobRef>>,
    pub written: Vec<ContentHash>,
    errors: BTreeMap<String, String>,
}

impl PosterForm {
    /// Part names the form understands; anything else is skipped unread.
    pub const FIELDS: [&'static str; 9] = [
        "title",
        "year",
        "award",
        "type",
        "area",
        "description",
        "hidden",
        "image",
        "pdf",
    ];

    /// Record a non-file part. Unknown names are ignored.
    pub fn set_text(&mut self, name: &str, value: &str) {
        let value = value.trim().to_string();
        let slot = match name {
            "title" => &mut self.title,
            "year" => &mut self.year,
            "award" => &mut self.award,
            "type" => &mut self.kind,
            "area" => &mut self.area,
            "description" => &mut self.description,
            "hidden" => &mut self.hidden,
            "image" => {
                self.reject("image", NO_FILE);
                return;
            }
            "pdf" => {
                if value.is_empty() {
                    self.pdf = Some(None);
                } else {
                    self.reject("pdf", NOT_A_FILE);
                }
                return;
            }
            _ => return,
        };
        *slot = Some(value);
    }

    pub fn reject(&mut self, field: &str, message: &str) {
        self.errors.insert(field.to_string(), message.to_string());
    }

    /// Validate as a create request: title, year and image are required.
    pub fn into_new_poster(self) -> Result<NewPoster, AppError> {
        let mut errors = self.errors;

        let title = require(self.title, "title", REQUIRED, &mut errors)
            .and_then(|t| non_blank(t, "title", &mut errors));
        let year = require(self.year, "year", REQUIRED, &mut errors)
            .and_then(|y| parse_year(&y, &mut errors));
        let hidden = match self.hidden {
            Some(h) => parse_hidden(&h, &mut errors),
            None => Some(false),
        };
        let image = require(self.image, "image", NO_FILE, &mut errors);

        match (title, year, hidden, image) {
            (Some(title), Some(year), Some(hidden), Some(image)) if errors.is_empty() => {
                Ok(NewPoster {
                    title,
                    year,
                    award: self.award.unwrap_or_default(),
                    kind: self.kind.unwrap_or_default(),
                    area: self.area.unwrap_or_default(),
                    description: self.description.unwrap_or_default(),
                    hidden,
                    image,
                    pdf: self.pdf.flatten(),
                })
            }
            _ => Err(AppError::InvalidFields(errors)),
        }
    }

    /// Validate as a partial update: every field is optional.
    pub fn into_changes(self) -> Result<PosterChanges, AppError> {
        let mut errors = self.errors;

        let title = self.title.and_then(|t| non_blank(t, "title", &mut errors));
        let year = self.year.and_then(|y| parse_year(&y, &mut errors));
        let hidden = self.hidden.and_then(|h| parse_hidden(&h, &mut errors));

        if !errors.is_empty() {
            return Err(AppError::InvalidFields(errors));
        }

        Ok(PosterChanges {
            title,
            year,
            award: self.award,
            kind: self.kind,
            area: self.area,
            description: self.description,
            hidden,
            image: self.image,
            pdf: self.pdf,
        })
    }
}

/// Keeps an earlier, more specific message for the same field.
fn require<T>(
    value: Option<T>,
    field: &str,
    message: &str,
    errors: &mut BTreeMap<String, String>,
) -> Option<T> {
    if value.is_none() {
        errors
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }
    value
}

fn non_blank(value: String, field: &str, errors: &mut BTreeMap<String, String>) -> Option<String> {
    if value.is_empty() {
        errors.insert(field.to_string(), BLANK.to_string());
        return None;
    }
    Some(value)
}

fn parse_year(value: &str, errors: &mut BTreeMap<String, String>) -> Option<i32> {
    match value.parse::<i32>() {
        Ok(year) => Some(year),
        Err(_) => {
            errors.insert("year".into(), INVALID_INTEGER.into());
            None
        }
    }
}

fn parse_hidden(value: &str, errors: &mut BTreeMap<String, String>) -> Option<bool> {
    let parsed = parse_form_bool(value);
    if parsed.is_none() {
        errors.insert("hidden".into(), INVALID_BOOLEAN.into());
    }
    parsed
}
