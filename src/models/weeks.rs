use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::core::AppError;

const MAX_TITLE_GRAPHEMES: usize = 200;
const MAX_DESCRIPTION_GRAPHEMES: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "file_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Photo,
    Video,
    Pdf,
}

impl FileType {
    /// Categorize by declared content type. Parameters such as `; charset=`
    /// are ignored; unknown types yield `None`.
    pub fn from_mime(content_type: &str) -> Option<FileType> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence.starts_with("image/") {
            Some(FileType::Photo)
        } else if essence.starts_with("video/") {
            Some(FileType::Video)
        } else if essence == "application/pdf" {
            Some(FileType::Pdf)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Photo => "photo",
            FileType::Video => "video",
            FileType::Pdf => "pdf",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Week {
    pub id: Uuid,
    pub week_number: i32,
    pub title: String,
    pub description: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct WeekFile {
    pub id: Uuid,
    pub week_id: Uuid,
    pub file_name: String,
    pub file_type: FileType,
    pub file_url: String,
    #[serde(skip_serializing, default)]
    pub storage_path: String,
    pub file_size: i64,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeekWithFiles {
    #[serde(flatten)]
    pub week: Week,
    pub files: Vec<WeekFile>,
}

#[derive(Debug, Clone)]
pub struct NewWeek {
    pub week_number: i32,
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewWeekFile {
    pub week_id: Uuid,
    pub file_name: String,
    pub file_type: FileType,
    pub file_url: String,
    pub storage_path: String,
    pub file_size: i64,
    pub uploaded_by: Uuid,
}

/// A file part exactly as it arrived in the upload form.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Raw text fields and file parts of the week upload form.
#[derive(Debug, Default)]
pub struct WeekForm {
    pub week_number: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub files: Vec<IncomingFile>,
}

#[derive(Debug, Clone)]
pub struct CategorizedFile {
    pub file_name: String,
    pub content_type: String,
    pub file_type: FileType,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SubmissionError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Week number must be a positive whole number")]
    InvalidWeekNumber,
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("At least one photo is required")]
    MissingPhoto,
    #[error("At least one PDF is required")]
    MissingPdf,
    #[error("At least one photo and one PDF are required")]
    MissingPhotoAndPdf,
}

impl From<SubmissionError> for AppError {
    fn from(error: SubmissionError) -> Self {
        AppError::validation_error(error)
    }
}

/// A validated week upload: fields checked and files categorized.
#[derive(Debug, Clone)]
pub struct WeekSubmission {
    pub week_number: i32,
    pub title: String,
    pub description: String,
    pub files: Vec<CategorizedFile>,
    /// Names of parts whose content type is not a photo, video or PDF.
    pub ignored: Vec<String>,
}

fn required_text(
    value: Option<String>,
    field: &'static str,
    max: usize,
) -> Result<String, SubmissionError> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(SubmissionError::MissingField(field))?;
    if value.graphemes(true).count() > max {
        return Err(SubmissionError::TooLong { field, max });
    }
    Ok(value)
}

impl TryFrom<WeekForm> for WeekSubmission {
    type Error = SubmissionError;

    fn try_from(form: WeekForm) -> Result<Self, Self::Error> {
        let week_number = form
            .week_number
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(SubmissionError::MissingField("Week number"))?
            .parse::<i32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or(SubmissionError::InvalidWeekNumber)?;
        let title = required_text(form.title, "Title", MAX_TITLE_GRAPHEMES)?;
        let description = required_text(form.description, "Description", MAX_DESCRIPTION_GRAPHEMES)?;

        let mut files = Vec::with_capacity(form.files.len());
        let mut ignored = Vec::new();
        for file in form.files {
            let content_type = file.content_type.unwrap_or_default();
            match FileType::from_mime(&content_type) {
                Some(file_type) => files.push(CategorizedFile {
                    file_name: file.file_name,
                    content_type,
                    file_type,
                    bytes: file.bytes,
                }),
                None => {
                    tracing::debug!(file_name = %file.file_name, %content_type, "skipping file with unsupported type");
                    ignored.push(file.file_name);
                }
            }
        }

        let has_photo = files.iter().any(|f| f.file_type == FileType::Photo);
        let has_pdf = files.iter().any(|f| f.file_type == FileType::Pdf);
        match (has_photo, has_pdf) {
            (false, false) => return Err(SubmissionError::MissingPhotoAndPdf),
            (false, true) => return Err(SubmissionError::MissingPhoto),
            (true, false) => return Err(SubmissionError::MissingPdf),
            (true, true) => {}
        }

        Ok(WeekSubmission {
            week_number,
            title,
            description,
            files,
            ignored,
        })
    }
}

/// Why a categorized file did not end up attached to its week.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishedWeek {
    #[serde(flatten)]
    pub week: Week,
    pub files: Vec<WeekFile>,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWeekRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekChanges {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl TryFrom<UpdateWeekRequest> for WeekChanges {
    type Error = SubmissionError;

    fn try_from(request: UpdateWeekRequest) -> Result<Self, Self::Error> {
        let title = match request.title {
            Some(title) => Some(required_text(Some(title), "Title", MAX_TITLE_GRAPHEMES)?),
            None => None,
        };
        let description = match request.description {
            Some(description) => Some(required_text(
                Some(description),
                "Description",
                MAX_DESCRIPTION_GRAPHEMES,
            )?),
            None => None,
        };
        Ok(WeekChanges { title, description })
    }
}
