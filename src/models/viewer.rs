//! Viewer descriptors for week files and navigation within a week.

use reqwest::Url;
use serde::Serialize;
use uuid::Uuid;

use crate::models::weeks::{FileType, WeekFile};

const FALLBACK_VIDEO_TYPES: [&str; 3] = ["video/mp4", "video/webm", "video/ogg"];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VideoSource {
    pub src: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DownloadAction {
    pub href: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FileViewer {
    Image { src: String, alt: String },
    Video { sources: Vec<VideoSource> },
    Pdf { embed_url: String, download: DownloadAction },
}

fn video_mime_for(file_name: &str) -> Option<&'static str> {
    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "ogv" | "ogg" => Some("video/ogg"),
        "mov" => Some("video/quicktime"),
        _ => None,
    }
}

/// Storage URL with `download=<name>` appended as an encoded query pair.
fn download_href(file_url: &str, file_name: &str) -> String {
    match Url::parse(file_url) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("download", file_name);
            url.into()
        }
        Err(e) => {
            tracing::warn!(%file_url, error = %e, "stored file url is not absolute");
            file_url.to_string()
        }
    }
}

impl FileViewer {
    pub fn for_file(file: &WeekFile) -> FileViewer {
        match file.file_type {
            FileType::Photo => FileViewer::Image {
                src: file.file_url.clone(),
                alt: file.file_name.clone(),
            },
            FileType::Video => {
                let mut mime_types: Vec<&str> = video_mime_for(&file.file_name).into_iter().collect();
                for fallback in FALLBACK_VIDEO_TYPES {
                    if !mime_types.contains(&fallback) {
                        mime_types.push(fallback);
                    }
                }
                FileViewer::Video {
                    sources: mime_types
                        .into_iter()
                        .map(|mime_type| VideoSource {
                            src: file.file_url.clone(),
                            mime_type: mime_type.to_string(),
                        })
                        .collect(),
                }
            }
            FileType::Pdf => FileViewer::Pdf {
                embed_url: format!("{}#toolbar=1&view=FitH", file.file_url),
                download: DownloadAction {
                    href: download_href(&file.file_url, &file.file_name),
                    file_name: file.file_name.clone(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileNavigation {
    /// 1-based.
    pub position: usize,
    pub total: usize,
    pub previous: Option<Uuid>,
    pub next: Option<Uuid>,
}

/// `None` when `current` is not among `files`.
pub fn navigate(files: &[WeekFile], current: Uuid) -> Option<FileNavigation> {
    let index = files.iter().position(|file| file.id == current)?;
    Some(FileNavigation {
        position: index + 1,
        total: files.len(),
        previous: index.checked_sub(1).map(|i| files[i].id),
        next: files.get(index + 1).map(|file| file.id),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct FileView {
    pub file: WeekFile,
    pub viewer: FileViewer,
    pub navigation: FileNavigation,
}
