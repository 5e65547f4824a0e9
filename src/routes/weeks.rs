use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, web, HttpResponse};
use futures_util::TryStreamExt;
use uuid::Uuid;

use crate::career_guide_web_server::RuntimeSettings;
use crate::core::jwt_auth::AuthenticatedUser;
use crate::core::utils::{describe_size, read_field_bytes, read_text_field, sanitize_file_name, skip_field};
use crate::core::{AppError, AppSuccessResponse, SupabaseStorage};
use crate::db::{ProfileStore, WeekStore};
use crate::models::viewer::{navigate, FileView, FileViewer};
use crate::models::weeks::{
    CategorizedFile, IncomingFile, NewWeek, NewWeekFile, PublishedWeek, SkippedFile,
    UpdateWeekRequest, Week, WeekChanges, WeekFile, WeekForm, WeekSubmission,
};

#[tracing::instrument(name = "List Weeks", skip(weeks, user), fields(user_id = %user.user_id))]
#[get("")]
pub async fn list_weeks(
    weeks: web::Data<dyn WeekStore>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let weeks = weeks.list_weeks().await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(weeks, "Weeks retrieved successfully")))
}

#[tracing::instrument(
    name = "Create Week",
    skip(weeks, profiles, storage, settings, user, payload),
    fields(user_id = %user.user_id)
)]
#[post("")]
pub async fn create_week(
    weeks: web::Data<dyn WeekStore>,
    profiles: web::Data<dyn ProfileStore>,
    storage: web::Data<SupabaseStorage>,
    settings: web::Data<RuntimeSettings>,
    user: AuthenticatedUser,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let admin = user.require_admin(profiles.get_ref()).await?;

    let form = read_week_form(payload, settings.get_ref()).await?;
    let submission = WeekSubmission::try_from(form)?;
    let published = publish_week(weeks.get_ref(), storage.get_ref(), submission, admin.id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(published, "Week created successfully")))
}

/// Buffers the form. Each file is capped at `max_file_size_bytes`; the
/// part count and the combined size are capped too.
async fn read_week_form(mut payload: Multipart, limits: &RuntimeSettings) -> Result<WeekForm, AppError> {
    let mut form = WeekForm::default();
    let mut total_bytes = 0usize;

    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {:?}", e);
        AppError::validation_error("Invalid multipart form data")
    })? {
        let content_disposition = field.content_disposition();
        let field_name = content_disposition.get_name().unwrap_or_default().to_string();
        let file_name = content_disposition.get_filename().map(str::to_string);

        match field_name.as_str() {
            "week_number" => {
                form.week_number = Some(read_text_field(&mut field, "week_number").await?);
            }
            "title" => {
                form.title = Some(read_text_field(&mut field, "title").await?);
            }
            "description" => {
                form.description = Some(read_text_field(&mut field, "description").await?);
            }
            "files" | "file" => {
                let file_name = file_name
                    .filter(|name| !name.trim().is_empty())
                    .ok_or_else(|| AppError::validation_error("Every uploaded file needs a file name"))?;
                if form.files.len() >= limits.max_files {
                    return Err(AppError::validation_error(format!(
                        "At most {} files can be uploaded per week",
                        limits.max_files
                    )));
                }
                let content_type = field.content_type().map(|ct| ct.to_string());
                let bytes = read_field_bytes(&mut field, limits.max_file_size_bytes).await?;

                total_bytes += bytes.len();
                if total_bytes > limits.max_total_bytes {
                    return Err(AppError::validation_error(format!(
                        "Upload exceeds the maximum total size of {}",
                        describe_size(limits.max_total_bytes)
                    )));
                }

                form.files.push(IncomingFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => skip_field(&mut field).await?,
        }
    }

    Ok(form)
}

/// Duplicate check, week insert, then per-file upload and metadata insert.
/// A file that fails either step is reported in `skipped`; the week stays.
pub async fn publish_week(
    weeks: &dyn WeekStore,
    storage: &SupabaseStorage,
    submission: WeekSubmission,
    admin_id: Uuid,
) -> Result<PublishedWeek, AppError> {
    if weeks.week_number_exists(submission.week_number).await? {
        return Err(AppError::validation_error(format!(
            "Week {} already exists",
            submission.week_number
        )));
    }

    let week = weeks
        .insert_week(&NewWeek {
            week_number: submission.week_number,
            title: submission.title,
            description: submission.description,
            created_by: admin_id,
        })
        .await?;
    tracing::info!(week_id = %week.id, week_number = week.week_number, "week created");

    let mut files = Vec::with_capacity(submission.files.len());
    let mut skipped = Vec::new();
    for file in submission.files {
        match attach_file(weeks, storage, &week, file, admin_id).await {
            Ok(stored) => files.push(stored),
            Err(skip) => skipped.push(skip),
        }
    }

    if !skipped.is_empty() {
        tracing::warn!(
            week_id = %week.id,
            skipped = skipped.len(),
            "week created with files that could not be stored"
        );
    }

    Ok(PublishedWeek {
        week,
        files,
        skipped,
    })
}

async fn attach_file(
    weeks: &dyn WeekStore,
    storage: &SupabaseStorage,
    week: &Week,
    file: CategorizedFile,
    admin_id: Uuid,
) -> Result<WeekFile, SkippedFile> {
    let object_path = format!(
        "week-{}/{}-{}",
        week.week_number,
        Uuid::new_v4(),
        sanitize_file_name(&file.file_name)
    );
    let file_size = file.bytes.len() as i64;

    let stored = storage
        .upload(&object_path, &file.content_type, file.bytes)
        .await
        .map_err(|e| {
            tracing::warn!(file_name = %file.file_name, error = %e, "file upload failed, skipping");
            SkippedFile {
                file_name: file.file_name.clone(),
                reason: "Upload to storage failed".to_string(),
            }
        })?;

    let record = NewWeekFile {
        week_id: week.id,
        file_name: file.file_name.clone(),
        file_type: file.file_type,
        file_url: stored.public_url,
        storage_path: stored.path,
        file_size,
        uploaded_by: admin_id,
    };

    match weeks.insert_week_file(&record).await {
        Ok(inserted) => Ok(inserted),
        Err(e) => {
            tracing::warn!(file_name = %file.file_name, error = %e, "file metadata insert failed, skipping");
            if let Err(e) = storage.remove(&[record.storage_path.clone()]).await {
                tracing::warn!(path = %record.storage_path, error = %e, "failed to remove orphaned object");
            }
            Err(SkippedFile {
                file_name: file.file_name,
                reason: "Failed to record file metadata".to_string(),
            })
        }
    }
}

#[tracing::instrument(name = "Get Week", skip(weeks, user), fields(user_id = %user.user_id))]
#[get("/{week_id}")]
pub async fn get_week(
    weeks: web::Data<dyn WeekStore>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let week = weeks
        .get_week(path.into_inner())
        .await?
        .ok_or_else(|| AppError::not_found("Week not found"))?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(week, "Week retrieved successfully")))
}

#[tracing::instrument(name = "Update Week", skip(weeks, profiles, user, request), fields(user_id = %user.user_id))]
#[patch("/{week_id}")]
pub async fn update_week(
    weeks: web::Data<dyn WeekStore>,
    profiles: web::Data<dyn ProfileStore>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    request: web::Json<UpdateWeekRequest>,
) -> Result<HttpResponse, AppError> {
    user.require_admin(profiles.get_ref()).await?;

    let changes = WeekChanges::try_from(request.into_inner())?;
    let week = weeks
        .update_week(path.into_inner(), &changes)
        .await?
        .ok_or_else(|| AppError::not_found("Week not found"))?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(week, "Week updated successfully")))
}

#[tracing::instrument(name = "Delete Week", skip(weeks, profiles, storage, user), fields(user_id = %user.user_id))]
#[delete("/{week_id}")]
pub async fn delete_week(
    weeks: web::Data<dyn WeekStore>,
    profiles: web::Data<dyn ProfileStore>,
    storage: web::Data<SupabaseStorage>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    user.require_admin(profiles.get_ref()).await?;

    let removed = weeks
        .delete_week(path.into_inner())
        .await?
        .ok_or_else(|| AppError::not_found("Week not found"))?;

    let paths: Vec<String> = removed.files.iter().map(|f| f.storage_path.clone()).collect();
    if let Err(e) = storage.remove(&paths).await {
        tracing::warn!(week_id = %removed.week.id, error = %e, "failed to remove week objects from storage");
    }

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(removed.week, "Week deleted successfully")))
}

#[tracing::instrument(name = "View Week File", skip(weeks, user), fields(user_id = %user.user_id))]
#[get("/{week_id}/files/{file_id}")]
pub async fn view_week_file(
    weeks: web::Data<dyn WeekStore>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (week_id, file_id) = path.into_inner();
    let week = weeks
        .get_week(week_id)
        .await?
        .ok_or_else(|| AppError::not_found("Week not found"))?;

    let navigation = navigate(&week.files, file_id).ok_or_else(|| AppError::not_found("File not found"))?;
    let file = week.files[navigation.position - 1].clone();
    let view = FileView {
        viewer: FileViewer::for_file(&file),
        file,
        navigation,
    };

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(view, "File retrieved successfully")))
}

#[tracing::instrument(name = "Delete Week File", skip(weeks, profiles, storage, user), fields(user_id = %user.user_id))]
#[delete("/{week_id}/files/{file_id}")]
pub async fn delete_week_file(
    weeks: web::Data<dyn WeekStore>,
    profiles: web::Data<dyn ProfileStore>,
    storage: web::Data<SupabaseStorage>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    user.require_admin(profiles.get_ref()).await?;

    let (week_id, file_id) = path.into_inner();
    let removed = weeks
        .delete_week_file(week_id, file_id)
        .await?
        .ok_or_else(|| AppError::not_found("File not found"))?;

    if let Err(e) = storage.remove(&[removed.storage_path.clone()]).await {
        tracing::warn!(file_id = %removed.id, error = %e, "failed to remove object from storage");
    }

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(removed, "File deleted successfully")))
}
