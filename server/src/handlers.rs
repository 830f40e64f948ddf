#![allow(clippy::unused_async)]
use crate::domain::{BatchOutcome, IngestionError, ManageError};
use crate::file_reply::ArchiveReply;
use crate::ingest::Pipeline;
use crate::notify::Notifier;
use axum::Json;
use axum::extract::{Form, FromRequest, Multipart, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use futures::TryStreamExt;
use kernel::{ARCHIVE_NAME, FILES_FIELD, ImageEntry, SECRET_FIELD, signal};
use serde::Deserialize;
use std::io;
use std::sync::Arc;
use std::time::Instant;
use subtle::ConstantTimeEq;
use tokio_util::io::StreamReader;
use utoipa::{IntoParams, ToSchema};

const UPLOAD_SUCCESS: &str = r#"
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 -960 960 960" ><path d="m424-296 282-282-56-56-226 226-114-114-56 56 170 170Zm56 216q-83 0-156-31.5T197-197q-54-54-85.5-127T80-480q0-83 31.5-156T197-763q54-54 127-85.5T480-880q83 0 156 31.5T763-763q54 54 85.5 127T880-480q0 83-31.5 156T763-197q-54 54-127 85.5T480-80Zm0-80q134 0 227-93t93-227q0-134-93-227t-227-93q-134 0-227 93t-93 227q0 134 93 227t227 93Zm0-320Z"/></svg>
<span>Files uploaded successfully</span>
"#;

/// Shared by every request task.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub secret_key: Option<Arc<str>>,
    pub notifier: Arc<Notifier>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AdminForm {
    /// Shared admin secret
    #[serde(rename = "secret-key", default)]
    pub secret_key: String,
}

/// Stores every file of a multipart form into the storage directory.
#[utoipa::path(
    post,
    path = "/upload",
    responses(
        (status = 200, description = "All files stored", body = String, content_type = "text/html"),
        (status = 401, description = "A file could not be opened, read, created or copied. See HX-Trigger header"),
        (status = 500, description = "A file is not an accepted image", body = String)
    ),
    tag = "images",
)]
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let start = Instant::now();
    match ingest_batch(&state.pipeline, &mut multipart).await {
        BatchOutcome::Completed { stored } => {
            tracing::info!("batch of {} files stored in {:?}", stored.len(), start.elapsed());
            state.notifier.fire(stored.len());
            (StatusCode::OK, Html(UPLOAD_SUCCESS)).into_response()
        }
        BatchOutcome::Aborted {
            stored,
            failed_at,
            error,
        } => {
            tracing::error!(
                "batch aborted at file #{failed_at}, {} files kept. Error: {error}",
                stored.len()
            );
            error.into_response()
        }
    }
}

/// Runs the pipeline over the `files` parts in order, stopping at the first
/// failure. Parts under other names, or without a file name, are skipped.
pub async fn ingest_batch(pipeline: &Pipeline, multipart: &mut Multipart) -> BatchOutcome {
    let mut stored = Vec::new();
    let mut index = 0;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return BatchOutcome::Aborted {
                    stored,
                    failed_at: index,
                    error: IngestionError::OpenFailed(io::Error::other(e)),
                };
            }
        };
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(ToOwned::to_owned) else {
            continue;
        };

        let reader = StreamReader::new(field.map_err(io::Error::other));
        futures::pin_mut!(reader);
        match pipeline.ingest(reader, &file_name).await {
            Ok(file) => stored.push(file),
            Err(error) => {
                return BatchOutcome::Aborted {
                    stored,
                    failed_at: index,
                    error,
                };
            }
        }
        index += 1;
    }
    BatchOutcome::Completed { stored }
}

/// Checks the admin secret and sends the client on to the image list.
///
/// The secret is read from a url encoded or multipart body, falling back to
/// the query string. A request without a readable secret is a wrong secret.
#[utoipa::path(
    post,
    path = "/admin",
    params(AdminForm),
    request_body(content = AdminForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Secret accepted. HX-Redirect header points to /images"),
        (status = 401, description = "Wrong secret (HX-Trigger: wrong-key) or unreadable storage (HX-Trigger: error)")
    ),
    tag = "admin",
)]
pub async fn admin(State(state): State<AppState>, request: Request) -> Result<Response, ManageError> {
    let given = submitted_secret(request).await.unwrap_or_default();
    if !secret_matches(state.secret_key.as_deref(), &given) {
        tracing::warn!("admin access denied");
        return Err(ManageError::WrongSecret);
    }
    state.pipeline.storage().probe().await.inspect_err(|e| {
        tracing::error!("{e}");
    })?;
    Ok((StatusCode::OK, [(signal::REDIRECT_HEADER, "/images")]).into_response())
}

async fn submitted_secret(request: Request) -> Option<String> {
    let from_query = Query::<AdminForm>::try_from_uri(request.uri())
        .ok()
        .map(|Query(form)| form.secret_key)
        .filter(|s| !s.is_empty());
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let from_body = if content_type.starts_with("multipart/form-data") {
        multipart_secret(request).await
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        Form::<AdminForm>::from_request(request, &())
            .await
            .ok()
            .map(|Form(form)| form.secret_key)
    } else {
        None
    };
    from_body.filter(|s| !s.is_empty()).or(from_query)
}

async fn multipart_secret(request: Request) -> Option<String> {
    let mut multipart = Multipart::from_request(request, &()).await.ok()?;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some(SECRET_FIELD) {
            return field.text().await.ok();
        }
    }
    None
}

/// Lists stored images
#[utoipa::path(
    get,
    path = "/images",
    responses(
        (status = 200, description = "Stored images, empty if nothing was uploaded yet", body = [ImageEntry]),
        (status = 500, description = "Storage directory cannot be listed", body = String)
    ),
    tag = "images",
)]
pub async fn images(State(state): State<AppState>) -> Result<Json<Vec<ImageEntry>>, ManageError> {
    let entries = state.pipeline.storage().list().await.inspect_err(|e| {
        tracing::error!("{e}");
    })?;
    tracing::info!("listed {} images", entries.len());
    Ok(Json(entries))
}

/// Downloads every stored image as one zip archive
#[utoipa::path(
    get,
    path = "/download",
    responses(
        (status = 200, description = "Zip archive named images.zip"),
        (status = 400, description = "An image cannot be read or archived", body = String)
    ),
    tag = "images",
)]
pub async fn download(State(state): State<AppState>) -> Result<ArchiveReply, ManageError> {
    let stream = state.pipeline.storage().archive().await.inspect_err(|e| {
        tracing::error!("{e}");
    })?;
    tracing::info!("streaming {ARCHIVE_NAME}");
    Ok(ArchiveReply::new(stream, ARCHIVE_NAME))
}

/// Deletes all stored images
#[utoipa::path(
    post,
    path = "/delete",
    responses(
        (status = 303, description = "Images deleted, redirects to /images"),
        (status = 400, description = "Storage directory cannot be removed", body = String)
    ),
    tag = "images",
)]
pub async fn delete(State(state): State<AppState>) -> Result<Redirect, ManageError> {
    state.pipeline.storage().clear().await.inspect_err(|e| {
        tracing::error!("{e}");
    })?;
    tracing::info!(
        "storage directory {} removed",
        state.pipeline.storage().path().display()
    );
    Ok(Redirect::to("/images"))
}

fn secret_matches(expected: Option<&str>, given: &str) -> bool {
    expected.is_some_and(|expected| bool::from(expected.as_bytes().ct_eq(given.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use rstest::rstest;

    #[rstest]
    #[case(Some("key"), "key", true)]
    #[case(Some("key"), "kez", false)]
    #[case(Some("key"), "key ", false)]
    #[case(Some("key"), "", false)]
    #[case(None, "", false)]
    #[case(None, "anything", false)]
    #[trace]
    fn secret_matches_tests(
        #[case] expected: Option<&str>,
        #[case] given: &str,
        #[case] result: bool,
    ) {
        assert_eq!(secret_matches(expected, given), result);
    }

    const BOUNDARY: &str = "picdropboundary";

    fn multipart_body(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n--{BOUNDARY}--\r\n"
        )
    }

    fn admin_request(uri: &str, content_type: Option<String>, body: String) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[rstest]
    #[case::url_encoded(
        admin_request("/admin", Some("application/x-www-form-urlencoded".into()), "secret-key=abc".into()),
        Some("abc")
    )]
    #[case::multipart(
        admin_request(
            "/admin",
            Some(format!("multipart/form-data; boundary={BOUNDARY}")),
            multipart_body("secret-key", "abc"),
        ),
        Some("abc")
    )]
    #[case::multipart_other_field(
        admin_request(
            "/admin",
            Some(format!("multipart/form-data; boundary={BOUNDARY}")),
            multipart_body("comment", "abc"),
        ),
        None
    )]
    #[case::query(admin_request("/admin?secret-key=abc", None, String::new()), Some("abc"))]
    #[case::body_wins_over_query(
        admin_request("/admin?secret-key=old", Some("application/x-www-form-urlencoded".into()), "secret-key=new".into()),
        Some("new")
    )]
    #[case::empty_body(admin_request("/admin", None, String::new()), None)]
    #[case::plain_text(admin_request("/admin", Some("text/plain".into()), "secret-key=abc".into()), None)]
    #[case::broken_multipart(
        admin_request("/admin", Some("multipart/form-data".into()), "garbage".into()),
        None
    )]
    #[tokio::test]
    async fn submitted_secret_tests(#[case] request: Request, #[case] expected: Option<&str>) {
        // Act
        let actual = submitted_secret(request).await;

        // Assert
        assert_eq!(actual.as_deref(), expected);
    }
}
