use std::io;

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use kernel::signal;
use thiserror::Error;

use crate::ingest::StoredFile;
use crate::sniff::MediaType;

/// Reasons a single uploaded file is rejected. Any of them aborts the batch.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("cannot open upload part: {0}")]
    OpenFailed(#[source] io::Error),

    #[error("cannot read '{file_name}': {source}")]
    ReadFailed {
        file_name: String,
        #[source]
        source: io::Error,
    },

    #[error("content not allowed: {file_name} ({media})")]
    UnsupportedMediaType { file_name: String, media: MediaType },

    #[error("cannot create '{file_name}': {source}")]
    CreateFailed {
        file_name: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot copy '{file_name}': {source}")]
    CopyFailed {
        file_name: String,
        #[source]
        source: io::Error,
    },
}

impl IngestionError {
    /// Token the upload page listens for, if the failure has one.
    #[must_use]
    pub fn signal(&self) -> Option<&'static str> {
        match self {
            IngestionError::OpenFailed(_) => Some(signal::FAILED_OPEN),
            IngestionError::ReadFailed { .. } => Some(signal::FAILED_READ),
            IngestionError::UnsupportedMediaType { .. } => None,
            IngestionError::CreateFailed { .. } => Some(signal::FAILED_CREATE),
            IngestionError::CopyFailed { .. } => Some(signal::FAILED_COPY),
        }
    }
}

impl IntoResponse for IngestionError {
    fn into_response(self) -> Response {
        match self {
            IngestionError::UnsupportedMediaType { file_name, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("content not allowed: {file_name}"),
            )
                .into_response(),
            other => signalled(StatusCode::UNAUTHORIZED, other.signal()),
        }
    }
}

/// Failures of the admin, listing, download and delete endpoints.
#[derive(Debug, Error)]
pub enum ManageError {
    #[error("wrong secret key")]
    WrongSecret,

    #[error("storage directory cannot be read: {0}")]
    DirectoryUnreadable(#[source] io::Error),

    #[error("cannot list images: {0}")]
    ListFailed(#[source] io::Error),

    #[error("cannot read image '{name}' for the archive: {source}")]
    ZipSourceUnreadable {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot add '{name}' to the archive: {source}")]
    ZipEntryCreateFailed {
        name: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("cannot delete images: {0}")]
    DeleteFailed(#[source] io::Error),
}

impl IntoResponse for ManageError {
    fn into_response(self) -> Response {
        match self {
            ManageError::WrongSecret => signalled(StatusCode::UNAUTHORIZED, Some(signal::WRONG_KEY)),
            ManageError::DirectoryUnreadable(_) => {
                signalled(StatusCode::UNAUTHORIZED, Some(signal::ERROR))
            }
            ManageError::ListFailed(_) => {
                let mut res =
                    (StatusCode::INTERNAL_SERVER_ERROR, "cannot list images").into_response();
                set_trigger(&mut res, signal::ERROR);
                res
            }
            ManageError::ZipSourceUnreadable { .. } => {
                (StatusCode::BAD_REQUEST, "cannot read image").into_response()
            }
            ManageError::ZipEntryCreateFailed { .. } => {
                (StatusCode::BAD_REQUEST, "cannot add image to zip").into_response()
            }
            ManageError::DeleteFailed(_) => {
                (StatusCode::BAD_REQUEST, "cannot delete images from the server").into_response()
            }
        }
    }
}

/// What happened to one multipart batch.
///
/// Ingestion stops at the first failing file. Files stored before it stay on
/// disk, files after it are never read.
#[derive(Debug)]
pub enum BatchOutcome {
    Completed {
        stored: Vec<StoredFile>,
    },
    Aborted {
        stored: Vec<StoredFile>,
        /// Zero based position of the failing file among the batch's files
        failed_at: usize,
        error: IngestionError,
    },
}

impl BatchOutcome {
    #[must_use]
    pub fn stored(&self) -> &[StoredFile] {
        match self {
            BatchOutcome::Completed { stored } | BatchOutcome::Aborted { stored, .. } => stored,
        }
    }
}

fn signalled(status: StatusCode, token: Option<&'static str>) -> Response {
    let mut res = status.into_response();
    if let Some(token) = token {
        set_trigger(&mut res, token);
    }
    res
}

fn set_trigger(res: &mut Response, token: &'static str) {
    res.headers_mut()
        .insert(signal::TRIGGER_HEADER, HeaderValue::from_static(token));
}
