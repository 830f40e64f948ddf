#![warn(clippy::unwrap_in_result)]
#![warn(clippy::unwrap_used)]

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Multipart field name that carries uploaded files.
pub const FILES_FIELD: &str = "files";

/// Form field name that carries the admin secret.
pub const SECRET_FIELD: &str = "secret-key";

/// File name offered to clients for the zipped storage directory.
pub const ARCHIVE_NAME: &str = "images.zip";

/// URL prefix under which stored images are served as-is.
pub const IMAGE_PREFIX: &str = "/imageGetter";

/// Signal tokens sent to the browser in response headers.
///
/// The page scripts react to these instead of parsing response bodies.
pub mod signal {
    /// Header naming the event the client should trigger.
    pub const TRIGGER_HEADER: &str = "HX-Trigger";
    /// Header asking the client to navigate elsewhere.
    pub const REDIRECT_HEADER: &str = "HX-Redirect";

    pub const FAILED_OPEN: &str = "failed_open";
    pub const FAILED_READ: &str = "failed_read";
    pub const FAILED_CREATE: &str = "failed_create";
    pub const FAILED_COPY: &str = "failed_copy";
    pub const WRONG_KEY: &str = "wrong-key";
    pub const ERROR: &str = "error";
}

/// Represents an image currently kept in the storage directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImageEntry {
    /// Stored file name, including the `(id)` suffix
    pub name: String,
    /// Size of the file in bytes
    pub size: u64,
    /// Relative URL the image can be fetched from, name percent-encoded
    pub url: String,
}

impl ImageEntry {
    #[must_use]
    pub fn new(name: String, size: u64) -> Self {
        let url = format!("{IMAGE_PREFIX}/{}", url_escape::encode_component(&name));
        Self { name, size, url }
    }
}
