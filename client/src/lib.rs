use std::io;
use std::path::{Path, PathBuf};

use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets::UTF8_HORIZONTAL_ONLY};
use endpoint::Endpoint;
use kernel::{ImageEntry, SECRET_FIELD, signal};
use reqwest::{Client, StatusCode, redirect};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

pub mod endpoint;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server URI: {0}")]
    InvalidUri(String),
    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// What the server answered, reduced to what the CLI shows.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    /// `HX-Trigger` token, if the server sent one
    pub signal: Option<String>,
    /// `HX-Redirect` or `Location` target
    pub redirect: Option<String>,
    pub body: String,
}

impl Reply {
    async fn read(response: reqwest::Response) -> Result<Self, ClientError> {
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned)
        };
        let signal = header(signal::TRIGGER_HEADER);
        let redirect =
            header(signal::REDIRECT_HEADER).or_else(|| header(reqwest::header::LOCATION.as_str()));
        let status = response.status();
        let body = response.text().await?;
        Ok(Self {
            status,
            signal,
            redirect,
            body,
        })
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success() || self.status.is_redirection()
    }
}

fn endpoint(uri: &str) -> Result<Endpoint, ClientError> {
    Endpoint::new(uri).ok_or_else(|| ClientError::InvalidUri(uri.to_owned()))
}

fn without_redirects() -> Result<Client, ClientError> {
    Ok(Client::builder().redirect(redirect::Policy::none()).build()?)
}

/// Uploads files as one batch, in the given order.
pub async fn upload_files<P: AsRef<Path>>(uri: &str, files: &[P]) -> Result<Reply, ClientError> {
    let endpoint = endpoint(uri)?;

    let mut form = reqwest::multipart::Form::new();
    for file in files {
        let path = file.as_ref();
        let file_error = |source| ClientError::File {
            path: path.to_path_buf(),
            source,
        };
        let f = File::open(path).await.map_err(file_error)?;
        let meta = f.metadata().await.map_err(file_error)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stream = reqwest::Body::wrap_stream(ReaderStream::new(f));
        let part = reqwest::multipart::Part::stream_with_length(stream, meta.len()).file_name(name);
        form = form.part(kernel::FILES_FIELD, part);
    }

    let response = Client::new()
        .post(endpoint.route("upload"))
        .multipart(form)
        .send()
        .await?;
    Reply::read(response).await
}

pub async fn list_images(uri: &str) -> Result<Vec<ImageEntry>, ClientError> {
    let endpoint = endpoint(uri)?;
    let images = Client::new()
        .get(endpoint.route("images"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(images)
}

#[must_use]
pub fn images_table(uri: &str, images: &[ImageEntry]) -> Table {
    let endpoint = Endpoint::new(uri);
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120)
        .set_header(vec![
            Cell::new("Image").add_attribute(Attribute::Bold),
            Cell::new("Size").add_attribute(Attribute::Bold),
            Cell::new("URL").add_attribute(Attribute::Bold),
        ]);

    for image in images {
        let url = match &endpoint {
            Some(e) => e.image(&image.name).to_string(),
            None => image.url.clone(),
        };
        table.add_row(vec![
            Cell::new(&image.name),
            Cell::new(image.size),
            Cell::new(url),
        ]);
    }
    table
}

/// Saves the zipped storage directory to `output`, returns bytes written.
pub async fn download_archive(uri: &str, output: &Path) -> Result<u64, ClientError> {
    let endpoint = endpoint(uri)?;
    let mut response = Client::new()
        .get(endpoint.route("download"))
        .send()
        .await?
        .error_for_status()?;

    let file_error = |source| ClientError::File {
        path: output.to_path_buf(),
        source,
    };
    let mut file = File::create(output).await.map_err(file_error)?;
    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await.map_err(file_error)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(file_error)?;
    Ok(written)
}

pub async fn delete_all(uri: &str) -> Result<Reply, ClientError> {
    let endpoint = endpoint(uri)?;
    let response = without_redirects()?
        .post(endpoint.route("delete"))
        .send()
        .await?;
    Reply::read(response).await
}

pub async fn check_admin(uri: &str, secret: &str) -> Result<Reply, ClientError> {
    let endpoint = endpoint(uri)?;
    let response = without_redirects()?
        .post(endpoint.route("admin"))
        .form(&[(SECRET_FIELD, secret)])
        .send()
        .await?;
    Reply::read(response).await
}
