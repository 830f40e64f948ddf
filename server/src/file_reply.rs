use axum::{
    body::Body,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};

use crate::storage::ArchiveStream;

/// A zip archive sent as a download attachment.
///
/// The archive is produced while it is sent, so no length is announced.
pub struct ArchiveReply {
    body: Body,
    file_name: String,
}

impl ArchiveReply {
    #[must_use]
    pub fn new(stream: ArchiveStream, file_name: &str) -> Self {
        Self {
            body: Body::from_stream(stream),
            file_name: file_name.to_owned(),
        }
    }

    fn content_disposition(&self) -> String {
        let name: String = self
            .file_name
            .chars()
            .filter(|c| !c.is_control() && *c != '"')
            .collect();
        format!("attachment;filename={name}")
    }
}

impl IntoResponse for ArchiveReply {
    fn into_response(self) -> Response {
        let disposition = self.content_disposition();
        let mut res = self.body.into_response();
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/zip"),
        );
        if let Ok(val) = HeaderValue::from_str(disposition.as_str()) {
            res.headers_mut().insert(header::CONTENT_DISPOSITION, val);
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use futures::StreamExt;
    use rstest::rstest;

    fn chunks(parts: &[&'static [u8]]) -> ArchiveStream {
        let items: Vec<std::io::Result<Bytes>> = parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p)))
            .collect();
        futures::stream::iter(items).boxed()
    }

    #[rstest]
    #[case("images.zip", "attachment;filename=images.zip")]
    #[case("we\"ird.zip", "attachment;filename=weird.zip")]
    #[case("line\nbreak.zip", "attachment;filename=linebreak.zip")]
    #[trace]
    fn content_disposition(#[case] name: &str, #[case] expected: &str) {
        // Arrange
        let reply = ArchiveReply::new(chunks(&[]), name);

        // Act
        let actual = reply.content_disposition();

        // Assert
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn headers_and_streamed_body() {
        // Arrange
        let reply = ArchiveReply::new(chunks(&[b"PK", b"\x03\x04"]), "images.zip");

        // Act
        let res = reply.into_response();

        // Assert
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/zip");
        assert_eq!(
            res.headers()[header::CONTENT_DISPOSITION],
            "attachment;filename=images.zip"
        );
        assert!(res.headers().get(header::CONTENT_LENGTH).is_none());
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"PK\x03\x04");
    }
}
