use std::fmt;
use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// How many leading bytes are inspected to classify content.
pub const SNIFF_LEN: usize = 512;

/// Media type recognized from file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Png,
    Jpeg,
    Heic,
    Webp,
    Svg,
    /// Recognized, but not an accepted image format
    Other(&'static str),
    /// Nothing matched
    Unknown,
}

impl MediaType {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        !matches!(self, MediaType::Other(_) | MediaType::Unknown)
    }

    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Heic => "image/heic",
            MediaType::Webp => "image/webp",
            MediaType::Svg => "image/svg+xml",
            MediaType::Other(mime) => mime,
            MediaType::Unknown => "application/octet-stream",
        }
    }

    fn from_mime(mime: &'static str) -> Self {
        match mime {
            "image/png" => MediaType::Png,
            "image/jpeg" | "image/jpg" => MediaType::Jpeg,
            "image/heic" | "image/heif" => MediaType::Heic,
            "image/webp" => MediaType::Webp,
            "image/svg+xml" => MediaType::Svg,
            other => MediaType::Other(other),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Classifies content by its leading bytes. Only the first [`SNIFF_LEN`]
/// bytes are looked at, shorter input is classified as is.
#[must_use]
pub fn sniff(head: &[u8]) -> MediaType {
    let head = &head[..head.len().min(SNIFF_LEN)];
    if looks_like_svg(head) {
        return MediaType::Svg;
    }
    infer::get(head).map_or(MediaType::Unknown, |kind| {
        MediaType::from_mime(kind.mime_type())
    })
}

/// Reads up to [`SNIFF_LEN`] bytes, stopping early only at end of stream.
pub async fn read_head<R>(reader: &mut R) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut head = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        let n = reader.read(&mut head[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    head.truncate(filled);
    Ok(head)
}

// SVG is text, so there are no magic bytes. Accept an `<svg` root element
// preceded only by a BOM, whitespace, an XML declaration, comments or a doctype.
fn looks_like_svg(head: &[u8]) -> bool {
    let mut rest = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
    loop {
        rest = trim_start(rest);
        if rest.starts_with(b"<?") {
            match find(rest, b"?>") {
                Some(end) => rest = &rest[end + 2..],
                None => return false,
            }
        } else if rest.starts_with(b"<!--") {
            match find(rest, b"-->") {
                Some(end) => rest = &rest[end + 3..],
                None => return false,
            }
        } else if rest.len() >= 9 && rest[..9].eq_ignore_ascii_case(b"<!doctype") {
            match find(rest, b">") {
                Some(end) => rest = &rest[end + 1..],
                None => return false,
            }
        } else {
            break;
        }
    }
    if rest.len() < 5 || !rest[..4].eq_ignore_ascii_case(b"<svg") {
        return false;
    }
    matches!(rest[4], b' ' | b'\t' | b'\r' | b'\n' | b'>' | b'/')
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|b| b.is_ascii_whitespace())
        .count();
    &bytes[skip..]
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
