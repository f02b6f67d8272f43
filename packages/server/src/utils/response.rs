use axum::body::Body;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use tokio_util::io::ReaderStream;

use crate::error::AppError;
use crate::files::{Files, StoredFile};

/// How a browser should present a served file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
        }
    }
}

/// Characters left as-is by RFC 5987 `attr-char`.
fn is_attr_char(b: u8) -> bool {
    matches!(
        b,
        b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
    )
}

fn percent_encode(value: &str, keep: impl Fn(u8) -> bool) -> String {
    value
        .bytes()
        .map(|b| {
            if keep(b) {
                String::from(b as char)
            } else {
                format!("%{b:02X}")
            }
        })
        .collect()
}

/// Percent-encode a single URL path segment.
pub fn encode_path_segment(segment: &str) -> String {
    percent_encode(segment, |b| {
        b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
    })
}

/// Build a safe `Content-Disposition` header value.
pub fn content_disposition_value(disposition: Disposition, filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = match ascii_safe.trim() {
        "" => "download",
        name => name,
    };

    format!(
        "{}; filename=\"{ascii_name}\"; filename*=UTF-8''{}",
        disposition.as_str(),
        percent_encode(filename, is_attr_char)
    )
}

/// Stream a stored file back to the client.
///
/// `download_name` overrides the record's display name in the headers.
/// `extra_headers` are added last and replace any default of the same name.
pub async fn file_response(
    record: &dyn StoredFile,
    files: &Files,
    disposition: Disposition,
    download_name: Option<&str>,
    extra_headers: &HeaderMap,
) -> Result<Response, AppError> {
    let size = record.size(files).await?;
    let content_type = record
        .mime_type(files)
        .await?
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let filename = download_name.or(record.name()).unwrap_or("download");

    let reader = record.read_stream(files).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(disposition, filename),
        )
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    let headers = response.headers_mut();
    for name in extra_headers.keys() {
        headers.remove(name);
    }
    for (name, value) in extra_headers {
        headers.append(name.clone(), value.clone());
    }

    Ok(response)
}
