//! `multipart/form-data` ingestion.
//!
//! Text fields join the parsed body (repeated names become arrays); file
//! parts are buffered into [`UploadedFile`]s.

use axum::{
    body::{Body, Bytes},
    extract::{multipart::MultipartError, FromRequest, Multipart, Request},
    http::{request::Parts, StatusCode},
};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::http::context::UploadedFile;
use crate::ingest::form;

/// Parse an already size-checked multipart payload.
pub async fn parse_multipart(
    parts: &Parts,
    payload: Bytes,
    limit: usize,
) -> Result<(Map<String, Value>, Vec<UploadedFile>), ApiError> {
    let mut request = Request::new(Body::from(payload));
    *request.headers_mut() = parts.headers.clone();
    // Carries the body limit extension, which the extractor honours.
    *request.extensions_mut() = parts.extensions.clone();

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let mut fields = Map::new();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| field_error(e, limit))? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        if file_name.is_some() {
            let data = field.bytes().await.map_err(|e| field_error(e, limit))?;
            files.push(UploadedFile {
                field: name,
                file_name,
                content_type,
                data,
            });
        } else {
            let text = field.text().await.map_err(|e| field_error(e, limit))?;
            form::insert_value(&mut fields, name, Value::String(text), false);
        }
    }

    Ok((fields, files))
}

fn field_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;
    use serde_json::json;

    const BOUNDARY: &str = "XBOUNDARYX";

    fn payload() -> Bytes {
        let body = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"memo\"\r\n\r\n\
             first <b>\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"memo\"\r\n\r\n\
             second\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"receipt\"; filename=\"r.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             paid in full\r\n\
             --{b}--\r\n",
            b = BOUNDARY
        );
        Bytes::from(body)
    }

    fn parts() -> Parts {
        let (parts, _) = HttpRequest::builder()
            .method("POST")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[tokio::test]
    async fn test_fields_and_files() {
        let (fields, files) = parse_multipart(&parts(), payload(), 1024).await.unwrap();

        assert_eq!(fields["memo"], json!(["first <b>", "second"]));
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].field, "receipt");
        assert_eq!(files[0].file_name.as_deref(), Some("r.txt"));
        assert_eq!(files[0].content_type.as_deref(), Some("text/plain"));
        assert_eq!(&files[0].data[..], b"paid in full");
    }

    #[tokio::test]
    async fn test_missing_boundary_is_bad_request() {
        let (parts, _) = HttpRequest::builder()
            .method("POST")
            .header("content-type", "multipart/form-data")
            .body(())
            .unwrap()
            .into_parts();

        let err = parse_multipart(&parts, payload(), 1024).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
