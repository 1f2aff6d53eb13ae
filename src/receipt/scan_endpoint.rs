//! The endpoint for extracting line items from an uploaded receipt image.

use axum::{
    Json,
    extract::{FromRef, Multipart, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    AppState, Error,
    api::error_response,
    receipt::{
        VisionClient,
        normalize::{normalize_receipt, parse_extraction},
    },
};

/// The state needed for scanning a receipt image.
#[derive(Debug, Clone)]
pub struct ScanState {
    /// The client for the external vision model, if one is configured.
    pub vision_client: Option<VisionClient>,
}

impl FromRef<AppState> for ScanState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            vision_client: state.vision_client.clone(),
        }
    }
}

/// Route handler for extracting a receipt from an uploaded image.
///
/// The image is sent to the vision model, the reply is sanitized, parsed,
/// and normalized, and the result is returned for the user to review before
/// saving. Nothing is persisted by this endpoint.
pub async fn scan_receipt_endpoint(
    State(state): State<ScanState>,
    mut multipart: Multipart,
) -> Response {
    let Some(vision_client) = state.vision_client else {
        return Error::MissingApiKey.into_response();
    };

    let (image_data, mime_type) = match read_image_field(&mut multipart).await {
        Ok(image) => image,
        Err(error) => return error.into_response(),
    };

    let raw_text = match vision_client
        .extract_receipt_text(&image_data, &mime_type)
        .await
    {
        Ok(raw_text) => raw_text,
        Err(error) => {
            tracing::error!("Receipt extraction request failed: {error}");
            return error.into_response();
        }
    };

    let payload = match parse_extraction(&raw_text) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!("Model output was not JSON: {raw_text:?}");
            return error.into_response();
        }
    };

    match normalize_receipt(&payload) {
        Ok(extracted) => {
            Json(serde_json::json!({ "success": true, "extracted": extracted })).into_response()
        }
        Err(Error::NoValidLineItems) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "No valid line items were extracted from the receipt.",
        ),
        Err(error) => error.into_response(),
    }
}

/// Pull the uploaded image out of the multipart form.
///
/// The media type declared by the client is passed through to the vision
/// model, falling back to JPEG when the field carries none.
///
/// # Errors
///
/// Returns an [Error::MissingFile] if there is no `file` field, or an
/// [Error::MultipartError] if the form cannot be parsed.
async fn read_image_field(multipart: &mut Multipart) -> Result<(Vec<u8>, String), Error> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        return read_field_bytes(field).await;
    }

    Err(Error::MissingFile)
}

async fn read_field_bytes(field: Field<'_>) -> Result<(Vec<u8>, String), Error> {
    let mime_type = field.content_type().unwrap_or("image/jpeg").to_owned();

    let data = field
        .bytes()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?;

    Ok((data.to_vec(), mime_type))
}
