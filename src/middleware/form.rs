//! Catalog and promotion write bodies.
//!
//! Writes arrive either as `multipart/form-data` (optionally carrying an image
//! file) or as a JSON object. Both are flattened into text fields so numeric
//! values are parsed the same way regardless of the transport.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    services::media::{ImageHost, ImageUpload, ingest},
    state::AppState,
};

#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, ImageUpload>,
}

impl FormData {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            files: HashMap::new(),
        }
    }

    pub fn from_json(value: Value) -> AppResult<Self> {
        let Value::Object(map) = value else {
            return Err(AppError::bad_request("Request body must be a JSON object"));
        };
        let fields = map
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::Null => return None,
                    Value::String(s) => s,
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    other => other.to_string(),
                };
                Some((key, text))
            })
            .collect();
        Ok(Self {
            fields,
            files: HashMap::new(),
        })
    }

    async fn from_multipart(mut multipart: Multipart, max_bytes: usize) -> AppResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if field.file_name().is_none() {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::bad_request(e.body_text()))?;
                form.fields.insert(name, text);
                continue;
            }

            let file_name = field.file_name().map(str::to_string);
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::bad_request(e.body_text()))?;

            if !content_type.starts_with("image/") {
                tracing::debug!(field = %name, %content_type, "ignoring non-image upload");
                continue;
            }
            if bytes.is_empty() {
                continue;
            }
            if bytes.len() > max_bytes {
                return Err(AppError::bad_request(format!(
                    "{name} exceeds the upload limit of {max_bytes} bytes"
                )));
            }
            form.files.insert(
                name,
                ImageUpload {
                    file_name,
                    content_type,
                    bytes,
                },
            );
        }
        Ok(form)
    }

    /// Trimmed field value; blank values count as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn string(&self, name: &str) -> Option<String> {
        self.text(name).map(str::to_string)
    }

    pub fn required(&self, name: &str) -> AppResult<String> {
        self.string(name)
            .ok_or_else(|| AppError::bad_request(format!("{name} is required")))
    }

    pub fn float(&self, name: &str) -> AppResult<Option<f64>> {
        let Some(raw) = self.text(name) else {
            return Ok(None);
        };
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(AppError::bad_request(format!("{name} must be a number"))),
        }
    }

    pub fn int(&self, name: &str) -> AppResult<Option<i32>> {
        let Some(raw) = self.text(name) else {
            return Ok(None);
        };
        raw.parse::<i32>()
            .map(Some)
            .map_err(|_| AppError::bad_request(format!("{name} must be an integer")))
    }

    pub fn boolean(&self, name: &str) -> AppResult<Option<bool>> {
        match self.text(name) {
            None => Ok(None),
            Some("true") | Some("1") | Some("on") => Ok(Some(true)),
            Some("false") | Some("0") | Some("off") => Ok(Some(false)),
            Some(_) => Err(AppError::bad_request(format!("{name} must be true or false"))),
        }
    }

    pub fn uuid(&self, name: &str) -> AppResult<Option<Uuid>> {
        let Some(raw) = self.text(name) else {
            return Ok(None);
        };
        Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| AppError::bad_request(format!("{name} must be a valid id")))
    }

    pub fn take_file(&mut self, name: &str) -> Option<ImageUpload> {
        self.files.remove(name)
    }

    /// Image for `field`: an uploaded file is sent to the image host, otherwise
    /// a text value is taken as the URL of an already hosted image.
    pub async fn image(&mut self, host: &dyn ImageHost, folder: &str, field: &str) -> Option<String> {
        let upload = self.take_file(field);
        match ingest(host, folder, upload).await {
            Some(url) => Some(url),
            None => self.string(field),
        }
    }
}

impl FromRequest<AppState> for FormData {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::bad_request(e.body_text()))?;
            Self::from_multipart(multipart, state.config.upload_max_bytes).await
        } else {
            let Json(value) = Json::<Value>::from_request(req, state).await?;
            Self::from_json(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_scalars_become_text() {
        let form = FormData::from_json(json!({
            "name": "  Honey  ",
            "price": 12.5,
            "stock": 3,
            "isActive": false,
            "description": null,
        }))
        .unwrap();

        assert_eq!(form.text("name"), Some("Honey"));
        assert_eq!(form.float("price").unwrap(), Some(12.5));
        assert_eq!(form.int("stock").unwrap(), Some(3));
        assert_eq!(form.boolean("isActive").unwrap(), Some(false));
        assert_eq!(form.text("description"), None);
    }

    #[test]
    fn rejects_non_object_bodies() {
        assert!(FormData::from_json(json!(["a", "b"])).is_err());
    }

    #[test]
    fn numeric_parse_failures_are_bad_requests() {
        let form = FormData::from_pairs([("price", "abc"), ("stock", "1.5"), ("inf", "inf")]);
        assert!(matches!(form.float("price"), Err(AppError::BadRequest(_))));
        assert!(matches!(form.int("stock"), Err(AppError::BadRequest(_))));
        assert!(matches!(form.float("inf"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn blank_fields_are_absent() {
        let form = FormData::from_pairs([("name", "   ")]);
        assert_eq!(form.text("name"), None);
        assert!(matches!(form.required("name"), Err(AppError::BadRequest(_))));
    }
}
