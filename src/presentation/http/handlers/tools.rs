//! Field Tool Handlers
//!
//! Stateless helpers: confined-space volume, work-journal analysis and
//! text sanitizing.

use axum::Json;
use serde::Serialize;
use serde_json::Value;
use validator::Validate;

use crate::application::dto::request::JournalRequest;
use crate::application::dto::response::SanitizeResponse;
use crate::domain::services::journal_processor::{self, JournalAnalysis};
use crate::domain::services::volume_calculator::{SpaceGeometry, Volume};
use crate::shared::error::AppError;
use crate::shared::sanitize::{sanitize_text, sanitize_value};
use crate::shared::validation::validate_request;

/// Volume of a confined space
#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    pub shape: &'static str,
    #[serde(flatten)]
    pub volume: Volume,
}

/// Compute a confined-space volume (public)
pub async fn volume(Json(geometry): Json<SpaceGeometry>) -> Result<Json<VolumeResponse>, AppError> {
    let volume = geometry
        .volume()
        .map_err(|e| AppError::validation(e.to_string()))?;

    Ok(Json(VolumeResponse {
        shape: geometry.shape_name(),
        volume,
    }))
}

/// Classify a work-journal text
pub async fn journal(Json(body): Json<JournalRequest>) -> Result<Json<JournalAnalysis>, AppError> {
    validate_request(&body)?;

    let text = sanitize_text(&body.text);
    if text.is_empty() {
        return Err(AppError::validation("Text is empty after sanitizing"));
    }
    Ok(Json(journal_processor::process(&text)))
}

/// Sanitize every string of an arbitrary JSON document
pub async fn sanitize(Json(body): Json<Value>) -> Json<SanitizeResponse> {
    Json(SanitizeResponse {
        sanitized: sanitize_value(body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_volume_rectangular() {
        let Json(response) = volume(Json(SpaceGeometry::Rectangular {
            length: 2.0,
            width: 3.0,
            height: 1.5,
        }))
        .await
        .unwrap();
        assert_eq!(response.shape, "rectangular");
        assert_eq!(response.volume.cubic_meters, 9.0);
        assert_eq!(response.volume.liters, 9000.0);
    }

    #[tokio::test]
    async fn test_volume_rejects_zero_dimension() {
        let result = volume(Json(SpaceGeometry::Spherical { diameter: 0.0 })).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_journal_strips_markup_before_classifying() {
        let Json(analysis) = journal(Json(JournalRequest {
            text: "<b>Danger</b>: ligne électrique exposée. Travaillé 7.5h.".into(),
        }))
        .await
        .unwrap();
        assert!(analysis.safety_flag);
    }

    #[tokio::test]
    async fn test_journal_markup_only_rejected() {
        let request = JournalRequest {
            text: "<script>alert(1)</script>".into(),
        };
        assert!(request.validate().is_ok());
        assert!(journal(Json(request)).await.is_err());
    }

    #[tokio::test]
    async fn test_sanitize_nested_document() {
        let Json(response) = sanitize(Json(json!({
            "notes": ["<script>x()</script>ok", {"link": "<a href=\"javascript:go()\">x</a>"}]
        })))
        .await;
        assert_eq!(response.sanitized["notes"][0], "ok");
        assert!(!response.sanitized.to_string().contains("javascript:"));
    }
}
