//! Request and response DTOs for `POST /api/ingest`.
//!
//! - `IngestForm`: raw form fields, all optional so any request can be answered
//! - `IngestRequest`: validated form (trimmed input, slider range, pattern type)
//! - `IngestSuccessResponse` / `IngestErrorResponse`: the two response shapes
//! - `IngestResponse`: untagged union of the two

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::MAX_SLIDER_POSITION;
use crate::error::{AppError, Result};

/// Whether user patterns select files to keep or files to drop.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Include,
    #[default]
    Exclude,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Include => "include",
            PatternType::Exclude => "exclude",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "include" => Ok(PatternType::Include),
            "exclude" => Ok(PatternType::Exclude),
            _ => Err(AppError::Validation(
                "pattern_type must be 'include' or 'exclude'".to_string(),
            )),
        }
    }
}

/// Form body exactly as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestForm {
    pub input_text: Option<String>,
    pub max_file_size: Option<String>,
    pub pattern_type: Option<String>,
    pub pattern: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    pub input_text: String,
    /// Slider position in `[0, 500]`.
    pub max_file_size: u16,
    pub pattern_type: PatternType,
    pub pattern: String,
    pub token: Option<String>,
}

impl IngestForm {
    pub fn validate(&self) -> Result<IngestRequest> {
        let input_text = self.input_text.as_deref().unwrap_or("").trim();
        if input_text.is_empty() {
            return Err(AppError::Validation("input_text cannot be empty".to_string()));
        }

        let raw_size = self
            .max_file_size
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Validation("max_file_size is required".to_string()))?;
        let size: i64 = raw_size
            .parse()
            .map_err(|_| AppError::Validation("max_file_size must be an integer".to_string()))?;
        if size < 0 {
            return Err(AppError::Validation(
                "max_file_size: input should be greater than or equal to 0".to_string(),
            ));
        }
        if size > i64::from(MAX_SLIDER_POSITION) {
            return Err(AppError::Validation(format!(
                "max_file_size: input should be less than or equal to {}",
                MAX_SLIDER_POSITION
            )));
        }

        let pattern_type = match self.pattern_type.as_deref().map(str::trim) {
            None | Some("") => PatternType::default(),
            Some(raw) => raw.parse()?,
        };

        Ok(IngestRequest {
            input_text: input_text.to_string(),
            max_file_size: size as u16,
            pattern_type,
            pattern: self.pattern.as_deref().unwrap_or("").trim().to_string(),
            token: self.token_or_none(),
        })
    }

    /// Slider position to echo back, even when the raw value is unusable.
    pub fn echoed_file_size(&self) -> i64 {
        self.max_file_size
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(i64::from(crate::config::DEFAULT_SLIDER_POSITION))
    }

    pub fn token_or_none(&self) -> Option<String> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestSuccessResponse {
    /// Always `true`.
    pub result: bool,
    pub repo_url: String,
    /// `user/repo`
    pub short_repo_url: String,
    pub summary: String,
    pub tree: String,
    pub content: String,
    pub default_file_size: i64,
    pub pattern_type: String,
    pub pattern: String,
    pub token: Option<String>,
    pub ingest_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestErrorResponse {
    pub error: String,
    pub repo_url: String,
    pub default_file_size: i64,
    pub pattern_type: String,
    pub pattern: String,
    pub token: Option<String>,
}

impl IngestErrorResponse {
    /// Error body echoing whatever the client sent.
    pub fn from_form(error: String, form: &IngestForm) -> Self {
        Self {
            error,
            repo_url: form.input_text.clone().unwrap_or_default(),
            default_file_size: form.echoed_file_size(),
            pattern_type: form
                .pattern_type
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| PatternType::default().to_string()),
            pattern: form.pattern.clone().unwrap_or_default(),
            token: form.token_or_none(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum IngestResponse {
    Success(IngestSuccessResponse),
    Error(IngestErrorResponse),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(input: &str, size: &str) -> IngestForm {
        IngestForm {
            input_text: Some(input.to_string()),
            max_file_size: Some(size.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_request_is_trimmed_and_defaulted() {
        let mut f = form("  https://github.com/cyclotruc/gitingest  ", "243");
        f.pattern = Some(" *.md ".to_string());
        f.token = Some("".to_string());

        let req = f.validate().unwrap();
        assert_eq!(req.input_text, "https://github.com/cyclotruc/gitingest");
        assert_eq!(req.max_file_size, 243);
        assert_eq!(req.pattern_type, PatternType::Exclude);
        assert_eq!(req.pattern, "*.md");
        assert_eq!(req.token, None);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = form("   ", "243").validate().unwrap_err();
        assert_eq!(err.to_string(), "Validation error: input_text cannot be empty");
    }

    #[test]
    fn test_slider_range_is_enforced() {
        let err = form("cyclotruc/gitingest", "600").validate().unwrap_err();
        assert!(err.to_string().contains("less than or equal to 500"));

        let err = form("cyclotruc/gitingest", "-1").validate().unwrap_err();
        assert!(err.to_string().contains("greater than or equal to 0"));

        let err = form("cyclotruc/gitingest", "big").validate().unwrap_err();
        assert!(err.to_string().contains("must be an integer"));

        assert_eq!(form("cyclotruc/gitingest", "0").validate().unwrap().max_file_size, 0);
        assert_eq!(form("cyclotruc/gitingest", "500").validate().unwrap().max_file_size, 500);
    }

    #[test]
    fn test_pattern_type_must_be_known() {
        let mut f = form("cyclotruc/gitingest", "243");
        f.pattern_type = Some("both".to_string());
        assert!(matches!(f.validate(), Err(AppError::Validation(_))));

        f.pattern_type = Some("include".to_string());
        assert_eq!(f.validate().unwrap().pattern_type, PatternType::Include);
    }

    #[test]
    fn test_pattern_type_wire_format() {
        assert_eq!(PatternType::Include.as_str(), "include");
        assert_eq!(
            serde_json::to_string(&PatternType::Exclude).unwrap(),
            "\"exclude\""
        );
    }

    #[test]
    fn test_responses_serialize_as_distinct_shapes() {
        let success = IngestResponse::Success(IngestSuccessResponse {
            result: true,
            repo_url: "https://github.com/cyclotruc/gitingest".to_string(),
            short_repo_url: "cyclotruc/gitingest".to_string(),
            summary: "Files analyzed: 1".to_string(),
            tree: "Directory structure:\n└── README.md".to_string(),
            content: "hello".to_string(),
            default_file_size: 243,
            pattern_type: "exclude".to_string(),
            pattern: "".to_string(),
            token: None,
            ingest_id: "abc123".to_string(),
        });
        let body = serde_json::to_string(&success).unwrap();
        assert!(body.contains("\"result\":true"));
        assert!(!body.contains("\"error\""));

        let error = IngestErrorResponse::from_form(
            "Error: Invalid repository URL 'cyclotruc/'".to_string(),
            &form("cyclotruc/", "243"),
        );
        let body = serde_json::to_string(&IngestResponse::Error(error)).unwrap();
        assert!(body.contains("\"repo_url\":\"cyclotruc/\""));
        assert!(body.contains("\"pattern_type\":\"exclude\""));
        assert!(!body.contains("\"result\""));
    }
}
