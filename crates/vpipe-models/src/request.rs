//! Job creation requests and canonical processing parameters.
//!
//! Clients send either camelCase or snake_case field names. Both spellings
//! are accepted by [`CreateJobRequest`] and collapse into [`JobParameters`],
//! which is the only form the orchestration layer ever sees.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upscale factor used when a request does not specify one.
pub const DEFAULT_UPSCALE_FACTOR: f64 = 2.0;

/// Where the source video comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputMethod {
    /// Download from a YouTube URL
    Youtube,
    /// Local file path, absolute or relative to the workspace
    #[default]
    Manual,
}

impl InputMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMethod::Youtube => "youtube",
            InputMethod::Manual => "manual",
        }
    }
}

impl std::fmt::Display for InputMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pipeline stage toggles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessingFlags {
    /// Run the UNet restoration stage
    #[serde(rename = "unet_flag")]
    pub unet: bool,
    /// Run face restoration
    #[serde(rename = "face_restore_flag")]
    pub face_restore: bool,
    /// Run the upscaler
    #[serde(rename = "upscale_flag")]
    pub upscale: bool,
    /// Upscale factor (>= 1.0)
    #[serde(rename = "upscale_value")]
    pub upscale_factor: f64,
    /// Apply CLAHE contrast enhancement
    #[serde(rename = "clahe_flag")]
    pub clahe: bool,
}

impl Default for ProcessingFlags {
    fn default() -> Self {
        Self {
            unet: false,
            face_restore: false,
            upscale: false,
            upscale_factor: DEFAULT_UPSCALE_FACTOR,
            clahe: false,
        }
    }
}

/// Canonical, validated job parameters. Immutable once a job exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobParameters {
    /// Input method
    pub input_method: InputMethod,
    /// YouTube URL or manual path, depending on `input_method`
    pub source: String,
    /// Processing flags
    #[serde(flatten)]
    pub flags: ProcessingFlags,
}

impl JobParameters {
    /// Build parameters for a local file.
    pub fn manual(path: impl Into<String>) -> Self {
        Self {
            input_method: InputMethod::Manual,
            source: path.into(),
            flags: ProcessingFlags::default(),
        }
    }

    /// Build parameters for a YouTube source.
    pub fn youtube(url: impl Into<String>) -> Self {
        Self {
            input_method: InputMethod::Youtube,
            source: url.into(),
            flags: ProcessingFlags::default(),
        }
    }

    /// Replace the processing flags.
    pub fn with_flags(mut self, flags: ProcessingFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source.trim().is_empty() {
            return Err(match self.input_method {
                InputMethod::Youtube => ValidationError::MissingYoutubeUrl,
                InputMethod::Manual => ValidationError::MissingManualPath,
            });
        }

        let factor = self.flags.upscale_factor;
        if !factor.is_finite() || factor < 1.0 {
            return Err(ValidationError::InvalidUpscaleFactor(factor));
        }

        Ok(())
    }
}

/// Reasons a job request is rejected before a job is created.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("YouTube URL is required for youtube input method")]
    MissingYoutubeUrl,

    #[error("Manual path is required for manual input method")]
    MissingManualPath,

    #[error("Upscale factor must be a number >= 1.0, got {0}")]
    InvalidUpscaleFactor(f64),
}

/// Wire format of a job creation request.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CreateJobRequest {
    #[serde(default, alias = "inputMethod")]
    pub input_method: Option<InputMethod>,

    #[serde(default, alias = "youtubeUrl")]
    pub youtube_url: Option<String>,

    #[serde(default, alias = "manualPath")]
    pub manual_path: Option<String>,

    #[serde(default, alias = "unetFlag")]
    pub unet_flag: Option<bool>,

    #[serde(default, alias = "faceRestoreFlag")]
    pub face_restore_flag: Option<bool>,

    #[serde(default, alias = "upscaleFlag")]
    pub upscale_flag: Option<bool>,

    #[serde(default, alias = "upscaleValue")]
    pub upscale_value: Option<f64>,

    #[serde(default, alias = "claheFlag")]
    pub clahe_flag: Option<bool>,
}

impl CreateJobRequest {
    /// Collapse the request into validated canonical parameters.
    pub fn into_parameters(self) -> Result<JobParameters, ValidationError> {
        let input_method = self.input_method.unwrap_or_default();
        let source = match input_method {
            InputMethod::Youtube => self.youtube_url,
            InputMethod::Manual => self.manual_path,
        }
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

        let params = JobParameters {
            input_method,
            source,
            flags: ProcessingFlags {
                unet: self.unet_flag.unwrap_or(false),
                face_restore: self.face_restore_flag.unwrap_or(false),
                upscale: self.upscale_flag.unwrap_or(false),
                upscale_factor: self.upscale_value.unwrap_or(DEFAULT_UPSCALE_FACTOR),
                clahe: self.clahe_flag.unwrap_or(false),
            },
        };

        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_request() {
        let req: CreateJobRequest = serde_json::from_str(
            r#"{
                "inputMethod": "youtube",
                "youtubeUrl": "https://youtu.be/abc",
                "unetFlag": true,
                "faceRestoreFlag": false,
                "upscaleFlag": true,
                "upscaleValue": 4,
                "claheFlag": true
            }"#,
        )
        .unwrap();

        let params = req.into_parameters().unwrap();
        assert_eq!(params.input_method, InputMethod::Youtube);
        assert_eq!(params.source, "https://youtu.be/abc");
        assert!(params.flags.unet);
        assert!(!params.flags.face_restore);
        assert!(params.flags.upscale);
        assert_eq!(params.flags.upscale_factor, 4.0);
        assert!(params.flags.clahe);
    }

    #[test]
    fn test_snake_case_request_with_defaults() {
        let req: CreateJobRequest = serde_json::from_str(
            r#"{"input_method": "manual", "manual_path": "input_videos/a.mp4"}"#,
        )
        .unwrap();

        let params = req.into_parameters().unwrap();
        assert_eq!(params.input_method, InputMethod::Manual);
        assert_eq!(params.source, "input_videos/a.mp4");
        assert_eq!(params.flags, ProcessingFlags::default());
    }

    #[test]
    fn test_missing_input_method_defaults_to_manual() {
        let req: CreateJobRequest =
            serde_json::from_str(r#"{"manualPath": "/workspace/x.mp4"}"#).unwrap();
        assert_eq!(
            req.into_parameters().unwrap().input_method,
            InputMethod::Manual
        );
    }

    #[test]
    fn test_missing_locator_is_rejected() {
        let req: CreateJobRequest =
            serde_json::from_str(r#"{"inputMethod": "manual", "manualPath": "  "}"#).unwrap();
        assert_eq!(
            req.into_parameters().unwrap_err(),
            ValidationError::MissingManualPath
        );

        // A manual path does not satisfy the youtube method.
        let req: CreateJobRequest =
            serde_json::from_str(r#"{"inputMethod": "youtube", "manualPath": "a.mp4"}"#).unwrap();
        assert_eq!(
            req.into_parameters().unwrap_err(),
            ValidationError::MissingYoutubeUrl
        );
    }

    #[test]
    fn test_upscale_factor_below_one_is_rejected() {
        let params = JobParameters::manual("a.mp4").with_flags(ProcessingFlags {
            upscale_factor: 0.5,
            ..Default::default()
        });
        assert!(matches!(
            params.validate(),
            Err(ValidationError::InvalidUpscaleFactor(_))
        ));
    }

    #[test]
    fn test_parameters_serialize_flat() {
        let value = serde_json::to_value(JobParameters::youtube("https://youtu.be/x")).unwrap();
        assert_eq!(value["input_method"], "youtube");
        assert_eq!(value["source"], "https://youtu.be/x");
        assert_eq!(value["upscale_value"], 2.0);
        assert_eq!(value["clahe_flag"], false);
    }
}
