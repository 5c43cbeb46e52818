//! Request payload assembly.
//!
//! The vendor expects three JSON blobs: a verification spec (what to verify),
//! an auth spec (how we authenticate), and a UI config (how its capture UI
//! looks). This module builds all three from a [`RequestTemplate`] and the
//! assets collected by the session.

use std::fmt;

use kyc_types::{vendor_language_code, CaptureKind, CapturedAsset, DocumentType, Theme};
use serde::{Deserialize, Serialize};

use crate::TransportError;

/// Vendor-side capture timeout forwarded in the UI config, in seconds.
const VENDOR_UI_TIMEOUT_SECS: u32 = 15;

/// How we authenticate towards the vendor.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "auth_type", rename_all = "snake_case")]
pub enum AuthSpec {
    /// Client id + secret key pair.
    BasicAuth {
        client_id: String,
        secret_key: String,
    },
    /// A pre-issued access token (journey token or exchanged token).
    AccessToken { access_token: String },
}

impl AuthSpec {
    pub fn basic(client_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self::BasicAuth {
            client_id: client_id.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn token(access_token: impl Into<String>) -> Self {
        Self::AccessToken {
            access_token: access_token.into(),
        }
    }

    /// Whether every credential field is non-empty.
    pub fn is_complete(&self) -> bool {
        match self {
            Self::BasicAuth {
                client_id,
                secret_key,
            } => !client_id.is_empty() && !secret_key.is_empty(),
            Self::AccessToken { access_token } => !access_token.is_empty(),
        }
    }
}

impl fmt::Debug for AuthSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BasicAuth { client_id, .. } => f
                .debug_struct("BasicAuth")
                .field("client_id", client_id)
                .field("secret_key", &"***")
                .finish(),
            Self::AccessToken { .. } => f
                .debug_struct("AccessToken")
                .field("access_token", &"***")
                .finish(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentName {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSpec {
    pub supported_types: Vec<DocumentType>,
    pub name: DocumentName,
    pub backside_proof_required: u8,
    /// Front-side image.
    pub proof: String,
    /// Back-side image, empty when not required.
    pub additional_proof: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceSpec {
    pub proof: String,
}

/// What the vendor should verify.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSpec {
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journey_id: Option<String>,
    pub country: String,
    pub language: String,
    pub email: String,
    pub callback_url: String,
    pub redirect_url: String,
    pub verification_mode: String,
    pub show_privacy_policy: u8,
    pub show_results: u8,
    pub show_consent: u8,
    pub show_feedback_form: u8,
    pub document: DocumentSpec,
    pub face: FaceSpec,
}

/// Vendor UI settings.
///
/// Everything optional in the vendor UI is switched off; each extra screen
/// or animation is another place for the capture flow to stall.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfig {
    pub dark_mode: bool,
    pub language: String,
    pub font_color: String,
    pub background_color: String,
    pub open_webview: bool,
    pub show_consent_screen: bool,
    pub show_privacy_policy: bool,
    pub show_results_screen: bool,
    pub disable_video_mode: bool,
    pub disable_document_instruction: bool,
    pub disable_face_instruction: bool,
    pub disable_helper_text: bool,
    pub disable_frame_corner_animation: bool,
    pub disable_blinking_detection: bool,
    pub play_capture_sound: bool,
    pub vibrate_on_capture: bool,
    pub disable_waiting_screen: bool,
    pub disable_async_verification: bool,
    pub verification_timeout: u32,
    pub auto_close: bool,
}

impl UiConfig {
    /// The minimal-surface UI configuration for a theme and host language tag.
    pub fn stable(theme: Theme, language_tag: &str) -> Self {
        Self {
            dark_mode: theme.is_dark(),
            language: vendor_language_code(language_tag).to_string(),
            font_color: theme.font_color().to_string(),
            background_color: theme.background_color().to_string(),
            open_webview: false,
            show_consent_screen: true,
            show_privacy_policy: true,
            show_results_screen: false,
            disable_video_mode: true,
            disable_document_instruction: true,
            disable_face_instruction: true,
            disable_helper_text: true,
            disable_frame_corner_animation: true,
            disable_blinking_detection: true,
            play_capture_sound: false,
            vibrate_on_capture: false,
            disable_waiting_screen: true,
            disable_async_verification: true,
            verification_timeout: VENDOR_UI_TIMEOUT_SECS,
            auto_close: false,
        }
    }
}

/// Per-host settings that do not change between sessions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestTemplate {
    pub auth: AuthSpec,
    /// Host-app language tag (e.g. `"ja"`), mapped to the vendor code on build.
    pub language: String,
    pub theme: Theme,
    pub email: Option<String>,
    pub country: String,
    pub callback_url: String,
    /// Journey id when the session runs against a pre-created vendor journey.
    pub journey_id: Option<String>,
}

impl RequestTemplate {
    pub fn new(auth: AuthSpec) -> Self {
        Self {
            auth,
            language: "en".to_string(),
            theme: Theme::default(),
            email: None,
            country: String::new(),
            callback_url: String::new(),
            journey_id: None,
        }
    }

    /// Build the submission for one session.
    pub fn build(
        &self,
        reference: &str,
        document_type: DocumentType,
        assets: &[CapturedAsset],
    ) -> Submission {
        let proof_of = |kind: CaptureKind| {
            assets
                .iter()
                .find(|a| a.kind == kind)
                .map(|a| a.location_ref.clone())
                .unwrap_or_default()
        };

        let verification = VerificationSpec {
            reference: reference.to_string(),
            journey_id: self.journey_id.clone(),
            country: self.country.clone(),
            language: vendor_language_code(&self.language).to_string(),
            email: self.email.clone().unwrap_or_default(),
            callback_url: self.callback_url.clone(),
            redirect_url: String::new(),
            verification_mode: "image_only".to_string(),
            show_privacy_policy: 1,
            show_results: 1,
            show_consent: 1,
            show_feedback_form: 0,
            document: DocumentSpec {
                supported_types: vec![document_type],
                name: DocumentName::default(),
                backside_proof_required: u8::from(document_type.requires_back()),
                proof: proof_of(CaptureKind::DocumentFront),
                additional_proof: if document_type.requires_back() {
                    proof_of(CaptureKind::DocumentBack)
                } else {
                    String::new()
                },
            },
            face: FaceSpec {
                proof: proof_of(CaptureKind::Selfie),
            },
        };

        Submission {
            reference: reference.to_string(),
            document_type,
            assets: assets.to_vec(),
            verification,
            auth: self.auth.clone(),
            ui: UiConfig::stable(self.theme, &self.language),
        }
    }
}

/// Everything a transport needs to start one verification.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub reference: String,
    pub document_type: DocumentType,
    pub assets: Vec<CapturedAsset>,
    pub verification: VerificationSpec,
    pub auth: AuthSpec,
    pub ui: UiConfig,
}

/// The three JSON blobs handed to the native bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgePayload {
    pub verification_json: String,
    pub auth_json: String,
    pub config_json: String,
}

impl Submission {
    pub fn to_bridge_payload(&self) -> Result<BridgePayload, TransportError> {
        let encode = |value: serde_json::Result<String>| {
            value.map_err(|e| TransportError::Serialization(e.to_string()))
        };
        Ok(BridgePayload {
            verification_json: encode(serde_json::to_string(&self.verification))?,
            auth_json: encode(serde_json::to_string(&self.auth))?,
            config_json: encode(serde_json::to_string(&self.ui))?,
        })
    }
}
