use chrono::{DateTime, Utc};
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::errors::AppError;
use crate::lenient;

/// Status attached to every accepted form submission.
pub const PENDING_CALL_STATUS: &str = "pending_call";

/// Enquiry form posted by the third-party form service ahead of a call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FormSubmission {
    /// Voice session the form belongs to (required)
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub call_session_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub phone: Option<String>,
    #[serde(default)]
    pub enquiry_type: Option<String>,
    #[serde(default)]
    pub property_interest: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Call prefill derived from a form submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCall {
    pub call_session_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub enquiry_type: Option<String>,
    pub property_interest: Option<String>,
    pub message: Option<String>,
    pub status: String,
    pub received_at: DateTime<Utc>,
}

impl FormSubmission {
    pub fn into_pending_call(self, received_at: DateTime<Utc>) -> Result<PendingCall, AppError> {
        let call_session_id = trimmed(self.call_session_id)
            .ok_or_else(|| AppError::BadRequest("call_session_id is required".to_string()))?;

        let email = trimmed(self.email).and_then(|email| {
            let email = email.to_lowercase();
            if is_valid_email(&email) {
                Some(email)
            } else {
                tracing::warn!("Dropping invalid email on session {}", call_session_id);
                None
            }
        });

        Ok(PendingCall {
            call_session_id,
            name: trimmed(self.name),
            email,
            phone: trimmed(self.phone).map(|p| normalize_phone(&p)),
            enquiry_type: trimmed(self.enquiry_type),
            property_interest: trimmed(self.property_interest),
            message: trimmed(self.message),
            status: PENDING_CALL_STATUS.to_string(),
            received_at,
        })
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Basic structural email check (local@domain.tld).
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();

    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    EMAIL_RE
        .get_or_init(|| {
            Regex::new(
                r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
            )
            .ok()
        })
        .as_ref()
        .map(|re| re.is_match(email))
        .unwrap_or(false)
}

/// E.164 form of an Indian (or explicitly prefixed) number; the trimmed
/// input when it cannot be parsed as a valid number.
pub fn normalize_phone(raw: &str) -> String {
    let raw = raw.trim();
    match phonenumber::parse(Some(CountryId::IN), raw) {
        Ok(number) if phonenumber::is_valid(&number) => {
            number.format().mode(Mode::E164).to_string()
        }
        Ok(_) => {
            tracing::debug!("Phone number kept as entered (not valid): {}", raw);
            raw.to_string()
        }
        Err(e) => {
            tracing::debug!("Phone number kept as entered ({:?}): {}", e, raw);
            raw.to_string()
        }
    }
}
