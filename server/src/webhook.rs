use crate::{ApiError, AppState};
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use fragment_core::admission::key_prefix;
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use time::format_description::well_known::Rfc3339;

pub const VERIFICATION_HEADER: &str = "kofi-verification-token";
/// Hex characters kept from the digest.
pub const KEY_LEN: usize = 32;

#[derive(Debug, Deserialize)]
pub struct Donation {
    #[serde(default)]
    pub data: DonationData,
    #[serde(default)]
    pub message_type: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DonationData {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub kofi_transaction_id: String,
}

/// Donation webhook: verifies the shared token, mints a donor key and makes
/// it usable immediately.
pub async fn kofi(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(expected) = state.settings.kofi_token.as_deref() else {
        return Err(ApiError::Internal("Configuration error".into()));
    };
    let provided = headers.get(VERIFICATION_HEADER).and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided != expected {
        return Err(ApiError::Unauthorized);
    }

    let donation: Donation = serde_json::from_slice(&body).map_err(|_| ApiError::BadRequest("Invalid request body"))?;
    let key = generate_api_key(&donation.data.email, &state.settings.api_key_salt);
    state.admission.donors().insert(key.clone());
    tracing::info!(
        name = %donation.data.name,
        amount = %donation.data.amount,
        transaction = %donation.data.kofi_transaction_id,
        message_type = %donation.message_type,
        key_prefix = %key_prefix(&key),
        "donation received, donor key registered"
    );

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Thank you for your support!",
        "key": key,
    })))
}

/// Derive a fresh donor key from the donor's email, the salt and the time.
pub fn generate_api_key(seed: &str, salt: &str) -> String {
    let now = time::OffsetDateTime::now_utc();
    let stamp = now.format(&Rfc3339).unwrap_or_default();
    let mut hasher = Sha1::new();
    hasher.update(seed.as_bytes());
    hasher.update(salt.as_bytes());
    hasher.update(stamp.as_bytes());
    hasher.update(now.unix_timestamp_nanos().to_le_bytes());
    let mut key = format!("{:x}", hasher.finalize());
    key.truncate(KEY_LEN);
    key
}

pub fn random_salt() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(24).map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_hex_and_truncated() {
        let key = generate_api_key("donor@example.org", "salt");
        assert_eq!(key.len(), KEY_LEN);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn salts_are_random() {
        assert_ne!(random_salt(), random_salt());
        assert_eq!(random_salt().len(), 24);
    }
}
