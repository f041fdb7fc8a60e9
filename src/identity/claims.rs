//! Payload decoding for three-part signed tokens.
//!
//! The signature segment is not verified: claims are trusted because the token was
//! issued by the login endpoint and handed to us over the same channel.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;

use super::record::IdentityRecord;
use crate::error::{AuthError, AuthResult};

/// Subject ids arrive either as a JSON string or a number depending on the issuer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Subject {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<Subject>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<i64>,
    /// Expiry as a NumericDate; fractional seconds are allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<Number>,
}

fn null_as_default<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// Only the expiry; everything else in the payload is ignored for validity checks.
#[derive(Deserialize)]
struct Expiry {
    #[serde(default)]
    exp: Option<Number>,
}

/// Whole unix seconds, rounded down and clamped to the `i64` range.
fn numeric_date(n: &Number) -> i64 {
    if let Some(i) = n.as_i64() {
        i
    } else if let Some(u) = n.as_u64() {
        i64::try_from(u).unwrap_or(i64::MAX)
    } else {
        // float to int casts saturate
        n.as_f64().map(|f| f.floor() as i64).unwrap_or(i64::MIN)
    }
}

/// True when `exp` lies more than `skew_secs` after `now`. Never overflows.
pub fn is_live(exp: i64, now: i64, skew_secs: i64) -> bool { exp > now.saturating_add(skew_secs.max(0)) }

impl ClaimSet {
    pub fn subject_id(&self) -> AuthResult<i64> {
        match &self.sub {
            None => Err(AuthError::decode("credential has no subject")),
            Some(Subject::Number(n)) => Ok(*n),
            Some(Subject::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| AuthError::decode(format!("subject '{}' is not numeric", s))),
        }
    }

    pub fn expiry(&self) -> Option<i64> { self.exp.as_ref().map(numeric_date) }

    /// True when `exp` is present and lies more than `skew_secs` after `now`.
    pub fn is_live_at(&self, now: i64, skew_secs: i64) -> bool {
        self.expiry().is_some_and(|exp| is_live(exp, now, skew_secs))
    }

    /// Build the cached identity from claims alone. No staff profile is available here.
    pub fn to_identity(&self) -> AuthResult<IdentityRecord> {
        Ok(IdentityRecord {
            id: self.subject_id()?,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
            staff_id: self.staff_id,
            staff: None,
        })
    }
}

fn payload(token: &str) -> AuthResult<Vec<u8>> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(AuthError::decode(format!("expected 3 segments, found {}", parts.len())));
    }
    // tolerate issuers that pad their segments
    URL_SAFE_NO_PAD.decode(parts[1].trim_end_matches('=')).map_err(AuthError::decode)
}

pub fn decode_claims(token: &str) -> AuthResult<ClaimSet> {
    serde_json::from_slice::<ClaimSet>(&payload(token)?).map_err(AuthError::decode)
}

/// Reads just the `exp` claim. A missing or non-numeric expiry is a decode error.
pub fn decode_expiry(token: &str) -> AuthResult<i64> {
    let expiry = serde_json::from_slice::<Expiry>(&payload(token)?).map_err(AuthError::decode)?;
    expiry.exp.as_ref().map(numeric_date).ok_or_else(|| AuthError::decode("credential has no expiry"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_with(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.sig", header, body)
    }

    #[test]
    fn decodes_string_subject() {
        let t = token_with(json!({"sub":"42","email":"a@b.c","name":"Ann","role":"admin","staff_id":9,"exp":2000}));
        let c = decode_claims(&t).unwrap();
        assert_eq!(c.subject_id().unwrap(), 42);
        assert_eq!(c.staff_id, Some(9));
        assert_eq!(c.expiry(), Some(2000));
        let id = c.to_identity().unwrap();
        assert_eq!(id.id, 42);
        assert_eq!(id.role, "admin");
        assert!(id.staff.is_none());
    }

    #[test]
    fn decodes_numeric_subject() {
        let c = decode_claims(&token_with(json!({"sub":7,"exp":1}))).unwrap();
        assert_eq!(c.subject_id().unwrap(), 7);
    }

    #[test]
    fn non_numeric_subject_fails_identity() {
        let c = decode_claims(&token_with(json!({"sub":"user-x","exp":1}))).unwrap();
        assert!(matches!(c.to_identity(), Err(AuthError::CredentialDecode(_))));
    }

    #[test]
    fn malformed_tokens_are_decode_errors() {
        for bad in ["", "abc", "a.b", "a..c", "a.b.c.d", "x.!!!.y"] {
            assert!(matches!(decode_claims(bad), Err(AuthError::CredentialDecode(_))), "{}", bad);
        }
        // valid base64, not json
        let t = format!("h.{}.s", URL_SAFE_NO_PAD.encode("not json"));
        assert!(matches!(decode_claims(&t), Err(AuthError::CredentialDecode(_))));
    }

    #[test]
    fn liveness_uses_skew() {
        let c = decode_claims(&token_with(json!({"sub":"1","exp":1_000}))).unwrap();
        assert!(c.is_live_at(900, 30));
        assert!(!c.is_live_at(980, 30));
        assert!(!c.is_live_at(1_001, 0));
        let no_exp = decode_claims(&token_with(json!({"sub":"1"}))).unwrap();
        assert!(!no_exp.is_live_at(0, 0));
    }

    #[test]
    fn liveness_saturates_at_the_extremes() {
        assert!(!is_live(i64::MIN, 0, 30));
        assert!(!is_live(i64::MIN, i64::MIN, i64::MAX));
        assert!(is_live(i64::MAX, 1_700_000_000, 30));
        assert!(!is_live(i64::MAX, i64::MAX, 0));
        // a huge tolerance rejects everything rather than wrapping
        assert!(!is_live(i64::MAX, 1, i64::MAX));
    }

    #[test]
    fn expiry_ignores_profile_claims() {
        for payload in [
            json!({"sub":"1","name":null,"email":null,"exp":5000}),
            json!({"user_id":1,"exp":5000}),
            json!({"sub":"1","exp":5000.5}),
            json!({"sub":{"nested":true},"staff_id":"n/a","exp":5000}),
        ] {
            assert_eq!(decode_expiry(&token_with(payload.clone())).unwrap(), 5000, "{}", payload);
        }
        assert_eq!(decode_expiry(&token_with(json!({"exp": i64::MIN}))).unwrap(), i64::MIN);
        assert_eq!(decode_expiry(&token_with(json!({"exp": u64::MAX}))).unwrap(), i64::MAX);
    }

    #[test]
    fn missing_or_non_numeric_expiry_is_a_decode_error() {
        for payload in [json!({"sub":"1"}), json!({"exp":null}), json!({"exp":"tomorrow"})] {
            assert!(matches!(decode_expiry(&token_with(payload)), Err(AuthError::CredentialDecode(_))));
        }
        assert!(matches!(decode_expiry("a.b"), Err(AuthError::CredentialDecode(_))));
    }

    #[test]
    fn null_profile_claims_read_as_empty() {
        let c = decode_claims(&token_with(json!({"sub":"4","name":null,"email":null,"role":null,"exp":9.75}))).unwrap();
        assert_eq!(c.expiry(), Some(9));
        let id = c.to_identity().unwrap();
        assert_eq!((id.id, id.name.as_str(), id.role.as_str()), (4, "", ""));
        let no_sub = decode_claims(&token_with(json!({"exp":1}))).unwrap();
        assert!(matches!(no_sub.to_identity(), Err(AuthError::CredentialDecode(_))));
    }

    #[test]
    fn padded_segments_are_accepted() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let body = format!("{}==", URL_SAFE_NO_PAD.encode(json!({"sub":"3","exp":5}).to_string()));
        let c = decode_claims(&format!("{}.{}.s", header, body)).unwrap();
        assert_eq!(c.subject_id().unwrap(), 3);
    }
}
