//! Request signing for robots configured with "additional signature" security.
//!
//! The platform signs with HMAC-SHA256 keyed by the robot secret over the
//! string `"<timestamp>\n<secret>"`, base64-encodes the digest and passes it
//! URL-encoded in the `sign` query parameter next to `timestamp`. The same
//! algorithm authenticates outgoing-robot callbacks, where both values arrive
//! as HTTP headers instead.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::OffsetDateTime;
use url::{Url, form_urlencoded};

type HmacSha256 = Hmac<Sha256>;

/// Returns the current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Computes and verifies robot signatures for one shared secret.
#[derive(Clone)]
pub struct Signer {
    secret: String,
    keyed: HmacSha256,
}

impl Signer {
    /// Creates a signer, or `None` for an empty secret (plain-token mode).
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return None;
        }
        let keyed = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
        Some(Self { secret, keyed })
    }

    fn mac(&self, timestamp_ms: i64) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(format!("{timestamp_ms}\n{}", self.secret).as_bytes());
        mac
    }

    /// Signs the given timestamp.
    pub fn sign(&self, timestamp_ms: i64) -> Signature {
        let digest = self.mac(timestamp_ms).finalize().into_bytes();
        Signature {
            timestamp: timestamp_ms,
            sign: STANDARD.encode(digest),
        }
    }

    /// Signs the current time. Call this per request, never cache the result:
    /// the platform rejects signatures older than one hour.
    pub fn sign_now(&self) -> Signature {
        self.sign(now_millis())
    }

    /// Checks a base64 signature against `timestamp_ms` in constant time.
    pub fn verify(&self, timestamp_ms: i64, sign: &str) -> bool {
        let Ok(expected) = STANDARD.decode(sign.trim()) else {
            return false;
        };
        self.mac(timestamp_ms).verify_slice(&expected).is_ok()
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").field("secret", &"<redacted>").finish()
    }
}

/// A computed `timestamp`/`sign` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Base64 HMAC digest (not URL-encoded).
    pub sign: String,
}

impl Signature {
    /// The `sign` value as it appears in a query string.
    pub fn encoded_sign(&self) -> String {
        form_urlencoded::byte_serialize(self.sign.as_bytes()).collect()
    }

    /// Appends `timestamp` and `sign` to the URL's query.
    pub fn append_to(&self, url: &mut Url) {
        url.query_pairs_mut()
            .append_pair("timestamp", &self.timestamp.to_string())
            .append_pair("sign", &self.sign);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "SECe70ee0c1014bcc903084edc096504bfdba83be356a4c0ee9d9e96da1dbffa874";

    #[test]
    fn test_empty_secret_is_plain_mode() {
        assert!(Signer::new("").is_none());
        assert!(Signer::new(SECRET).is_some());
    }

    #[test]
    fn test_sign_is_deterministic() {
        let signer = Signer::new(SECRET).unwrap();
        assert_eq!(signer.sign(1_700_000_000_000), signer.sign(1_700_000_000_000));
    }

    #[test]
    fn test_sign_changes_with_inputs() {
        let signer = Signer::new(SECRET).unwrap();
        let other = Signer::new("SECanother").unwrap();
        let base = signer.sign(1_700_000_000_000);
        assert_ne!(base.sign, signer.sign(1_700_000_000_001).sign);
        assert_ne!(base.sign, other.sign(1_700_000_000_000).sign);
    }

    #[test]
    fn test_sign_matches_reference_algorithm() {
        let signer = Signer::new("secret").unwrap();
        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(b"1600000000000\nsecret");
        let expected = STANDARD.encode(mac.finalize().into_bytes());
        assert_eq!(signer.sign(1_600_000_000_000).sign, expected);
    }

    #[test]
    fn test_verify_round_trip() {
        let signer = Signer::new(SECRET).unwrap();
        let sig = signer.sign(1_700_000_000_000);
        assert!(signer.verify(sig.timestamp, &sig.sign));
        assert!(!signer.verify(sig.timestamp + 1, &sig.sign));
        assert!(!signer.verify(sig.timestamp, "not base64!"));
    }

    #[test]
    fn test_append_to_url_encodes_sign() {
        let sig = Signature {
            timestamp: 42,
            sign: "a+b/c=".to_string(),
        };
        assert_eq!(sig.encoded_sign(), "a%2Bb%2Fc%3D");

        let mut url = Url::parse("https://oapi.dingtalk.com/robot/send?access_token=t").unwrap();
        sig.append_to(&mut url);
        assert_eq!(
            url.query(),
            Some("access_token=t&timestamp=42&sign=a%2Bb%2Fc%3D")
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let signer = Signer::new(SECRET).unwrap();
        assert!(!format!("{signer:?}").contains(SECRET));
    }
}
