use base64::engine::general_purpose::URL_SAFE as b64_urlsafe;
use base64::Engine;
use hmac::Mac;
use serde::{Deserialize, Serialize};

use crate::models::user::UserRole;
use crate::token::{Expiring, HmacSha256Verifier, Token};

use super::HmacSha256;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthTokenClaims {
    #[serde(rename = "uid")]
    pub user_id: i32,
    #[serde(rename = "eml")]
    pub user_email: String,
    #[serde(rename = "rol")]
    pub user_role: UserRole,
    #[serde(rename = "exp")]
    pub expiration: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewAuthTokenClaims<'a> {
    #[serde(rename = "uid")]
    pub user_id: i32,
    #[serde(rename = "eml")]
    pub user_email: &'a str,
    #[serde(rename = "rol")]
    pub user_role: UserRole,
    #[serde(rename = "exp")]
    pub expiration: u64,
}

impl Expiring for AuthTokenClaims {
    fn expiration(&self) -> u64 {
        self.expiration
    }
}

pub struct AuthToken {}

impl AuthToken {
    pub fn sign_new(claims: NewAuthTokenClaims, signing_key: &[u8]) -> String {
        let mut token_unencoded =
            serde_json::to_vec(&claims).expect("Failed to transform claims into JSON");

        let mut mac = HmacSha256::new_from_slice(signing_key).expect("HMAC key should not fail");
        mac.update(&token_unencoded);
        let signature = mac.finalize();
        token_unencoded.extend_from_slice(&signature.into_bytes());

        b64_urlsafe.encode(&token_unencoded)
    }
}

impl Token for AuthToken {
    type Claims = AuthTokenClaims;
    type Verifier = HmacSha256Verifier;

    fn token_name() -> &'static str {
        "AuthToken"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    #[test]
    fn test_sign_and_verify() {
        let user_id = 31;
        let user_email = "test1234@example.com";
        let exp = (SystemTime::now() + Duration::from_secs(10))
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let signing_key = [9; 64];

        let claims = NewAuthTokenClaims {
            user_id,
            user_email,
            user_role: UserRole::Mentee,
            expiration: exp,
        };

        let token = AuthToken::sign_new(claims, &signing_key);
        let t = AuthToken::decode(&token).unwrap();
        let claims = t.verify(&signing_key).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.user_email, user_email);
        assert_eq!(claims.user_role, UserRole::Mentee);
        assert_eq!(claims.expiration, exp);

        let claims = NewAuthTokenClaims {
            user_id,
            user_email,
            user_role: UserRole::Mentor,
            expiration: exp,
        };

        let token = AuthToken::sign_new(claims, &signing_key);
        let mut t = b64_urlsafe.decode(token).unwrap();

        // Make the signature invalid
        let last_byte = t.pop().unwrap();
        if last_byte == 0x01 {
            t.push(0x02);
        } else {
            t.push(0x01);
        }

        let t = b64_urlsafe.encode(t);

        assert!(AuthToken::decode(&t).unwrap().verify(&signing_key).is_err());

        let exp = (SystemTime::now() - Duration::from_secs(10))
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let claims = NewAuthTokenClaims {
            user_id,
            user_email,
            user_role: UserRole::Mentee,
            expiration: exp,
        };

        let token = AuthToken::sign_new(claims, &signing_key);
        assert!(AuthToken::decode(&token)
            .unwrap()
            .verify(&signing_key)
            .is_err());
    }
}
