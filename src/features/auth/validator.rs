use super::model::AuthenticatedUser;
use crate::core::config::AuthConfig;
use crate::core::error::AppError;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// Validates HS256 bearer tokens issued by the session service
pub struct JwtValidator {
    decoding_key: DecodingKey,
    issuer: Option<String>,
    leeway: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "exp")]
    _exp: u64,
    #[serde(default)]
    roles: Vec<String>,
}

impl JwtValidator {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            leeway: config.jwt_leeway.as_secs(),
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        let claims = token_data.claims;
        if claims.sub.trim().is_empty() {
            return Err(AppError::Unauthorized("Token has no subject".to_string()));
        }

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            roles: claims.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        exp: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        iss: Option<&'a str>,
        roles: Vec<&'a str>,
    }

    fn config(issuer: Option<&str>) -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            issuer: issuer.map(str::to_string),
            jwt_leeway: Duration::from_secs(0),
        }
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn token(secret: &str, claims: &TestClaims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token() {
        let validator = JwtValidator::new(&config(None));
        let jwt = token(
            "test-secret",
            &TestClaims {
                sub: "user-1",
                exp: now() + 600,
                iss: None,
                roles: vec!["admin"],
            },
        );

        let user = validator.validate_token(&jwt).unwrap();
        assert_eq!(user.user_id, "user-1");
        assert!(user.is_admin());
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let validator = JwtValidator::new(&config(None));
        let jwt = token(
            "other-secret",
            &TestClaims {
                sub: "user-1",
                exp: now() + 600,
                iss: None,
                roles: vec![],
            },
        );

        assert!(matches!(
            validator.validate_token(&jwt),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let validator = JwtValidator::new(&config(None));
        let jwt = token(
            "test-secret",
            &TestClaims {
                sub: "user-1",
                exp: now() - 600,
                iss: None,
                roles: vec![],
            },
        );

        assert!(matches!(
            validator.validate_token(&jwt),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_issuer_mismatch() {
        let validator = JwtValidator::new(&config(Some("https://sessions.example")));
        let jwt = token(
            "test-secret",
            &TestClaims {
                sub: "user-1",
                exp: now() + 600,
                iss: Some("https://elsewhere.example"),
                roles: vec![],
            },
        );

        assert!(validator.validate_token(&jwt).is_err());
    }
}
