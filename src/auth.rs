/// Authentication extractors and utilities
use crate::{
    account::Identity,
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::{Deserialize, Serialize};

/// Claims carried by the identity provider's session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub exp: usize,
}

impl From<IdentityClaims> for Identity {
    fn from(claims: IdentityClaims) -> Self {
        Identity {
            id: claims.sub,
            primary_email: claims.email,
            first_name: claims.first_name,
            last_name: claims.last_name,
        }
    }
}

/// Authenticated caller - extracts and verifies the bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppContext> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::NotAuthenticated("Missing authorization header".to_string()))?;

        let identity = verify_identity_token(bearer.token(), &state.config.identity.jwt_secret)?;

        Ok(CurrentUser(identity))
    }
}

/// Verify an HS256 identity token and return the caller's identity
pub fn verify_identity_token(token: &str, jwt_secret: &str) -> AppResult<Identity> {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock skew (5 minutes)
    validation.leeway = 300;

    let token_data = decode::<IdentityClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::warn!("JWT verification failed: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::NotAuthenticated("Token has expired".to_string())
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                AppError::NotAuthenticated("Invalid token signature".to_string())
            }
            _ => AppError::NotAuthenticated(format!("Invalid token: {}", e)),
        }
    })?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(AppError::NotAuthenticated(
            "Invalid token: missing 'sub' claim".to_string(),
        ));
    }

    Ok(token_data.claims.into())
}

/// Issue a token for tests
#[cfg(test)]
pub fn issue_test_token(identity: &Identity, jwt_secret: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = IdentityClaims {
        sub: identity.id.clone(),
        email: identity.primary_email.clone(),
        first_name: identity.first_name.clone(),
        last_name: identity.last_name.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-testing-only-000";

    fn identity() -> Identity {
        Identity {
            id: "user_2abc".to_string(),
            primary_email: "ada@example.com".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: None,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let token = issue_test_token(&identity(), SECRET);
        assert_eq!(verify_identity_token(&token, SECRET).unwrap(), identity());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue_test_token(&identity(), SECRET);
        let result = verify_identity_token(&token, "another-secret-key-for-testing-0000");
        assert!(matches!(result, Err(AppError::NotAuthenticated(_))));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            verify_identity_token("not-a-jwt", SECRET),
            Err(AppError::NotAuthenticated(_))
        ));
    }
}
