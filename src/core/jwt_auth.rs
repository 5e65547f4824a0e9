use actix_web::dev::Payload;
use actix_web::{http, web, FromRequest, HttpMessage, HttpRequest};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::core::AppError;
use crate::db::ProfileStore;
use crate::models::profiles::{Profile, Role};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
const SUPABASE_AUDIENCE: &str = "authenticated";

/// Claims carried by a Supabase access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub aud: String,
    pub exp: usize,
}

#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(jwt_secret: &Secret<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[SUPABASE_AUDIENCE]);

        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.expose_secret().as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, AppError> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("rejected access token: {}", e);
                AppError::unauthorized("Invalid or expired token")
            })
    }
}

/// Sign claims with the project secret. The API never mints tokens itself;
/// this exists for tooling and tests.
pub fn generate_jwt_token(jwt_secret: &Secret<String>, claims: &JwtClaims) -> Result<String, AppError> {
    let encoding_key = EncodingKey::from_secret(jwt_secret.expose_secret().as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|_| AppError::internal_error("Failed to generate JWT token"))
}

/// The caller of a protected route, resolved from the bearer header or the
/// `access_token` cookie.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub access_token: String,
    pub claims: JwtClaims,
}

impl AuthenticatedUser {
    pub async fn require_admin(&self, profiles: &dyn ProfileStore) -> Result<Profile, AppError> {
        let profile = profiles
            .get_profile(self.user_id)
            .await?
            .ok_or_else(|| AppError::forbidden_error("Only admins can perform this action"))?;

        if profile.role != Role::Admin {
            tracing::warn!(user_id = %self.user_id, role = %profile.role, "non-admin attempted a privileged action");
            return Err(AppError::forbidden_error("Only admins can perform this action"));
        }

        Ok(profile)
    }
}

fn extract_token(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        req.cookie(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    })
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let verifier = match req.app_data::<web::Data<TokenVerifier>>() {
            Some(verifier) => verifier,
            None => return ready(Err(AppError::internal_error("token verifier is not registered"))),
        };

        let token = match extract_token(req) {
            Some(token) => token,
            None => return ready(Err(AppError::unauthorized("Authentication required"))),
        };

        let claims = match verifier.verify(&token) {
            Ok(claims) => claims,
            Err(e) => return ready(Err(e)),
        };

        req.extensions_mut().insert(claims.clone());

        ready(Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email.clone(),
            access_token: token,
            claims,
        }))
    }
}
