use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::career_guide_web_server::RuntimeSettings;
use crate::core::jwt_auth::{AuthenticatedUser, ACCESS_TOKEN_COOKIE};
use crate::core::{AppError, AppSuccessResponse, SupabaseAuth};
use crate::db::{GroupStore, ProfileStore};
use crate::models::groups::AutoJoin;
use crate::models::profiles::{NewProfile, Profile};
use crate::routes::groups::join_default_group;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub profile: Profile,
    pub default_group: AutoJoin,
}

fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(ACCESS_TOKEN_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age_seconds))
        .finish()
}

#[tracing::instrument(
    name = "User Login",
    skip(auth, profiles, groups, settings, request),
    fields(email = %request.email)
)]
#[post("/login")]
pub async fn login(
    auth: web::Data<SupabaseAuth>,
    profiles: web::Data<dyn ProfileStore>,
    groups: web::Data<dyn GroupStore>,
    settings: web::Data<RuntimeSettings>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    let session = auth
        .sign_in_with_password(request.email.trim(), &request.password)
        .await?;

    let profile = profiles
        .ensure_profile(&NewProfile {
            id: session.user.id,
            email: session
                .user
                .email
                .clone()
                .unwrap_or_else(|| request.email.trim().to_string()),
            full_name: session.user.full_name(),
        })
        .await?;

    let default_group =
        join_default_group(groups.get_ref(), settings.default_group_id, profile.id).await;

    let cookie = session_cookie(&session.access_token, session.expires_in, settings.secure_cookies);
    let response = LoginResponse {
        access_token: session.access_token,
        refresh_token: session.refresh_token,
        expires_in: session.expires_in,
        profile,
        default_group,
    };

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(AppSuccessResponse::new(response, "Login successful")))
}

#[tracing::instrument(name = "User Logout", skip(auth, settings, user), fields(user_id = %user.user_id))]
#[post("/logout")]
pub async fn logout(
    auth: web::Data<SupabaseAuth>,
    settings: web::Data<RuntimeSettings>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    if let Err(e) = auth.sign_out(&user.access_token).await {
        tracing::warn!(error = %e, "failed to revoke session upstream");
    }

    let mut removal = session_cookie("", 0, settings.secure_cookies);
    removal.make_removal();

    Ok(HttpResponse::Ok()
        .cookie(removal)
        .json(AppSuccessResponse::new((), "Logged out successfully")))
}

#[tracing::instrument(name = "Current User", skip(profiles, user), fields(user_id = %user.user_id))]
#[get("/me")]
pub async fn me(
    profiles: web::Data<dyn ProfileStore>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let profile = profiles
        .get_profile(user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Profile not found"))?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(profile, "Profile retrieved successfully")))
}
