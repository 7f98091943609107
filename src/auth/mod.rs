/*!
 * # Authentication and Authorization Module
 *
 * JWT authentication plus the store's role gate. The middleware stack
 * validates the bearer token, resolves the caller into an [`AuthUser`]
 * request extension, and role-gated route groups compare the caller's role
 * against the minimum required role for the group.
 */

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::user::{self, Entity as UserEntity};
use crate::errors::ErrorResponse;

mod roles;

pub use roles::Role;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Subject (user id)
    pub username: String,
    pub role: String, // Role display name
    pub jti: String,  // Unique identifier for this token
    pub iat: i64,     // Issued at time
    pub exp: i64,     // Expiration time
    pub iss: String,  // Issuer
    pub aud: String,  // Audience
}

/// Authenticated caller resolved from a validated token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn has_role(&self, required: Role) -> bool {
        self.role.allows(required)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingAuth,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid username or password")]
    WrongCredentials,

    #[error("User account is inactive")]
    InactiveAccount,

    #[error("Access denied: {role} cannot perform this action")]
    InsufficientRole { role: Role },

    #[error("Failed to create token: {0}")]
    TokenCreation(String),

    #[error("Password hashing failed")]
    HashFailure,

    #[error("Database error")]
    DatabaseError(#[from] sea_orm::DbErr),
}

impl AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingAuth | Self::InvalidToken | Self::WrongCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::InactiveAccount | Self::InsufficientRole { .. } => StatusCode::FORBIDDEN,
            Self::TokenCreation(_) | Self::HashFailure | Self::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn response_message(&self) -> String {
        match self {
            Self::TokenCreation(_) | Self::HashFailure | Self::DatabaseError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(err)).into_response()
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            access_token_expiration,
        }
    }
}

/// Authentication service that handles token issuance and validation
#[derive(Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Verify credentials against the users table and issue an access token.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let account = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?
            .ok_or(AuthError::WrongCredentials)?;

        if !verify_password(password, &account.password_hash) {
            return Err(AuthError::WrongCredentials);
        }

        if !account.is_active {
            return Err(AuthError::InactiveAccount);
        }

        let token = self.generate_token(&account)?;

        // Best-effort bookkeeping; a failed timestamp update must not fail
        // the login.
        let mut touch: user::ActiveModel = account.clone().into();
        touch.last_login = Set(Some(Utc::now()));
        if let Err(e) = touch.update(&*self.db).await {
            warn!(username = %account.username, error = %e, "Failed to update last_login");
        }

        Ok(LoginResponse {
            token,
            user: AuthUser {
                user_id: account.id,
                username: account.username,
                role: Role::from_str(&account.role).unwrap_or(Role::Viewer),
            },
        })
    }

    /// Generate a signed access token for a user
    pub fn generate_token(&self, account: &user::Model) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + chrono::Duration::from_std(self.config.access_token_expiration)
                .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        let claims = Claims {
            sub: account.id.to_string(),
            username: account.username.clone(),
            role: account.role.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.jwt_issuer]);
        validation.set_audience(&[&self.config.jwt_audience]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "Token validation failed");
            AuthError::InvalidToken
        })
    }

    fn auth_user_from_claims(&self, claims: Claims) -> Result<AuthUser, AuthError> {
        let user_id = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        let role = Role::from_str(&claims.role).map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthUser {
            user_id,
            username: claims.username,
            role,
        })
    }
}

/// Hash a password with argon2 and a fresh salt
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
    use argon2::Argon2;

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::HashFailure)
}

/// Verify a password against a stored argon2 hash
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    use argon2::password_hash::{PasswordHash, PasswordVerifier};
    use argon2::Argon2;

    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Pull the bearer token out of request headers. A bare token without the
/// `Bearer ` prefix is accepted for compatibility with older terminals.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim())
        .filter(|v| !v.is_empty())
}

/// Authentication middleware that validates the bearer token and stores the
/// resolved caller in request extensions.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    let token = match extract_token(request.headers()) {
        Some(token) => token.to_string(),
        None => return AuthError::MissingAuth.into_response(),
    };

    match auth_service
        .validate_token(&token)
        .and_then(|claims| auth_service.auth_user_from_claims(claims))
    {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Role middleware rejecting callers below the required role
pub async fn role_middleware(
    State(required): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(AuthError::MissingAuth)?;

    if !user.role.allows(required) {
        return Err(AuthError::InsufficientRole { role: user.role });
    }

    Ok(next.run(request).await)
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Extension methods for Router to add auth middleware
pub trait RoleRouterExt {
    fn with_auth(self) -> Self;
    fn with_min_role(self, role: Role) -> Self;
}

impl<S> RoleRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_min_role(self, role: Role) -> Self {
        self.layer(axum::middleware::from_fn_with_state(role, role_middleware))
            .with_auth()
    }
}

/// Login request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

/// Successful login payload
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    #[schema(value_type = Object)]
    pub user: AuthUser,
}

/// Authentication routes
pub fn auth_routes() -> axum::Router<Arc<AuthService>> {
    axum::Router::new()
        .route("/login", axum::routing::post(login_handler))
        .route("/me", axum::routing::get(me_handler))
}

/// Login handler
#[utoipa::path(
    post,
    path = "/auth/login",
    summary = "Log in",
    request_body = LoginCredentials,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid username or password", body = crate::errors::ErrorResponse),
        (status = 403, description = "Account inactive", body = crate::errors::ErrorResponse),
    )
)]
pub async fn login_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(credentials): Json<LoginCredentials>,
) -> Result<Json<LoginResponse>, AuthError> {
    let response = auth_service
        .login(&credentials.username, &credentials.password)
        .await?;
    Ok(Json(response))
}

/// Who-am-I handler: token in, identity out
#[utoipa::path(
    get,
    path = "/auth/me",
    summary = "Current identity",
    responses(
        (status = 200, description = "Authenticated identity"),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn me_handler(
    State(auth_service): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<AuthUser>, AuthError> {
    let token = extract_token(&headers).ok_or(AuthError::MissingAuth)?;
    let claims = auth_service.validate_token(token)?;
    let user = auth_service.auth_user_from_claims(claims)?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> AuthService {
        let config = AuthConfig::new(
            "unit-test-secret-key-that-is-long-enough-for-validation".to_string(),
            "storefront-api".to_string(),
            "storefront-clients".to_string(),
            Duration::from_secs(3600),
        );
        AuthService::new(config, Arc::new(DatabaseConnection::Disconnected))
    }

    fn test_account(role: &str) -> user::Model {
        user::Model {
            id: 7,
            username: "casey".to_string(),
            password_hash: String::new(),
            first_name: None,
            last_name: None,
            email: None,
            role: role.to_string(),
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let service = test_service();
        let token = service.generate_token(&test_account("Grocery Keeper")).unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.username, "casey");
        assert_eq!(claims.role, "Grocery Keeper");

        let user = service.auth_user_from_claims(claims).unwrap();
        assert_eq!(user.user_id, 7);
        assert_eq!(user.role, Role::GroceryKeeper);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = test_service();
        let token = service.generate_token(&test_account("Admin")).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(service.validate_token(&tampered).is_err());
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("orange-crate-42").unwrap();
        assert!(verify_password("orange-crate-42", &hash));
        assert!(!verify_password("orange-crate-43", &hash));
        assert!(!verify_password("orange-crate-42", "not-a-hash"));
    }

    #[test]
    fn bearer_prefix_is_optional() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(extract_token(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, "abc.def.ghi".parse().unwrap());
        assert_eq!(extract_token(&headers), Some("abc.def.ghi"));
    }
}
