//! Authentication middleware
//!
//! JWT authentication and permission checks for tenant-scoped routes

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use shared::{permission, Action, Resource, UserRole, ALL_PERMISSIONS};
use uuid::Uuid;

use crate::error::{AppError, ErrorDetail, ErrorResponse};
use crate::services::auth::{decode_claims, Claims};
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: UserRole,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, resource: Resource, action: Action) -> bool {
        let wanted = permission(resource, action);
        self.permissions
            .iter()
            .any(|p| p == ALL_PERMISSIONS || *p == wanted)
    }

    /// Fail with `InsufficientPermissions` unless the user holds the permission
    pub fn require(&self, resource: Resource, action: Action) -> Result<(), AppError> {
        if self.has_permission(resource, action) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user_id,
                permission = %permission(resource, action),
                "permission denied"
            );
            Err(AppError::InsufficientPermissions(permission(resource, action)))
        }
    }

    fn from_claims(claims: Claims) -> Result<Self, &'static str> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token")?;
        let organization_id = Uuid::parse_str(&claims.organization_id)
            .map_err(|_| "Invalid organization ID in token")?;
        let role = UserRole::from_str(&claims.role).ok_or("Invalid role in token")?;

        Ok(Self {
            user_id,
            organization_id,
            role,
            permissions: claims.permissions,
        })
    }
}

/// Verify a bearer token against the configured signing secret
fn authenticate(auth_header: Option<&str>, secret: &str) -> Result<AuthUser, String> {
    let token = auth_header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| "Missing or invalid Authorization header".to_string())?;

    let claims = decode_claims(token, secret).map_err(|e| format!("Invalid token: {}", e))?;
    AuthUser::from_claims(claims).map_err(str::to_string)
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let auth_user = match authenticate(auth_header, &state.config.jwt.secret) {
        Ok(user) => user,
        Err(msg) => return unauthorized_response(&msg),
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| unauthorized_response("Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(permissions: Vec<String>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            role: UserRole::Operator,
            permissions,
        }
    }

    #[test]
    fn test_wildcard_grants_everything() {
        let owner = user(vec![ALL_PERMISSIONS.to_string()]);
        for resource in Resource::ALL {
            assert!(owner.require(resource, Action::Approve).is_ok());
        }
    }

    fn token(secret: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            organization_id: Uuid::new_v4().to_string(),
            role: UserRole::Manager.as_str().to_string(),
            permissions: vec![permission(Resource::Batch, Action::View)],
            exp: now + 600,
            iat: now,
        };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_token_checked_against_configured_secret() {
        let header = format!("Bearer {}", token("configured-secret"));
        let user = authenticate(Some(&header), "configured-secret").unwrap();
        assert_eq!(user.role, UserRole::Manager);
        assert!(user.has_permission(Resource::Batch, Action::View));

        let forged = format!("Bearer {}", token("development-secret-key"));
        assert!(authenticate(Some(&forged), "configured-secret").is_err());
    }

    #[test]
    fn test_missing_bearer_rejected() {
        assert!(authenticate(None, "configured-secret").is_err());
        assert!(authenticate(Some("Basic abc"), "configured-secret").is_err());
    }

    #[test]
    fn test_exact_permission() {
        let clerk = user(vec![permission(Resource::Inventory, Action::Edit)]);
        assert!(clerk.has_permission(Resource::Inventory, Action::Edit));
        assert!(!clerk.has_permission(Resource::Inventory, Action::Approve));
        assert!(matches!(
            clerk.require(Resource::Purchasing, Action::View),
            Err(AppError::InsufficientPermissions(_))
        ));
    }
}
