//! Authentication service for organization registration, login, and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::{validate_organization_code, validate_password, validate_tax_id, UserRole};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for registering a new organization with its owner account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterOrganizationInput {
    #[validate(length(min = 1, max = 255, message = "Organization name is required"))]
    pub organization_name: String,
    /// Short tenant code (e.g. "NORTE")
    pub organization_code: String,
    pub tax_id: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Owner name is required"))]
    pub owner_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
}

/// Response after successful registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub organization_id: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    organization_id: Uuid,
    password_hash: String,
    role: String,
    is_active: bool,
}

/// Decode and validate an access token
pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

impl AuthService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Register a new organization with its owner account
    pub async fn register_organization(
        &self,
        input: RegisterOrganizationInput,
    ) -> AppResult<RegisterResponse> {
        input.validate()?;
        validate_organization_code(&input.organization_code)
            .map_err(|msg| AppError::validation("organization_code", msg))?;
        validate_password(&input.password).map_err(|msg| AppError::validation("password", msg))?;
        if let Some(tax_id) = &input.tax_id {
            validate_tax_id(tax_id).map_err(|msg| AppError::validation("tax_id", msg))?;
        }

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM organizations WHERE code = $1",
        )
        .bind(&input.organization_code)
        .fetch_one(&self.db)
        .await?;

        if existing > 0 {
            return Err(AppError::conflict("organization", "Organization code already exists"));
        }

        let email_taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(&input.email)
            .fetch_one(&self.db)
            .await?;

        if email_taken > 0 {
            return Err(AppError::conflict("user", "Email is already registered"));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let mut tx = self.db.begin().await?;

        let organization_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO organizations (name, code, tax_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&input.organization_name)
        .bind(&input.organization_code)
        .bind(&input.tax_id)
        .fetch_one(&mut *tx)
        .await?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (organization_id, email, password_hash, name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(organization_id)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(&input.owner_name)
        .bind(UserRole::Owner.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%organization_id, code = %input.organization_code, "organization registered");

        let tokens = self.generate_tokens(user_id, organization_id, UserRole::Owner)?;
        self.store_refresh_token(user_id, &tokens.refresh_token).await?;

        Ok(RegisterResponse {
            organization_id,
            user_id,
            tokens,
        })
    }

    /// Authenticate user with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthTokens> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, organization_id, password_hash, role, is_active
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            tracing::warn!(user_id = %user.id, "failed login attempt");
            return Err(AppError::Unauthorized("Invalid email or password".to_string()));
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        let role = Self::parse_role(&user.role)?;
        let tokens = self.generate_tokens(user.id, user.organization_id, role)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        Ok(tokens)
    }

    /// Exchange a refresh token for a new token pair; the old one is revoked
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = Self::hash_token(refresh_token);

        let (user_id, organization_id, role) = sqlx::query_as::<_, (Uuid, Uuid, String)>(
            r#"
            SELECT rt.user_id, u.organization_id, u.role
            FROM refresh_tokens rt
            JOIN users u ON u.id = rt.user_id
            WHERE rt.token_hash = $1
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND u.is_active = true
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

        sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(&self.db)
            .await?;

        let role = Self::parse_role(&role)?;
        let tokens = self.generate_tokens(user_id, organization_id, role)?;
        self.store_refresh_token(user_id, &tokens.refresh_token).await?;

        Ok(tokens)
    }

    fn parse_role(role: &str) -> AppResult<UserRole> {
        UserRole::from_str(role).ok_or_else(|| AppError::Internal(format!("Unknown role '{}'", role)))
    }

    fn generate_tokens(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        role: UserRole,
    ) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.access_token_expiry);

        let claims = Claims {
            sub: user_id.to_string(),
            organization_id: organization_id.to_string(),
            role: role.as_str().to_string(),
            permissions: role.permissions(),
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            refresh_token: Uuid::new_v4().to_string(),
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(Self::hash_token(token))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Hex-encoded SHA-256 of a refresh token
    fn hash_token(token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let a = AuthService::hash_token("refresh-token");
        let b = AuthService::hash_token("refresh-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, AuthService::hash_token("other-token"));
    }

    #[test]
    fn test_claims_round_trip() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            organization_id: Uuid::new_v4().to_string(),
            role: "viewer".to_string(),
            permissions: UserRole::Viewer.permissions(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iat: Utc::now().timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let decoded = decode_claims(&token, "secret").unwrap();
        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.permissions, claims.permissions);
        assert!(decode_claims(&token, "wrong").is_err());
    }
}
