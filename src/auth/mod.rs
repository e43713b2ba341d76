/*!
 * # Authentication Module
 *
 * JWT bearer authentication for the API. Token verification itself is the
 * identity provider's concern; this module validates the signature and
 * expiry, then trusts the claims (`sub`, `role`) as the acting user.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::AppState;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User's display name
    pub name: Option<String>,
    /// Single role per user (admin, cashier, waiter)
    pub role: String,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub name: Option<String>,
    pub role: String,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// Check if the user has a specific permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }
}

/// Common permission string constants for compile-time safety
pub mod consts {
    // Sales
    pub const SALES_READ: &str = "sales:read";
    pub const SALES_CREATE: &str = "sales:create";
    pub const SALES_UPDATE: &str = "sales:update";
    pub const SALES_INVOICE: &str = "sales:invoice";

    // Timbrados
    pub const TIMBRADOS_READ: &str = "timbrados:read";
    pub const TIMBRADOS_MANAGE: &str = "timbrados:manage";
}

/// Role-to-permission expansion. Roles come from the token; the grants are
/// fixed per role.
pub fn permissions_for_role(role: &str) -> Vec<String> {
    use consts::*;

    let grants: &[&str] = match role {
        "admin" => &[
            SALES_READ,
            SALES_CREATE,
            SALES_UPDATE,
            SALES_INVOICE,
            TIMBRADOS_READ,
            TIMBRADOS_MANAGE,
        ],
        "cashier" => &[
            SALES_READ,
            SALES_CREATE,
            SALES_UPDATE,
            SALES_INVOICE,
            TIMBRADOS_READ,
        ],
        "waiter" => &[SALES_READ, SALES_CREATE, SALES_UPDATE],
        _ => &[SALES_READ],
    };

    grants.iter().map(|p| p.to_string()).collect()
}

/// Validates a bearer token and returns its claims.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ServiceError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| ServiceError::Unauthorized(format!("Invalid token: {}", e)))
}

/// Issues a signed token for a user. Used by operational tooling and tests;
/// production tokens come from the identity provider.
pub fn issue_token(
    user_id: &str,
    name: Option<&str>,
    role: &str,
    secret: &str,
    expires_in_secs: i64,
) -> Result<String, ServiceError> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        name: name.map(|n| n.to_string()),
        role: role.to_string(),
        iat: now,
        exp: now + expires_in_secs,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::InternalError(format!("Failed to sign token: {}", e)))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::Unauthorized("No token, authorization denied".to_string())
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            ServiceError::Unauthorized("Authorization header must be a bearer token".to_string())
        })?;

        let claims = decode_token(token.trim(), &app_state.config.jwt_secret)?;

        Ok(AuthUser {
            user_id: claims.sub,
            name: claims.name,
            permissions: permissions_for_role(&claims.role),
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-key-that-is-definitely-long-enough-for-hs256-use";

    #[test]
    fn issued_token_round_trips() {
        let token = issue_token("user-7", Some("Ana"), "cashier", SECRET, 60).unwrap();
        let claims = decode_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "user-7");
        assert_eq!(claims.name.as_deref(), Some("Ana"));
        assert_eq!(claims.role, "cashier");
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token("user-7", None, "cashier", SECRET, -120).unwrap();
        let result = decode_token(&token, SECRET);
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("user-7", None, "cashier", SECRET, 60).unwrap();
        let result = decode_token(&token, "another-secret-key-that-is-also-long-enough-for-hs256");
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }

    #[test]
    fn role_grants_expand_to_permissions() {
        let admin = permissions_for_role("admin");
        assert!(admin.contains(&consts::TIMBRADOS_MANAGE.to_string()));

        let cashier = permissions_for_role("cashier");
        assert!(cashier.contains(&consts::SALES_INVOICE.to_string()));
        assert!(!cashier.contains(&consts::TIMBRADOS_MANAGE.to_string()));

        let waiter = permissions_for_role("waiter");
        assert!(waiter.contains(&consts::SALES_CREATE.to_string()));
        assert!(!waiter.contains(&consts::SALES_INVOICE.to_string()));
    }
}
