//! Sessions, identity, and tenant scoping.
//!
//! Login exchanges an email plus credential for a random bearer token held
//! in an in-memory session store. The identity middleware resolves the
//! token into an `Identity` extension; the scope rule below decides what
//! slice of data a caller may list.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{Json, Response},
    routing::post,
    Router,
};
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::ClientService;

use super::AppState;

// ============================================================================
// Identity
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn parse_lossy(s: &str) -> Self {
        if s.eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::Member
        }
    }
}

/// Authenticated caller attached to the request by the middleware.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub client_id: Option<Uuid>,
}

/// Token -> identity, in memory. Sessions do not survive a restart.
pub type SessionStore = Arc<RwLock<HashMap<String, Identity>>>;

pub fn new_session_store() -> SessionStore {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Decide the effective client filter for a list endpoint.
///
/// Admins see the unfiltered set unless they ask for a narrower one.
/// Members are always narrowed to their own client, whatever they pass;
/// a member with no client scope gets nothing, never the unfiltered set.
pub fn resolve_client_scope(
    identity: &Identity,
    requested: Option<Uuid>,
) -> Result<Option<Uuid>, (StatusCode, String)> {
    match identity.role {
        Role::Admin => Ok(requested),
        Role::Member => match identity.client_id {
            Some(own) => Ok(Some(own)),
            None => Err((
                StatusCode::FORBIDDEN,
                "No client scope for this account".to_string(),
            )),
        },
    }
}

/// Admin-only gate for global mutations (plans, shared nodes, clients).
pub fn require_admin(identity: &Identity) -> Result<(), (StatusCode, String)> {
    if identity.role == Role::Admin {
        Ok(())
    } else {
        Err((StatusCode::FORBIDDEN, "Admin role required".to_string()))
    }
}

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub credential: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub client_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
}

fn issue_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/api/auth/login", post(login))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    if request.email.is_empty() {
        return Err(super::missing_field("email"));
    }
    // Development credential check: any non-empty secret is accepted.
    // Real verification belongs to the reverse proxy in front of this
    // service.
    if request.credential.is_empty() {
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()));
    }

    let clients = ClientService::new(state.pool.clone());
    let user = clients
        .get_user_by_email(&request.email)
        .await
        .map_err(|e| {
            tracing::error!("Login query error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()))?;

    let identity = Identity {
        user_id: user.user_id,
        email: user.email,
        role: Role::parse_lossy(&user.role),
        client_id: user.client_id,
    };

    let token = issue_token();
    state
        .sessions
        .write()
        .await
        .insert(token.clone(), identity.clone());

    let _ = clients.touch_last_login(user.user_id).await;

    Ok(Json(LoginResponse {
        token,
        role: identity.role,
        client_id: identity.client_id,
        expires_at: Utc::now() + Duration::hours(24),
    }))
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolve the bearer token into an `Identity` extension or reject with 401.
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Missing session".to_string()))?;

    let identity = state
        .sessions
        .read()
        .await
        .get(token)
        .cloned()
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Invalid session".to_string()))?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Gate access to one resource by its owning client. Shared resources
/// (no owning client) are readable by everyone.
pub fn ensure_client_access(
    identity: &Identity,
    resource_client: Option<Uuid>,
) -> Result<(), (StatusCode, String)> {
    match (identity.role, resource_client) {
        (Role::Admin, _) => Ok(()),
        (Role::Member, None) => Ok(()),
        (Role::Member, Some(owner)) if identity.client_id == Some(owner) => Ok(()),
        (Role::Member, Some(_)) => Err((
            StatusCode::FORBIDDEN,
            "Access denied to this client".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            email: "admin@nexus.test".to_string(),
            role: Role::Admin,
            client_id: None,
        }
    }

    fn member(client_id: Option<Uuid>) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            email: "member@nexus.test".to_string(),
            role: Role::Member,
            client_id,
        }
    }

    #[test]
    fn admin_without_filter_sees_unfiltered_set() {
        assert_eq!(resolve_client_scope(&admin(), None).unwrap(), None);
    }

    #[test]
    fn admin_filter_is_honored() {
        let id = Uuid::new_v4();
        assert_eq!(resolve_client_scope(&admin(), Some(id)).unwrap(), Some(id));
    }

    #[test]
    fn member_is_always_narrowed_to_own_client() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert_eq!(
            resolve_client_scope(&member(Some(own)), None).unwrap(),
            Some(own)
        );
        assert_eq!(
            resolve_client_scope(&member(Some(own)), Some(other)).unwrap(),
            Some(own)
        );
    }

    #[test]
    fn member_without_scope_is_rejected() {
        let err = resolve_client_scope(&member(None), None).unwrap_err();
        assert_eq!(err.0, StatusCode::FORBIDDEN);
    }

    #[test]
    fn resource_access_follows_ownership() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(ensure_client_access(&admin(), Some(other)).is_ok());
        assert!(ensure_client_access(&member(Some(own)), Some(own)).is_ok());
        assert!(ensure_client_access(&member(Some(own)), None).is_ok());
        assert!(ensure_client_access(&member(Some(own)), Some(other)).is_err());
    }

    #[test]
    fn role_parsing_defaults_to_member() {
        assert_eq!(Role::parse_lossy("ADMIN"), Role::Admin);
        assert_eq!(Role::parse_lossy("member"), Role::Member);
        assert_eq!(Role::parse_lossy("intern"), Role::Member);
    }

    #[test]
    fn issued_tokens_are_long_and_distinct() {
        let a = issue_token();
        let b = issue_token();
        assert_eq!(a.len(), 48);
        assert_ne!(a, b);
    }
}
