//! Access-tier resolution.
//!
//! Every procedure declares an [`AccessPolicy`]. [`authorize`] walks the
//! policy's requirements in a fixed order and either rejects the call or
//! produces the [`AccessContext`] handlers read their tenant role from.

pub mod directory;
pub mod roles;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::database::DatabaseError;

pub use directory::{AccessDirectory, PgAccessDirectory};
pub use roles::{Aal, ClientRole, GlobalRole, PlanTier, UnknownVariant};

pub type ClientId = i64;

/// Authenticated caller, decoded from the session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub global_role: GlobalRole,
    pub aal: Aal,
}

impl Identity {
    pub fn is_elevated(&self) -> bool {
        self.global_role.is_elevated()
    }
}

/// Requirements a procedure places on its caller.
///
/// The named constructors match the procedure tiers; the combinators let a
/// procedure stack several client-scoped requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessPolicy {
    pub requires_identity: bool,
    pub requires_admin: bool,
    pub client_scoped: bool,
    pub requires_editor: bool,
    pub requires_premium: bool,
    pub requires_mfa: bool,
}

impl AccessPolicy {
    pub const fn public() -> Self {
        Self {
            requires_identity: false,
            requires_admin: false,
            client_scoped: false,
            requires_editor: false,
            requires_premium: false,
            requires_mfa: false,
        }
    }

    pub const fn protected() -> Self {
        Self {
            requires_identity: true,
            ..Self::public()
        }
    }

    pub const fn admin() -> Self {
        Self {
            requires_admin: true,
            ..Self::protected()
        }
    }

    pub const fn client() -> Self {
        Self {
            client_scoped: true,
            ..Self::protected()
        }
    }

    pub const fn client_editor() -> Self {
        Self::client().editor()
    }

    pub const fn premium() -> Self {
        Self::client().with_premium()
    }

    pub const fn mfa() -> Self {
        Self::client().with_mfa()
    }

    pub const fn editor(self) -> Self {
        Self {
            requires_editor: true,
            client_scoped: true,
            requires_identity: true,
            ..self
        }
    }

    pub const fn with_premium(self) -> Self {
        Self {
            requires_premium: true,
            client_scoped: true,
            requires_identity: true,
            ..self
        }
    }

    pub const fn with_mfa(self) -> Self {
        Self {
            requires_mfa: true,
            client_scoped: true,
            requires_identity: true,
            ..self
        }
    }
}

/// What the access chain attaches to an admitted call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessContext {
    pub identity: Option<Identity>,
    pub client_id: Option<ClientId>,
    pub client_role: Option<ClientRole>,
}

impl AccessContext {
    /// Identity of the caller; only absent on public procedures
    pub fn identity(&self) -> Result<&Identity, AccessError> {
        self.identity
            .as_ref()
            .ok_or_else(|| AccessError::Unauthorized("authentication required".to_string()))
    }

    /// Resolved client; elevated callers may reach a scoped procedure without one
    pub fn client_id(&self) -> Result<ClientId, AccessError> {
        self.client_id
            .ok_or_else(|| AccessError::Forbidden("client ID required".to_string()))
    }

    pub fn is_elevated(&self) -> bool {
        self.identity.as_ref().map(Identity::is_elevated).unwrap_or(false)
    }

    /// Owner/admin within the client, or platform elevated
    pub fn can_manage_members(&self) -> bool {
        self.is_elevated() || self.client_role.map(ClientRole::is_manager).unwrap_or(false)
    }
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("client {0} not found")]
    ClientNotFound(ClientId),

    #[error("access directory error: {0}")]
    Directory(#[from] DatabaseError),
}

/// Pick the client the call is about: the declared input field wins, the
/// request-scoped fallback is only consulted when the input is absent or
/// unparseable.
pub fn resolve_client_id(input: Option<&str>, fallback: Option<&str>) -> Option<ClientId> {
    input
        .and_then(parse_client_id)
        .or_else(|| fallback.and_then(parse_client_id))
}

fn parse_client_id(raw: &str) -> Option<ClientId> {
    raw.trim().parse::<ClientId>().ok().filter(|id| *id > 0)
}

/// Run the access chain for one call
pub async fn authorize(
    policy: AccessPolicy,
    identity: Option<Identity>,
    client_id: Option<ClientId>,
    directory: &dyn AccessDirectory,
) -> Result<AccessContext, AccessError> {
    let mut context = AccessContext {
        identity: None,
        client_id,
        client_role: None,
    };

    let identity = match identity {
        Some(identity) => identity,
        None if policy.requires_identity => {
            return Err(AccessError::Unauthorized("authentication required".to_string()));
        }
        None => return Ok(context),
    };

    let elevated = identity.is_elevated();

    if policy.requires_admin && !elevated {
        tracing::warn!("Admin access denied for user {}", identity.user_id);
        return Err(AccessError::Forbidden("admin access required".to_string()));
    }

    if policy.client_scoped {
        if elevated {
            context.client_role = Some(ClientRole::Owner);
        } else {
            let client_id = client_id.ok_or_else(|| AccessError::Forbidden("client ID required".to_string()))?;

            let role = directory
                .membership_role(identity.user_id, client_id)
                .await?
                .ok_or_else(|| {
                    tracing::warn!("User {} has no membership in client {}", identity.user_id, client_id);
                    AccessError::Forbidden("no access to this client".to_string())
                })?;

            context.client_role = Some(role);
        }
    }

    if policy.requires_editor && !context.client_role.map(ClientRole::can_edit).unwrap_or(false) {
        return Err(AccessError::Forbidden("read-only access".to_string()));
    }

    if policy.requires_premium {
        let bypass = elevated || context.client_role.map(ClientRole::is_manager).unwrap_or(false);
        if !bypass {
            // Non-elevated callers always have a client id by this point
            let client_id = context.client_id()?;
            let tier = directory
                .plan_tier(client_id)
                .await?
                .ok_or(AccessError::ClientNotFound(client_id))?;

            if !tier.is_premium() {
                return Err(AccessError::PreconditionFailed(
                    "this feature requires a Pro or Enterprise plan".to_string(),
                ));
            }
        }
    }

    if policy.requires_mfa {
        if let Some(client_id) = context.client_id {
            if directory.requires_mfa(client_id).await? && !identity.aal.is_elevated() {
                return Err(AccessError::PreconditionFailed(
                    "multi-factor authentication required".to_string(),
                ));
            }
        }
    }

    tracing::debug!(
        "Access granted to user {} (client {:?}, role {:?})",
        identity.user_id,
        context.client_id,
        context.client_role
    );

    context.identity = Some(identity);
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryDirectory;

    const CLIENT: ClientId = 7;
    const OTHER_CLIENT: ClientId = 8;

    fn identity(role: GlobalRole) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            email: "auditor@example.com".to_string(),
            global_role: role,
            aal: Aal::Aal1,
        }
    }

    fn denied(result: Result<AccessContext, AccessError>) -> AccessError {
        match result {
            Ok(ctx) => panic!("expected denial, got {:?}", ctx),
            Err(e) => e,
        }
    }

    #[tokio::test]
    async fn anonymous_call_to_protected_tier_is_unauthorized() {
        let dir = MemoryDirectory::default();
        for policy in [
            AccessPolicy::protected(),
            AccessPolicy::client(),
            AccessPolicy::client_editor(),
            AccessPolicy::premium(),
            AccessPolicy::admin(),
            AccessPolicy::mfa(),
        ] {
            let err = denied(authorize(policy, None, Some(CLIENT), &dir).await);
            assert!(matches!(err, AccessError::Unauthorized(_)), "{:?}", policy);
        }
    }

    #[tokio::test]
    async fn public_tier_admits_anonymous_callers() {
        let dir = MemoryDirectory::default();
        let ctx = authorize(AccessPolicy::public(), None, None, &dir).await.unwrap();
        assert!(ctx.identity.is_none());
        assert!(ctx.client_role.is_none());
    }

    #[tokio::test]
    async fn admin_tier_rejects_regular_users() {
        let dir = MemoryDirectory::default();
        let err = denied(authorize(AccessPolicy::admin(), Some(identity(GlobalRole::User)), None, &dir).await);
        assert!(matches!(err, AccessError::Forbidden(_)));

        let ctx = authorize(AccessPolicy::admin(), Some(identity(GlobalRole::SuperAdmin)), None, &dir)
            .await
            .unwrap();
        assert!(ctx.is_elevated());
    }

    #[tokio::test]
    async fn elevated_identity_is_treated_as_owner_without_membership() {
        let dir = MemoryDirectory::default();
        let ctx = authorize(AccessPolicy::client_editor(), Some(identity(GlobalRole::Admin)), Some(CLIENT), &dir)
            .await
            .unwrap();
        assert_eq!(ctx.client_role, Some(ClientRole::Owner));
        assert_eq!(ctx.client_id, Some(CLIENT));
        assert_eq!(dir.lookups(), 0);
    }

    #[tokio::test]
    async fn missing_client_id_is_forbidden() {
        let dir = MemoryDirectory::default();
        let err = denied(authorize(AccessPolicy::client(), Some(identity(GlobalRole::User)), None, &dir).await);
        match err {
            AccessError::Forbidden(msg) => assert_eq!(msg, "client ID required"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn membership_is_required_for_client_scope() {
        let user = identity(GlobalRole::User);
        let dir = MemoryDirectory::default().with_member(user.user_id, CLIENT, ClientRole::Editor);

        let err = denied(authorize(AccessPolicy::client(), Some(user.clone()), Some(OTHER_CLIENT), &dir).await);
        match err {
            AccessError::Forbidden(msg) => assert_eq!(msg, "no access to this client"),
            other => panic!("unexpected {:?}", other),
        }

        let ctx = authorize(AccessPolicy::client(), Some(user), Some(CLIENT), &dir).await.unwrap();
        assert_eq!(ctx.client_role, Some(ClientRole::Editor));
    }

    #[tokio::test]
    async fn editor_gate_follows_membership_role() {
        for (role, allowed) in [
            (ClientRole::Owner, true),
            (ClientRole::Admin, true),
            (ClientRole::Editor, true),
            (ClientRole::Viewer, false),
        ] {
            let user = identity(GlobalRole::User);
            let dir = MemoryDirectory::default().with_member(user.user_id, CLIENT, role);
            let result = authorize(AccessPolicy::client_editor(), Some(user), Some(CLIENT), &dir).await;
            match (allowed, result) {
                (true, Ok(ctx)) => assert_eq!(ctx.client_role, Some(role)),
                (false, Err(AccessError::Forbidden(msg))) => assert_eq!(msg, "read-only access"),
                (_, other) => panic!("role {:?}: unexpected {:?}", role, other),
            }
        }
    }

    #[tokio::test]
    async fn premium_gate_checks_plan_for_editors_and_viewers() {
        for tier in [PlanTier::Free, PlanTier::Starter] {
            let user = identity(GlobalRole::User);
            let dir = MemoryDirectory::default()
                .with_member(user.user_id, CLIENT, ClientRole::Editor)
                .with_client(CLIENT, tier, false);
            let err = denied(authorize(AccessPolicy::premium(), Some(user), Some(CLIENT), &dir).await);
            assert!(matches!(err, AccessError::PreconditionFailed(_)), "{:?}", tier);
        }

        let user = identity(GlobalRole::User);
        let dir = MemoryDirectory::default()
            .with_member(user.user_id, CLIENT, ClientRole::Viewer)
            .with_client(CLIENT, PlanTier::Pro, false);
        assert!(authorize(AccessPolicy::premium(), Some(user), Some(CLIENT), &dir).await.is_ok());
    }

    #[tokio::test]
    async fn premium_gate_is_bypassed_by_managers_and_elevated() {
        for role in [ClientRole::Owner, ClientRole::Admin] {
            let user = identity(GlobalRole::User);
            let dir = MemoryDirectory::default()
                .with_member(user.user_id, CLIENT, role)
                .with_client(CLIENT, PlanTier::Free, false);
            assert!(authorize(AccessPolicy::premium(), Some(user), Some(CLIENT), &dir).await.is_ok());
        }

        let dir = MemoryDirectory::default().with_client(CLIENT, PlanTier::Free, false);
        assert!(authorize(AccessPolicy::premium(), Some(identity(GlobalRole::Admin)), Some(CLIENT), &dir)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn premium_gate_reports_missing_client() {
        let user = identity(GlobalRole::User);
        let dir = MemoryDirectory::default().with_member(user.user_id, CLIENT, ClientRole::Editor);
        let err = denied(authorize(AccessPolicy::premium(), Some(user), Some(CLIENT), &dir).await);
        assert!(matches!(err, AccessError::ClientNotFound(CLIENT)));
    }

    #[tokio::test]
    async fn editor_member_reaches_editor_procedure() {
        let user = identity(GlobalRole::User);
        let dir = MemoryDirectory::default()
            .with_member(user.user_id, CLIENT, ClientRole::Editor)
            .with_client(CLIENT, PlanTier::Free, false);

        let ctx = authorize(AccessPolicy::client_editor(), Some(user.clone()), Some(CLIENT), &dir)
            .await
            .unwrap();
        assert_eq!(ctx.identity, Some(user.clone()));

        let err = denied(authorize(AccessPolicy::client_editor(), Some(user), Some(OTHER_CLIENT), &dir).await);
        assert!(matches!(err, AccessError::Forbidden(_)));
    }

    #[tokio::test]
    async fn mfa_gate_requires_aal2_when_client_mandates_it() {
        let mut user = identity(GlobalRole::User);
        let dir = MemoryDirectory::default()
            .with_member(user.user_id, CLIENT, ClientRole::Owner)
            .with_client(CLIENT, PlanTier::Enterprise, true);

        let err = denied(authorize(AccessPolicy::mfa(), Some(user.clone()), Some(CLIENT), &dir).await);
        assert!(matches!(err, AccessError::PreconditionFailed(_)));

        user.aal = Aal::Aal2;
        assert!(authorize(AccessPolicy::mfa(), Some(user), Some(CLIENT), &dir).await.is_ok());
    }

    #[tokio::test]
    async fn mfa_gate_is_open_when_not_mandated() {
        let user = identity(GlobalRole::User);
        let dir = MemoryDirectory::default()
            .with_member(user.user_id, CLIENT, ClientRole::Viewer)
            .with_client(CLIENT, PlanTier::Free, false);
        assert!(authorize(AccessPolicy::mfa(), Some(user), Some(CLIENT), &dir).await.is_ok());
    }

    #[tokio::test]
    async fn editor_check_runs_before_mfa_check() {
        let user = identity(GlobalRole::User);
        let dir = MemoryDirectory::default()
            .with_member(user.user_id, CLIENT, ClientRole::Viewer)
            .with_client(CLIENT, PlanTier::Free, true);
        let err = denied(authorize(AccessPolicy::client_editor().with_mfa(), Some(user), Some(CLIENT), &dir).await);
        assert!(matches!(err, AccessError::Forbidden(_)));
    }

    #[test]
    fn client_id_prefers_declared_input() {
        assert_eq!(resolve_client_id(Some("12"), Some("99")), Some(12));
        assert_eq!(resolve_client_id(None, Some("99")), Some(99));
        assert_eq!(resolve_client_id(Some("abc"), Some("99")), Some(99));
        assert_eq!(resolve_client_id(Some("0"), None), None);
        assert_eq!(resolve_client_id(None, None), None);
    }

    #[test]
    fn combinators_imply_client_scope() {
        let policy = AccessPolicy::protected().with_mfa();
        assert!(policy.client_scoped);
        assert!(policy.requires_identity);
        assert!(!policy.requires_editor);

        let stacked = AccessPolicy::client_editor().with_mfa();
        assert!(stacked.requires_editor && stacked.requires_mfa);
    }
}
