use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use crate::access::{AccessDirectory, ClientId, ClientRole, PlanTier};
use crate::database::DatabaseError;

/// In-memory access directory for exercising the access chain
#[derive(Default)]
pub struct MemoryDirectory {
    members: HashMap<(Uuid, ClientId), ClientRole>,
    clients: HashMap<ClientId, (PlanTier, bool)>,
    lookups: AtomicUsize,
}

impl MemoryDirectory {
    pub fn with_member(mut self, user_id: Uuid, client_id: ClientId, role: ClientRole) -> Self {
        self.members.insert((user_id, client_id), role);
        self
    }

    pub fn with_client(mut self, client_id: ClientId, tier: PlanTier, require_mfa: bool) -> Self {
        self.clients.insert(client_id, (tier, require_mfa));
        self
    }

    /// Number of directory calls made so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessDirectory for MemoryDirectory {
    async fn membership_role(&self, user_id: Uuid, client_id: ClientId) -> Result<Option<ClientRole>, DatabaseError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.members.get(&(user_id, client_id)).copied())
    }

    async fn plan_tier(&self, client_id: ClientId) -> Result<Option<PlanTier>, DatabaseError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.clients.get(&client_id).map(|(tier, _)| *tier))
    }

    async fn requires_mfa(&self, client_id: ClientId) -> Result<bool, DatabaseError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.clients.get(&client_id).map(|(_, mfa)| *mfa).unwrap_or(false))
    }
}
