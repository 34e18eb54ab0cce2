//! Role lookups and role-set synchronization

use folio_core::{resolve_slugs, Result, Role, RoleRepository, RoleSlug, UserId};
use std::sync::Arc;

/// True iff any held role is in `required`
pub fn intersects(held: &[Role], required: &[RoleSlug]) -> bool {
    held.iter().any(|role| required.contains(&role.slug))
}

#[derive(Clone)]
pub struct RoleService {
    roles: Arc<dyn RoleRepository>,
}

impl RoleService {
    pub fn new(roles: Arc<dyn RoleRepository>) -> Self {
        Self { roles }
    }

    /// Roles assigned to the principal. No roles is not an error.
    pub async fn roles_for_principal(&self, user_id: UserId) -> Result<Vec<Role>> {
        self.roles.roles_for_user(user_id).await
    }

    pub async fn has_any_role(&self, user_id: UserId, required: &[RoleSlug]) -> Result<bool> {
        if required.is_empty() {
            return Ok(false);
        }
        let held = self.roles.roles_for_user(user_id).await?;
        Ok(intersects(&held, required))
    }

    /// Replace the principal's roles with the resolvable subset of `slugs`.
    ///
    /// Unknown slugs are dropped silently. An empty list clears every role.
    pub async fn sync_roles<S: AsRef<str>>(
        &self,
        user_id: UserId,
        slugs: &[S],
    ) -> Result<Vec<RoleSlug>> {
        let resolved = resolve_slugs(slugs.iter().map(AsRef::as_ref));
        self.roles.replace_user_roles(user_id, &resolved).await?;

        tracing::debug!(user_id, roles = ?resolved, "Synchronized roles");
        Ok(resolved)
    }
}
