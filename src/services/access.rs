// src/services/access.rs

use std::collections::HashSet;

use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::{RbacRepository, UserRepository};
use crate::models::auth::User;
use crate::models::rbac::{Role, permission_slug};

/// A user's resolved role plus its granted permission slugs, loaded once per
/// request. All checks on it are pure.
#[derive(Debug, Clone)]
pub struct AccessProfile {
    pub role: Role,
    pub granted: HashSet<String>,
}

impl AccessProfile {
    // A deactivated role grants nothing, admin console included.
    pub fn grants(&self, slug: &str) -> bool {
        self.role.is_active && self.granted.contains(slug)
    }

    pub fn grants_any(&self, slugs: &[&str]) -> bool {
        slugs.iter().any(|slug| self.grants(slug))
    }

    pub fn grants_resource(&self, resource: &str, action: &str) -> bool {
        self.grants(&permission_slug(resource, action))
    }

    /// The admin-console shortcut. Tagged on the role at creation time,
    /// independent of the granular permission set.
    pub fn is_admin(&self) -> bool {
        self.role.is_active && self.role.is_admin_role
    }
}

// Read-only permission resolution consumed by the route guards. Permission
// denial is a `false` return, never an error; only storage failures err.
#[derive(Clone)]
pub struct AccessService {
    user_repo: UserRepository,
    rbac_repo: RbacRepository,
}

impl AccessService {
    pub fn new(user_repo: UserRepository, rbac_repo: RbacRepository) -> Self {
        Self {
            user_repo,
            rbac_repo,
        }
    }

    /// Loads the access profile for an already-resolved user. `None` when the
    /// user has no role assigned (or the role row is gone).
    async fn profile_for(&self, user: &User) -> Result<Option<AccessProfile>, AppError> {
        let Some(role_id) = user.role_id else {
            return Ok(None);
        };

        let Some(role) = self.rbac_repo.find_role_by_id(self.pool(), role_id).await? else {
            return Ok(None);
        };

        let granted = self
            .rbac_repo
            .granted_slugs(self.pool(), role.id)
            .await?
            .into_iter()
            .collect();

        Ok(Some(AccessProfile { role, granted }))
    }

    pub async fn has_permission(&self, user_id: Uuid, slug: &str) -> Result<bool, AppError> {
        Ok(self
            .profile_of(user_id)
            .await?
            .is_some_and(|p| p.grants(slug)))
    }

    pub async fn has_any_permission(
        &self,
        user_id: Uuid,
        slugs: &[&str],
    ) -> Result<bool, AppError> {
        Ok(self
            .profile_of(user_id)
            .await?
            .is_some_and(|p| p.grants_any(slugs)))
    }

    pub async fn has_resource_permission(
        &self,
        user_id: Uuid,
        resource: &str,
        action: &str,
    ) -> Result<bool, AppError> {
        Ok(self
            .profile_of(user_id)
            .await?
            .is_some_and(|p| p.grants_resource(resource, action)))
    }

    pub async fn is_admin(&self, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .profile_of(user_id)
            .await?
            .is_some_and(|p| p.is_admin()))
    }

    // Unknown user resolves to no profile, so every check comes back false.
    async fn profile_of(&self, user_id: Uuid) -> Result<Option<AccessProfile>, AppError> {
        match self.user_repo.find_by_id(user_id).await? {
            Some(user) => self.profile_for(&user).await,
            None => Ok(None),
        }
    }

    fn pool(&self) -> &sqlx::PgPool {
        self.rbac_repo.pool()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn role(is_active: bool, is_admin_role: bool) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: "Editor".into(),
            slug: "editor".into(),
            description: None,
            permissions: vec![],
            is_active,
            is_system: false,
            is_admin_role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn profile(role: Role, slugs: &[&str]) -> AccessProfile {
        AccessProfile {
            role,
            granted: slugs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn grants_only_listed_slugs() {
        let p = profile(role(true, false), &["posts.read", "posts.publish"]);
        assert!(p.grants("posts.publish"));
        assert!(!p.grants("posts.delete"));
        assert!(!p.grants("nonexistent.slug"));
    }

    #[test]
    fn empty_grant_set_denies_everything() {
        let p = profile(role(true, false), &[]);
        assert!(!p.grants("posts.read"));
        assert!(!p.grants_any(&["posts.read", "comments.read"]));
    }

    #[test]
    fn inactive_role_grants_nothing() {
        let p = profile(role(false, true), &["posts.read"]);
        assert!(!p.grants("posts.read"));
        assert!(!p.is_admin());
    }

    #[test]
    fn grants_any_needs_a_single_match() {
        let p = profile(role(true, false), &["comments.moderate"]);
        assert!(p.grants_any(&["posts.delete", "comments.moderate"]));
        assert!(!p.grants_any(&["posts.delete", "tags.delete"]));
    }

    #[test]
    fn resource_action_composes_the_slug() {
        let p = profile(role(true, false), &["posts.publish"]);
        assert!(p.grants_resource("posts", "publish"));
        assert!(!p.grants_resource("posts", "feature"));
    }

    #[test]
    fn admin_flag_is_independent_of_granted_permissions() {
        // An admin role with zero grants still opens the admin console but
        // fails every granular check.
        let p = profile(role(true, true), &[]);
        assert!(p.is_admin());
        assert!(!p.grants("posts.read"));

        // And a fully-granted non-admin role never becomes admin.
        let p = profile(role(true, false), &["admin.access", "users.manage_roles"]);
        assert!(!p.is_admin());
    }

    #[test]
    fn revocation_round_trip() {
        let r = role(true, false);
        let with = profile(r.clone(), &["posts.publish"]);
        let without = profile(r, &[]);
        assert!(with.grants("posts.publish"));
        assert!(!without.grants("posts.publish"));
    }
}
