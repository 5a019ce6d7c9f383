// src/services/bootstrap.rs
//
// Seeds the permission catalog and the default role ladder. Runs at startup
// after migrations and is safe to re-run: existing slugs are left untouched,
// so administrator edits survive a restart.

use sqlx::PgPool;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::RbacRepository;
use crate::models::rbac::permission_slug;

pub struct PermissionSeed {
    pub resource: &'static str,
    pub action: &'static str,
    pub name: &'static str,
}

impl PermissionSeed {
    pub fn slug(&self) -> String {
        permission_slug(self.resource, self.action)
    }
}

pub struct RoleSeed {
    pub name: &'static str,
    pub slug: &'static str,
    pub description: &'static str,
    pub is_admin_role: bool,
}

const fn perm(resource: &'static str, action: &'static str, name: &'static str) -> PermissionSeed {
    PermissionSeed {
        resource,
        action,
        name,
    }
}

/// The fixed permission taxonomy of the blog's back office.
pub fn permission_catalog() -> Vec<PermissionSeed> {
    vec![
        perm("admin", "access", "Access the admin console"),
        perm("admin", "settings", "Manage site settings"),
        perm("users", "read", "View users"),
        perm("users", "create", "Create users"),
        perm("users", "update", "Update users"),
        perm("users", "delete", "Delete users"),
        perm("users", "manage_roles", "Assign roles to users"),
        perm("roles", "read", "View roles"),
        perm("roles", "create", "Create roles"),
        perm("roles", "update", "Update roles"),
        perm("roles", "delete", "Delete roles"),
        perm("permissions", "read", "View permissions"),
        perm("permissions", "create", "Create permissions"),
        perm("permissions", "update", "Update permissions"),
        perm("permissions", "delete", "Delete permissions"),
        perm("posts", "read", "View posts"),
        perm("posts", "create", "Create posts"),
        perm("posts", "update", "Update posts"),
        perm("posts", "delete", "Delete posts"),
        perm("posts", "publish", "Publish posts"),
        perm("posts", "feature", "Feature posts on the homepage"),
        perm("comments", "read", "View comments"),
        perm("comments", "create", "Write comments"),
        perm("comments", "update", "Edit comments"),
        perm("comments", "delete", "Delete comments"),
        perm("comments", "moderate", "Moderate the comment queue"),
        perm("tags", "read", "View tags"),
        perm("tags", "create", "Create tags"),
        perm("tags", "update", "Update tags"),
        perm("tags", "delete", "Delete tags"),
        perm("analytics", "read", "View analytics"),
        perm("analytics", "export", "Export analytics data"),
    ]
}

/// The five built-in roles, all protected from deletion.
pub fn default_roles() -> Vec<RoleSeed> {
    vec![
        RoleSeed {
            name: "Super Admin",
            slug: "super-admin",
            description: "Unrestricted access, including role and permission management",
            is_admin_role: true,
        },
        RoleSeed {
            name: "Admin",
            slug: "admin",
            description: "Full access except role and permission management",
            is_admin_role: true,
        },
        RoleSeed {
            name: "Editor",
            slug: "editor",
            description: "Full control over posts, comments and tags",
            is_admin_role: false,
        },
        RoleSeed {
            name: "Author",
            slug: "author",
            description: "Writes and maintains their own posts",
            is_admin_role: false,
        },
        RoleSeed {
            name: "User",
            slug: "user",
            description: "Reads content and writes comments",
            is_admin_role: false,
        },
    ]
}

/// Granted slugs for one of the default roles, derived from the catalog.
pub fn grants_for(role_slug: &str) -> Vec<String> {
    let catalog = permission_catalog();
    let all = || catalog.iter().map(|p| p.slug());

    match role_slug {
        "super-admin" => all().collect(),
        // Everything except the authorization model itself.
        "admin" => catalog
            .iter()
            .filter(|p| {
                p.resource != "roles"
                    && p.resource != "permissions"
                    && !(p.resource == "users" && p.action == "manage_roles")
            })
            .map(|p| p.slug())
            .collect(),
        "editor" => catalog
            .iter()
            .filter(|p| matches!(p.resource, "posts" | "comments" | "tags"))
            .map(|p| p.slug())
            .collect(),
        "author" => vec![
            "posts.read".into(),
            "posts.create".into(),
            "posts.update".into(),
            "comments.read".into(),
            "comments.create".into(),
            "tags.read".into(),
        ],
        "user" => vec![
            "posts.read".into(),
            "comments.read".into(),
            "comments.create".into(),
            "tags.read".into(),
        ],
        _ => vec![],
    }
}

/// Upserts the catalog and the role ladder. Permissions are inserted only
/// when their slug is new; role grants are written only for freshly created
/// roles, so a customized ladder is never overwritten.
pub async fn run(pool: &PgPool, repo: &RbacRepository) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let mut created_permissions = 0usize;
    for seed in permission_catalog() {
        let inserted = repo
            .insert_permission_if_absent(
                &mut *tx,
                seed.name,
                &seed.slug(),
                None,
                seed.resource,
                seed.action,
            )
            .await?;
        if inserted.is_some() {
            created_permissions += 1;
        }
    }

    let mut created_roles = 0usize;
    for seed in default_roles() {
        let Some(role) = repo
            .insert_role_if_absent(
                &mut *tx,
                seed.name,
                seed.slug,
                Some(seed.description),
                true,
                seed.is_admin_role,
            )
            .await?
        else {
            continue;
        };
        created_roles += 1;

        let slugs = grants_for(seed.slug);
        let permissions = repo.find_permissions_by_slugs(&mut *tx, &slugs).await?;
        let ids: Vec<Uuid> = permissions.iter().map(|p| p.id).collect();

        if !ids.is_empty() {
            repo.grant_permissions(&mut *tx, role.id, &ids).await?;
        }
        repo.refresh_role_slugs(&mut *tx, role.id).await?;
    }

    tx.commit().await?;

    tracing::info!(
        created_permissions,
        created_roles,
        "permission catalog and role ladder seeded"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_slugs_are_unique_and_derived() {
        let catalog = permission_catalog();
        let slugs: HashSet<String> = catalog.iter().map(|p| p.slug()).collect();
        assert_eq!(slugs.len(), catalog.len());

        for p in &catalog {
            assert_eq!(p.slug(), format!("{}.{}", p.resource, p.action));
        }
    }

    #[test]
    fn ladder_has_five_roles_with_two_admins() {
        let roles = default_roles();
        assert_eq!(roles.len(), 5);

        let admins: Vec<_> = roles.iter().filter(|r| r.is_admin_role).collect();
        assert_eq!(admins.len(), 2);
        assert!(admins.iter().any(|r| r.name == "Super Admin"));
        assert!(admins.iter().any(|r| r.name == "Admin"));
    }

    #[test]
    fn super_admin_covers_the_whole_catalog() {
        let all: HashSet<String> = permission_catalog().iter().map(|p| p.slug()).collect();
        let granted: HashSet<String> = grants_for("super-admin").into_iter().collect();
        assert_eq!(granted, all);
    }

    #[test]
    fn admin_cannot_touch_the_authorization_model() {
        let granted = grants_for("admin");
        assert!(granted.iter().all(|s| !s.starts_with("roles.")));
        assert!(granted.iter().all(|s| !s.starts_with("permissions.")));
        assert!(!granted.contains(&"users.manage_roles".to_string()));
        assert!(granted.contains(&"admin.access".to_string()));
        assert!(granted.contains(&"posts.publish".to_string()));
    }

    #[test]
    fn every_granted_slug_exists_in_the_catalog() {
        let all: HashSet<String> = permission_catalog().iter().map(|p| p.slug()).collect();
        for role in default_roles() {
            for slug in grants_for(role.slug) {
                assert!(all.contains(&slug), "unknown slug {slug} for {}", role.name);
            }
        }
    }

    #[test]
    fn reader_role_is_read_only_plus_commenting() {
        let granted = grants_for("user");
        assert!(granted.contains(&"comments.create".to_string()));
        for slug in &granted {
            assert!(
                slug.ends_with(".read") || slug == "comments.create",
                "unexpected grant {slug}"
            );
        }
    }
}
