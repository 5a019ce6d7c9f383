// src/config.rs

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, time::Duration};

use crate::{
    db::{RbacRepository, UserRepository},
    services::{AccessService, PermissionService, RoleService},
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub user_repo: UserRepository,
    pub rbac_repo: RbacRepository,
    pub access_service: AccessService,
    pub permission_service: PermissionService,
    pub role_service: RoleService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")?;

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("database connection established");

        // Wire the dependency graph.
        let user_repo = UserRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let access_service = AccessService::new(user_repo.clone(), rbac_repo.clone());
        let permission_service = PermissionService::new(rbac_repo.clone(), db_pool.clone());
        let role_service = RoleService::new(rbac_repo.clone(), user_repo.clone(), db_pool.clone());

        Ok(Self {
            db_pool,
            jwt_secret,
            user_repo,
            rbac_repo,
            access_service,
            permission_service,
            role_service,
        })
    }

    pub fn bind_addr() -> String {
        env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
    }
}
