pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
