pub mod access;
pub use access::AccessService;
pub mod bootstrap;
pub mod permission_service;
pub use permission_service::PermissionService;
pub mod role_service;
pub use role_service::RoleService;
