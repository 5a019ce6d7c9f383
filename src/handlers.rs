pub mod rbac;
pub mod users;
