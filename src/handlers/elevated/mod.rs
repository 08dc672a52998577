// handlers/elevated/mod.rs - Elevated handlers (admin role required)
//
// Routes here run behind `jwt_auth_middleware` and then `require_admin`.

pub mod admin;

pub use admin::*;
