// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every route here runs behind `jwt_auth_middleware`; handlers receive the
// caller as an `AuthUser` extension and leave ownership checks to the services.

pub mod projects;

pub use projects::*;
