// handlers/protected/projects/mod.rs - Project submission handlers

pub mod create; // POST /api/users/:owner_id/projects
pub mod delete; // DELETE /api/projects/:id
pub mod multipart; // shared multipart decoding
pub mod show; // GET /api/projects/:id
pub mod update; // PUT /api/projects/:id

pub use create::project_create;
pub use delete::project_delete;
pub use show::project_show;
pub use update::project_update;
