// handlers/elevated/admin/mod.rs - Project review handlers

pub mod review; // POST /api/admin/projects/:id/review
pub mod reviews; // GET /api/admin/projects/:id/reviews

pub use review::project_review;
pub use reviews::project_reviews;
