// handlers/public/root.rs - GET / handler

use axum::response::Json;
use serde_json::{json, Value};

pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Showcase API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Student project submission and review service",
            "endpoints": {
                "health": "/health (public)",
                "projects": "/api/projects/:id (protected)",
                "submit": "/api/users/:owner_id/projects (protected, multipart)",
                "review": "/api/admin/projects/:id/review (admin)",
                "reviews": "/api/admin/projects/:id/reviews (admin)",
            }
        }
    }))
}
