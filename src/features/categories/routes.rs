use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};

use crate::features::categories::handlers;
use crate::features::categories::services::HierarchyService;

/// Create routes for the categories feature
pub fn routes(service: Arc<HierarchyService>) -> Router {
    Router::new()
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/api/categories/hierarchy", get(handlers::get_hierarchy))
        .route("/api/categories/search", get(handlers::search_categories))
        .route(
            "/api/categories/{id}",
            get(handlers::get_category)
                .patch(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route("/api/categories/{id}/parent", put(handlers::move_category))
        .route(
            "/api/categories/{id}/children",
            get(handlers::list_children),
        )
        .route("/api/categories/{id}/path", get(handlers::get_category_path))
        .with_state(service)
}
