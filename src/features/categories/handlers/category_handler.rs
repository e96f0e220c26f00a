use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::categories::dtos::{
    CategoryNodeDto, CategoryResponseDto, CreateCategoryDto, MoveCategoryDto, SearchResultDto,
    UpdateCategoryDto,
};
use crate::features::categories::models::Category;
use crate::features::categories::services::HierarchyService;
use crate::shared::types::{ApiResponse, Meta};

/// Query params for the hierarchy endpoint
#[derive(Debug, Deserialize, IntoParams)]
pub struct HierarchyQuery {
    /// Root the response at this category; omit for all roots
    pub root: Option<Uuid>,
    /// Cap nesting at this many levels to bound response size
    pub max_depth: Option<u32>,
}

/// Query params for category search
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    pub q: String,
}

async fn to_response_dtos(
    service: &HierarchyService,
    categories: Vec<Category>,
) -> Result<Vec<CategoryResponseDto>> {
    let ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();
    let counts = service.child_counts(&ids).await?;

    Ok(categories
        .into_iter()
        .map(|c| {
            let count = counts.get(&c.id).copied().unwrap_or(0);
            CategoryResponseDto::from_category(c, count)
        })
        .collect())
}

/// Create a category
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryDto,
    responses(
        (status = 200, description = "Category created", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Validation error or depth limit exceeded"),
        (status = 404, description = "Parent not found")
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(service): State<Arc<HierarchyService>>,
    AppJson(dto): AppJson<CreateCategoryDto>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let category = service
        .create(dto.parent_id, &dto.name, dto.description.as_deref())
        .await?;
    let response = CategoryResponseDto::from_category(category, 0);

    Ok(Json(ApiResponse::success(
        Some(response),
        Some("Category created".to_string()),
        None,
    )))
}

/// List all categories as a flat, path-ordered list
#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "List of categories", body = ApiResponse<Vec<CategoryResponseDto>>),
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(service): State<Arc<HierarchyService>>,
) -> Result<Json<ApiResponse<Vec<CategoryResponseDto>>>> {
    let categories = service.list().await?;
    let total = categories.len() as i64;
    let response = to_response_dtos(&service, categories).await?;

    Ok(Json(ApiResponse::success(
        Some(response),
        None,
        Some(Meta { total }),
    )))
}

/// Get a category by id
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<CategoryResponseDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(service): State<Arc<HierarchyService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let category = service.get(id).await?;
    let count = service.child_count(id).await?;

    Ok(Json(ApiResponse::success(
        Some(CategoryResponseDto::from_category(category, count)),
        None,
        None,
    )))
}

/// Update a category's name/description
#[utoipa::path(
    patch,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = UpdateCategoryDto,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(service): State<Arc<HierarchyService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateCategoryDto>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let category = service
        .update(id, &dto.name, dto.description.as_deref())
        .await?;
    let count = service.child_count(id).await?;

    Ok(Json(ApiResponse::success(
        Some(CategoryResponseDto::from_category(category, count)),
        Some("Category updated".to_string()),
        None,
    )))
}

/// Move a category under a new parent (or to the root)
#[utoipa::path(
    put,
    path = "/api/categories/{id}/parent",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = MoveCategoryDto,
    responses(
        (status = 200, description = "Category moved", body = ApiResponse<CategoryResponseDto>),
        (status = 404, description = "Category or parent not found"),
        (status = 409, description = "Move would create a cycle")
    ),
    tag = "categories"
)]
pub async fn move_category(
    State(service): State<Arc<HierarchyService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<MoveCategoryDto>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    service.move_to(id, dto.parent_id).await?;

    let category = service.get(id).await?;
    let count = service.child_count(id).await?;

    Ok(Json(ApiResponse::success(
        Some(CategoryResponseDto::from_category(category, count)),
        Some("Category moved".to_string()),
        None,
    )))
}

/// Delete a childless category
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category still has children")
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(service): State<Arc<HierarchyService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(id).await?;

    Ok(Json(ApiResponse::success(
        None,
        Some("Category deleted".to_string()),
        None,
    )))
}

/// List a category's direct children
#[utoipa::path(
    get,
    path = "/api/categories/{id}/children",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Direct children", body = ApiResponse<Vec<CategoryResponseDto>>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn list_children(
    State(service): State<Arc<HierarchyService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<CategoryResponseDto>>>> {
    let children = service.get_children(Some(id)).await?;
    let total = children.len() as i64;
    let response = to_response_dtos(&service, children).await?;

    Ok(Json(ApiResponse::success(
        Some(response),
        None,
        Some(Meta { total }),
    )))
}

/// Get the ancestor chain of a category, root first
#[utoipa::path(
    get,
    path = "/api/categories/{id}/path",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Ancestor chain", body = ApiResponse<Vec<CategoryResponseDto>>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category_path(
    State(service): State<Arc<HierarchyService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<CategoryResponseDto>>>> {
    let chain = service.get_path(id).await?;
    let response = to_response_dtos(&service, chain).await?;

    Ok(Json(ApiResponse::success(Some(response), None, None)))
}

/// Get the nested category hierarchy
#[utoipa::path(
    get,
    path = "/api/categories/hierarchy",
    params(HierarchyQuery),
    responses(
        (status = 200, description = "Nested hierarchy", body = ApiResponse<Vec<CategoryNodeDto>>),
        (status = 404, description = "Root category not found")
    ),
    tag = "categories"
)]
pub async fn get_hierarchy(
    State(service): State<Arc<HierarchyService>>,
    Query(query): Query<HierarchyQuery>,
) -> Result<Json<ApiResponse<Vec<CategoryNodeDto>>>> {
    let nodes = service.get_hierarchy(query.root, query.max_depth).await?;
    let response: Vec<CategoryNodeDto> = nodes.iter().map(CategoryNodeDto::from_node).collect();

    Ok(Json(ApiResponse::success(Some(response), None, None)))
}

/// Search categories by name, path or description
#[utoipa::path(
    get,
    path = "/api/categories/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Scored matches with breadcrumbs", body = ApiResponse<Vec<SearchResultDto>>),
    ),
    tag = "categories"
)]
pub async fn search_categories(
    State(service): State<Arc<HierarchyService>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<SearchResultDto>>>> {
    let matches = service.search(&query.q).await?;
    let total = matches.len() as i64;
    let response: Vec<SearchResultDto> = matches.into_iter().map(Into::into).collect();

    Ok(Json(ApiResponse::success(
        Some(response),
        None,
        Some(Meta { total }),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::HierarchyConfig;
    use crate::features::categories::routes;
    use crate::features::categories::stores::InMemoryCategoryStore;
    use axum_test::TestServer;
    use serde_json::json;

    fn test_server() -> TestServer {
        let service = Arc::new(HierarchyService::new(
            Arc::new(InMemoryCategoryStore::new()),
            HierarchyConfig::default(),
        ));
        TestServer::new(routes::routes(service)).unwrap()
    }

    async fn create(server: &TestServer, parent_id: Option<Uuid>, name: &str) -> CategoryResponseDto {
        let response = server
            .post("/api/categories")
            .json(&json!({ "parent_id": parent_id, "name": name }))
            .await;
        response.assert_status_ok();
        response
            .json::<ApiResponse<CategoryResponseDto>>()
            .data
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_category() {
        let server = test_server();

        let root = create(&server, None, "Electronics").await;
        assert_eq!(root.level, 0);
        assert_eq!(root.path, "Electronics");

        let child = create(&server, Some(root.id), "Phones").await;
        assert_eq!(child.level, 1);
        assert_eq!(child.path, "Electronics > Phones");

        let response = server
            .get(&format!("/api/categories/{}", root.id))
            .await;
        response.assert_status_ok();
        let fetched = response
            .json::<ApiResponse<CategoryResponseDto>>()
            .data
            .unwrap();
        assert_eq!(fetched.children_count, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let server = test_server();

        let response = server
            .post("/api/categories")
            .json(&json!({ "name": "" }))
            .await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_move_cycle_returns_conflict() {
        let server = test_server();
        let root = create(&server, None, "Root").await;
        let child = create(&server, Some(root.id), "Child").await;

        let response = server
            .put(&format!("/api/categories/{}/parent", root.id))
            .json(&json!({ "parent_id": child.id }))
            .await;
        assert_eq!(response.status_code(), 409);
    }

    #[tokio::test]
    async fn test_delete_blocked_while_children_exist() {
        let server = test_server();
        let root = create(&server, None, "Root").await;
        let child = create(&server, Some(root.id), "Child").await;

        let response = server.delete(&format!("/api/categories/{}", root.id)).await;
        assert_eq!(response.status_code(), 409);

        server
            .delete(&format!("/api/categories/{}", child.id))
            .await
            .assert_status_ok();
        server
            .delete(&format!("/api/categories/{}", root.id))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_hierarchy_and_path_endpoints() {
        let server = test_server();
        let root = create(&server, None, "Root").await;
        let mid = create(&server, Some(root.id), "Mid").await;
        let leaf = create(&server, Some(mid.id), "Leaf").await;

        let response = server.get("/api/categories/hierarchy").await;
        response.assert_status_ok();
        let nodes = response
            .json::<ApiResponse<Vec<CategoryNodeDto>>>()
            .data
            .unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].children[0].children[0].category.id, leaf.id);

        let response = server
            .get(&format!("/api/categories/{}/path", leaf.id))
            .await;
        response.assert_status_ok();
        let chain = response
            .json::<ApiResponse<Vec<CategoryResponseDto>>>()
            .data
            .unwrap();
        let names: Vec<&str> = chain.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Root", "Mid", "Leaf"]);
    }

    #[tokio::test]
    async fn test_search_endpoint_annotates_matches() {
        let server = test_server();
        let parts = create(&server, None, "Parts").await;
        create(&server, Some(parts.id), "Engine").await;
        create(&server, Some(parts.id), "Suspension").await;

        let response = server.get("/api/categories/search?q=eng").await;
        response.assert_status_ok();
        let results = response
            .json::<ApiResponse<Vec<SearchResultDto>>>()
            .data
            .unwrap();
        assert_eq!(results[0].name, "Engine");
        assert_eq!(results[0].ancestors, vec!["Parts".to_string()]);
    }
}
