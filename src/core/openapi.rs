use utoipa::OpenApi;

use crate::features::categories::{dtos as categories_dtos, handlers as categories_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Categories
        categories_handlers::create_category,
        categories_handlers::list_categories,
        categories_handlers::get_category,
        categories_handlers::update_category,
        categories_handlers::move_category,
        categories_handlers::delete_category,
        categories_handlers::list_children,
        categories_handlers::get_category_path,
        categories_handlers::get_hierarchy,
        categories_handlers::search_categories,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Categories
            categories_dtos::CreateCategoryDto,
            categories_dtos::UpdateCategoryDto,
            categories_dtos::MoveCategoryDto,
            categories_dtos::CategoryResponseDto,
            categories_dtos::CategoryNodeDto,
            categories_dtos::SearchResultDto,
            ApiResponse<categories_dtos::CategoryResponseDto>,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            ApiResponse<Vec<categories_dtos::CategoryNodeDto>>,
            ApiResponse<Vec<categories_dtos::SearchResultDto>>,
        )
    ),
    tags(
        (name = "categories", description = "Product category hierarchy"),
    ),
    info(
        title = "Gudang API",
        version = "0.1.0",
        description = "Inventory backend - category hierarchy engine",
    )
)]
pub struct ApiDoc;
