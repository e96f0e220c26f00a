use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::categories::models::{Category, CategoryNode};
use crate::features::picker::search::SearchMatch;

/// Request DTO for creating a category
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryDto {
    /// Omit for a root category
    pub parent_id: Option<Uuid>,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Request DTO for updating name/description (never structure)
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Request DTO for re-parenting a category
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MoveCategoryDto {
    /// Omit (or null) to make the category a root
    pub parent_id: Option<Uuid>,
}

/// Response DTO for a category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponseDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub level: i32,
    pub path: String,
    pub children_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryResponseDto {
    pub fn from_category(c: Category, children_count: i64) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            parent_id: c.parent_id,
            level: c.level,
            path: c.path,
            children_count,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Response DTO for a nested hierarchy node
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(no_recursion)]
pub struct CategoryNodeDto {
    pub category: CategoryResponseDto,
    pub children: Vec<CategoryNodeDto>,
}

impl CategoryNodeDto {
    pub fn from_node(node: &CategoryNode) -> Self {
        Self {
            category: CategoryResponseDto::from_category(
                node.category.clone(),
                node.children_count,
            ),
            children: node.children.iter().map(Self::from_node).collect(),
        }
    }
}

/// Response DTO for one search hit
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResultDto {
    pub id: Uuid,
    pub name: String,
    pub level: i32,
    pub path: Option<String>,
    pub score: f64,
    /// Ancestor names, root first, for breadcrumb display
    pub ancestors: Vec<String>,
    /// Matched field with `<mark>` around the matched span
    pub highlighted: String,
}

impl From<SearchMatch> for SearchResultDto {
    fn from(m: SearchMatch) -> Self {
        Self {
            id: m.id,
            name: m.name,
            level: m.level,
            path: m.path,
            score: m.score,
            ancestors: m.ancestors,
            highlighted: m.highlighted,
        }
    }
}
