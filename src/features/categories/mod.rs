//! Product category hierarchy feature.
//!
//! Categories form a tree: every row carries its depth (`level`) and a
//! materialized `path` of ancestor names, both derived from the `parent_id`
//! chain. The service layer keeps those materializations consistent across
//! creates, renames, re-parenting moves and deletes.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/categories` | Create a category |
//! | GET | `/api/categories` | List all categories (flat) |
//! | GET | `/api/categories/hierarchy` | Nested tree, optionally depth-bounded |
//! | GET | `/api/categories/search` | Fuzzy search with breadcrumbs |
//! | GET | `/api/categories/{id}` | Get a category |
//! | PATCH | `/api/categories/{id}` | Update name/description |
//! | PUT | `/api/categories/{id}/parent` | Move to a new parent |
//! | DELETE | `/api/categories/{id}` | Delete (blocked while children exist) |
//! | GET | `/api/categories/{id}/children` | Direct children |
//! | GET | `/api/categories/{id}/path` | Ancestor chain, root first |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod resolver;
pub mod routes;
pub mod services;
pub mod stores;

pub use resolver::PathResolver;
pub use services::HierarchyService;
