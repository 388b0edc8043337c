//! Menu API Handlers

use axum::extract::{Path, State};
use serde::Deserialize;

use crate::api::extract::AppQuery;
use crate::core::ServerState;
use crate::services::MenuItem;
use crate::services::catalog::{Category, ChoiceGroup, Variant};
use crate::utils::{ApiResponse, AppResult, ok};

#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    pub category: Option<String>,
}

pub async fn categories(State(state): State<ServerState>) -> AppResult<ApiResponse<Vec<Category>>> {
    Ok(ok(state.catalog.list_categories()))
}

pub async fn items(
    State(state): State<ServerState>,
    AppQuery(query): AppQuery<ItemsQuery>,
) -> AppResult<ApiResponse<Vec<MenuItem>>> {
    Ok(ok(state.catalog.list_menu_items(query.category.as_deref())))
}

pub async fn variants(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<Variant>>> {
    Ok(ok(state.catalog.list_variants(&id)?))
}

pub async fn choice_groups(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<ChoiceGroup>>> {
    Ok(ok(state.catalog.list_choice_groups(&id)?))
}
