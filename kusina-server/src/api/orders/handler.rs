//! Order API Handlers
//!
//! Thin wrappers: authorization and state rules live in [`OrdersManager`],
//! remaining-proof staging in [`ProofStaging`].
//!
//! [`OrdersManager`]: crate::orders::OrdersManager
//! [`ProofStaging`]: crate::payments::ProofStaging

use axum::extract::{Multipart, Path, State};
use serde::{Deserialize, Serialize};
use shared::order::filter::{active_matcher, by_last_message_desc, recent_chat_matcher};
use shared::order::{
    Order, OrderDraft, OrderFilter, OrderPatch, OrderType, PaymentStatus, StatusFilter,
    filter_and_sort_orders,
};

use crate::api::extract::{AppJson, AppQuery};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::orders::PendingGate;
use crate::payments::StagedProof;
use crate::utils::error::from_multipart_error;
use crate::utils::time::{parse_date, today};
use crate::utils::{ApiResponse, AppError, AppResult, ok};

/// Named order-list buckets
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Orders in ongoing fulfillment
    Active,
    /// Orders whose last chat message was sent today, most recent chat first
    Recent,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// YYYY-MM-DD, inclusive
    pub from: Option<String>,
    /// YYYY-MM-DD, inclusive
    pub to: Option<String>,
    /// `all` or a status name
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub order_type: Option<String>,
    pub bucket: Option<Bucket>,
    /// Restaurant views only; ignored for customers
    pub customer_id: Option<String>,
}

impl ListQuery {
    fn to_filter(&self) -> AppResult<OrderFilter<'static>> {
        let status = match self.status.as_deref() {
            Some(s) => s.parse::<StatusFilter>().map_err(AppError::validation)?,
            None => StatusFilter::All,
        };
        let order_type = self
            .order_type
            .as_deref()
            .map(str::parse::<OrderType>)
            .transpose()
            .map_err(AppError::validation)?;

        Ok(OrderFilter {
            customer_id: self.customer_id.clone(),
            from_date: self.from.as_deref().map(parse_date).transpose()?,
            to_date: self.to.as_deref().map(parse_date).transpose()?,
            status,
            order_type,
            ..Default::default()
        })
    }
}

/// `customer_id` for the per-customer views; defaults to the caller
#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    pub customer_id: Option<String>,
}

impl CustomerQuery {
    fn resolve(self, user: &CurrentUser) -> String {
        self.customer_id.unwrap_or_else(|| user.id.clone())
    }
}

/// Checkout
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    AppJson(draft): AppJson<OrderDraft>,
) -> AppResult<ApiResponse<Order>> {
    let order = state.orders.create_order(&user, draft)?;
    Ok(ok(order))
}

/// Filtered order list
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> AppResult<ApiResponse<Vec<Order>>> {
    let filter = query.to_filter()?;

    let orders = match query.bucket {
        None => state.orders.list_orders(&user, filter)?,
        Some(Bucket::Active) => state
            .orders
            .list_orders(&user, filter.with_status_matcher(active_matcher()))?,
        Some(Bucket::Recent) => {
            let tz = state.config.business_timezone;
            let visible = state.orders.list_orders(
                &user,
                OrderFilter {
                    customer_id: query.customer_id.clone(),
                    ..Default::default()
                },
            )?;
            let times = state.chat.last_message_times(&visible)?;
            let filter = filter
                .with_status_matcher(recent_chat_matcher(&times, today(tz), tz))
                .with_sort(by_last_message_desc(&times));
            filter_and_sort_orders(&visible, &filter, tz)
                .into_iter()
                .cloned()
                .collect()
        }
    };
    Ok(ok(orders))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Order>> {
    Ok(ok(state.orders.get_order(&user, &id)?))
}

/// Status transitions and field changes
pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    AppJson(patch): AppJson<OrderPatch>,
) -> AppResult<ApiResponse<Order>> {
    Ok(ok(state.orders.update_order(&user, &id, patch)?))
}

pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Order>> {
    Ok(ok(state.orders.cancel_order(&user, &id)?))
}

/// "Confirm & clear": denied -> cancelled, 409 if the order moved on
pub async fn confirm_denial(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Order>> {
    Ok(ok(state.orders.confirm_denial(&user, &id)?))
}

pub async fn payment(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PaymentStatus>> {
    Ok(ok(state.orders.payment_status(&user, &id)?))
}

pub async fn gate(
    State(state): State<ServerState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<CustomerQuery>,
) -> AppResult<ApiResponse<PendingGate>> {
    let customer_id = query.resolve(&user);
    Ok(ok(state.orders.get_active_pending_or_gate(&user, &customer_id)?))
}

pub async fn active(
    State(state): State<ServerState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<CustomerQuery>,
) -> AppResult<ApiResponse<Option<Order>>> {
    let customer_id = query.resolve(&user);
    Ok(ok(state.orders.get_customer_active_order(&user, &customer_id)?))
}

pub async fn active_list(
    State(state): State<ServerState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<CustomerQuery>,
) -> AppResult<ApiResponse<Vec<Order>>> {
    let customer_id = query.resolve(&user);
    Ok(ok(state.orders.get_customer_active_orders(&user, &customer_id)?))
}

pub async fn pre_orders(
    State(state): State<ServerState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<CustomerQuery>,
) -> AppResult<ApiResponse<Vec<Order>>> {
    let customer_id = query.resolve(&user);
    Ok(ok(state.orders.get_customer_pre_orders(&user, &customer_id)?))
}

// ========== Remaining-balance proof ==========

/// Stage the proof image from the `file` multipart field
pub async fn stage_proof(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<StagedProof>> {
    while let Some(field) = multipart.next_field().await.map_err(from_multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("proof").to_string();
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&file_name)
                    .first_or_octet_stream()
                    .to_string()
            });
        let bytes = field.bytes().await.map_err(from_multipart_error)?;

        let staged = state
            .staging
            .stage(&user, &id, &file_name, &content_type, &bytes)?;
        return Ok(ok(staged));
    }

    Err(AppError::validation(
        "No 'file' field found. Field name must be 'file'",
    ))
}

pub async fn get_staged_proof(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Option<StagedProof>>> {
    Ok(ok(state.staging.get_staged(&user, &id)?))
}

#[derive(Debug, Serialize)]
pub struct CancelStagedResponse {
    pub removed: bool,
}

pub async fn cancel_staged_proof(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CancelStagedResponse>> {
    let removed = state.staging.cancel(&user, &id)?;
    Ok(ok(CancelStagedResponse { removed }))
}

/// Upload the staged proof and attach it to the order
pub async fn confirm_proof(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Order>> {
    Ok(ok(state.staging.confirm(&user, &id)?))
}
