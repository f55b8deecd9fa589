//! Payment confirmation route.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use crate::http::error::ApiResult;
use crate::http::server::AppState;
use crate::payments::{
    LedgerEntry, PaymentCheckRequest, PaymentCheckResponse, PaymentError, RecentPaymentsQuery,
};

/// POST /api/check-payment
///
/// Always answers 200; failures are reported in the body.
pub async fn check_payment(
    State(state): State<AppState>,
    body: Result<Json<PaymentCheckRequest>, JsonRejection>,
) -> Json<PaymentCheckResponse> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Malformed payment check");
            return Json(PaymentCheckResponse::failed("Failed to check payment"));
        }
    };

    let config = state.config.load_full();
    match state.payments.check(&config.payments, &request).await {
        Ok(Some(matched)) => Json(matched.into()),
        Ok(None) => Json(PaymentCheckResponse::not_found()),
        Err(e) => {
            tracing::error!(error = %e, "Payment check failed");
            Json(PaymentCheckResponse::failed(e.client_message()))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecentPaymentsResponse {
    pub payments: Vec<LedgerEntry>,
}

/// GET /api/payments/recent
///
/// Newest ledger entries first, with their redemption state.
pub async fn recent_payments(
    State(state): State<AppState>,
    Query(query): Query<RecentPaymentsQuery>,
) -> ApiResult<Json<RecentPaymentsResponse>> {
    let payments = state
        .store
        .recent_payments(query.limit())
        .await
        .map_err(PaymentError::from)?;
    Ok(Json(RecentPaymentsResponse {
        payments: payments.into_iter().map(LedgerEntry::from).collect(),
    }))
}
