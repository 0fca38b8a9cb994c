// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Simple REST API server example for the debt ledger.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `GET /debts` - List debts, newest first (`?paid=true|false` filters by status)
//! - `POST /debts` - Create a debt
//! - `GET /debts/search?q=` - Case-insensitive name search
//! - `GET /debts/{id}` - Get a debt with its payments
//! - `PATCH /debts/{id}` - Rename and/or re-baseline a debt
//! - `DELETE /debts/{id}` - Delete a debt without payments
//! - `GET /debts/{id}/payments` - A debt's payments, newest first
//! - `POST /debts/{id}/payments` - Apply a payment
//! - `GET /payments` - Recent payments (`?limit=`)
//! - `GET /payments/{id}` - Get a payment
//! - `DELETE /payments/{id}` - Delete a payment and restore the balance
//! - `GET /statistics/debts` - Debt aggregates
//! - `GET /statistics/payments` - Payment aggregates
//!
//! ## Example Usage
//!
//! ```bash
//! # Create a debt
//! curl -X POST http://localhost:3000/debts \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Personal Loan", "initialAmount": "50000.00"}'
//!
//! # Pay part of it
//! curl -X POST http://localhost:3000/debts/<id>/payments \
//!   -H "Content-Type: application/json" \
//!   -d '{"amount": "15000.00", "description": "First installment"}'
//!
//! # Statistics
//! curl http://localhost:3000/statistics/debts
//! ```

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use debt_ledger::{
    Debt, DebtId, DebtPatch, DebtStatistics, LedgerError, MemoryStore, Payment, PaymentId,
    PaymentStatistics, ValidationErrors, ledger,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// === Request/Response DTOs ===

/// Request body for creating debts.
///
/// ```json
/// {"name": "Personal Loan", "initialAmount": "50000.00"}
/// ```
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDebtRequest {
    pub name: String,
    pub initial_amount: Decimal,
}

/// Request body for applying payments.
#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub paid: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

// === Application State ===

/// Shared application state containing the debt store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
}

// === Error Handling ===

/// Wrapper for converting `LedgerError` into HTTP responses.
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, fields) = match self.0 {
            LedgerError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "validation failed".to_string(),
                Some(fields),
            ),
            err @ LedgerError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string(), None)
            }
            err @ LedgerError::Conflict(_) => {
                (StatusCode::CONFLICT, "CONFLICT", err.to_string(), None)
            }
            LedgerError::Internal(detail) => {
                error!(detail = %detail, "internal ledger error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "an unexpected error occurred".to_string(),
                    None,
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                code: code.to_string(),
                fields,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, AppError>;

// === Debt Handlers ===

/// GET /debts - List debts, optionally by paid status.
async fn list_debts(
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<Json<Vec<Debt>>> {
    let debts = match filter.paid {
        Some(is_paid) => ledger::debts_by_status(&*state.store, is_paid)?,
        None => ledger::list_debts(&*state.store)?,
    };
    Ok(Json(debts))
}

/// POST /debts - Create a new debt.
async fn create_debt(
    State(state): State<AppState>,
    Json(request): Json<CreateDebtRequest>,
) -> ApiResult<(StatusCode, Json<Debt>)> {
    let debt = ledger::create_debt(&*state.store, &request.name, request.initial_amount)?;
    Ok((StatusCode::CREATED, Json(debt)))
}

/// GET /debts/search?q= - Search debts by name.
async fn search_debts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Debt>>> {
    Ok(Json(ledger::search_debts(&*state.store, &query.q)?))
}

/// GET /debts/{id} - Get a debt by ID.
async fn get_debt(
    State(state): State<AppState>,
    Path(id): Path<DebtId>,
) -> ApiResult<Json<Debt>> {
    Ok(Json(ledger::get_debt(&*state.store, id)?))
}

/// PATCH /debts/{id} - Update a debt's name and/or initial amount.
async fn update_debt(
    State(state): State<AppState>,
    Path(id): Path<DebtId>,
    Json(patch): Json<DebtPatch>,
) -> ApiResult<Json<Debt>> {
    Ok(Json(ledger::update_debt(&*state.store, id, patch)?))
}

/// DELETE /debts/{id} - Delete a debt with no payments.
async fn delete_debt(
    State(state): State<AppState>,
    Path(id): Path<DebtId>,
) -> ApiResult<StatusCode> {
    ledger::delete_debt(&*state.store, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// === Payment Handlers ===

/// GET /debts/{id}/payments - A debt's payments.
async fn debt_payments(
    State(state): State<AppState>,
    Path(id): Path<DebtId>,
) -> ApiResult<Json<Vec<Payment>>> {
    Ok(Json(ledger::payments_for_debt(&*state.store, id)?))
}

/// POST /debts/{id}/payments - Apply a payment to a debt.
async fn apply_payment(
    State(state): State<AppState>,
    Path(id): Path<DebtId>,
    Json(request): Json<PaymentRequest>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    let payment = ledger::apply_payment(
        &*state.store,
        id,
        request.amount,
        request.description.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// GET /payments - Most recent payments across all debts.
async fn recent_payments(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Json<Vec<Payment>>> {
    let limit = query.limit.unwrap_or(ledger::DEFAULT_RECENT_LIMIT);
    Ok(Json(ledger::recent_payments(&*state.store, limit)?))
}

/// GET /payments/{id} - Get a payment by ID.
async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<PaymentId>,
) -> ApiResult<Json<Payment>> {
    Ok(Json(ledger::get_payment(&*state.store, id)?))
}

/// DELETE /payments/{id} - Delete a payment.
async fn delete_payment(
    State(state): State<AppState>,
    Path(id): Path<PaymentId>,
) -> ApiResult<StatusCode> {
    ledger::delete_payment(&*state.store, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// === Statistics Handlers ===

async fn debt_statistics(State(state): State<AppState>) -> ApiResult<Json<DebtStatistics>> {
    Ok(Json(ledger::debt_statistics(&*state.store)?))
}

async fn payment_statistics(State(state): State<AppState>) -> ApiResult<Json<PaymentStatistics>> {
    Ok(Json(ledger::payment_statistics(&*state.store)?))
}

// === Router ===

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/debts", get(list_debts).post(create_debt))
        .route("/debts/search", get(search_debts))
        .route(
            "/debts/{id}",
            get(get_debt).patch(update_debt).delete(delete_debt),
        )
        .route("/debts/{id}/payments", get(debt_payments).post(apply_payment))
        .route("/payments", get(recent_payments))
        .route("/payments/{id}", get(get_payment).delete(delete_payment))
        .route("/statistics/debts", get(debt_statistics))
        .route("/statistics/payments", get(payment_statistics))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let state = AppState {
        store: Arc::new(MemoryStore::new()),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    info!(addr = %listener.local_addr()?, "debt ledger API server running");

    axum::serve(listener, app).await?;
    Ok(())
}
