//! Order submission.

use axum::{body::Bytes, extract::State};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::OrderSubmission;
use crate::services::orders::create_order;
use crate::state::AppState;

/// Validate and persist an order for the authenticated account.
///
/// The body is parsed here rather than by the `Json` extractor so that an
/// empty, `null` or malformed body is rejected with the same 400 as any
/// other invalid order.
#[instrument(skip(state, account, body), fields(account_id = %account.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    body: Bytes,
) -> Result<String> {
    let submission = parse_submission(&body);
    let context = submission
        .as_ref()
        .map(|s| (s.shipping_option_id, s.order_total, s.details.len()));

    let order = create_order(
        state.storage(),
        submission,
        account.id,
        state.config().file_size_limit,
    )
    .await
    .map_err(|e| {
        let err = AppError::from(e);
        if matches!(err, AppError::Internal { .. })
            && let Some((shipping_option_id, order_total, lines)) = context
        {
            tracing::error!(
                error = %err,
                account_id = %account.id,
                shipping_option_id = ?shipping_option_id,
                order_total = %order_total,
                lines,
                "Order creation failed"
            );
        }
        err
    })?;

    Ok(format!("Order {} created successfully.", order.id))
}

fn parse_submission(body: &[u8]) -> Option<OrderSubmission> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    serde_json::from_slice::<Option<OrderSubmission>>(body)
        .map_err(|e| tracing::debug!(error = %e, "Unparseable order body"))
        .ok()
        .flatten()
}
