//! Order submission: validation, then a transactional write.

mod pdf;
mod validate;
mod writer;

pub use pdf::{PDF_SIGNATURE, PdfError, check_purchase_order, decode_purchase_order};
pub use validate::{OrderRejection, OrderValidator, ValidatedOrder};
pub use writer::OrderWriter;

use thiserror::Error;

use rockland_core::AccountId;

use crate::db::{AccountStore, CatalogStore, OrderStore, RepositoryError};
use crate::models::{OrderSubmission, UserOrder};

/// Errors from creating an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The submission failed a check; the message is safe to show.
    #[error(transparent)]
    Rejected(#[from] OrderRejection),

    /// The token's subject no longer resolves to an account.
    #[error("account {0} not found")]
    UnknownAccount(AccountId),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Validate `submission` for `account_id` and persist it.
///
/// # Errors
///
/// See [`OrderValidator::validate`] and [`OrderWriter::write`].
pub async fn create_order<S>(
    store: &S,
    submission: Option<OrderSubmission>,
    account_id: AccountId,
    file_size_limit: usize,
) -> Result<UserOrder, OrderError>
where
    S: AccountStore + CatalogStore + OrderStore + ?Sized,
{
    let validated = OrderValidator::new(store, file_size_limit)
        .validate(submission, account_id)
        .await?;
    OrderWriter::new(store).write(validated).await
}
