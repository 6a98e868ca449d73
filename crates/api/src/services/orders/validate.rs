//! Order submission checks.
//!
//! Checks run in a fixed order and stop at the first failure, each with its
//! own client-visible reason:
//!
//! 1. a submission was posted at all
//! 2. shipping address line 1, city, state and postal code are present
//! 3. the purchase order decodes to a PDF under the size limit
//! 4. the shipping option exists
//! 5. every submitted amount has at most two decimal places and fits the
//!    money columns
//! 6. line totals plus shipping equal the order total, exactly
//! 7. every line has a positive quantity and a non-negative total
//! 8. the caller's account exists
//!
//! Nothing is written by this module.

use tracing::instrument;

use rockland_core::{AccountId, Amount};

use super::OrderError;
use super::pdf::{PdfError, decode_purchase_order};
use crate::db::{AccountStore, CatalogStore};
use crate::models::{Account, OrderLineSubmission, OrderSubmission, ShippingAddress, ShippingOption};

/// Client-correctable reasons an order is refused.
#[derive(Debug, thiserror::Error)]
pub enum OrderRejection {
    #[error("Invalid order data.")]
    InvalidData,

    #[error("Shipping address is required.")]
    MissingShippingAddress,

    #[error("Invalid purchase order file.")]
    InvalidPurchaseOrder(#[source] PdfError),

    #[error("A valid shipping option is required.")]
    InvalidShippingOption,

    #[error("Order amounts must be valid currency values.")]
    InvalidAmount,

    #[error("Order total does not match the expected amount.")]
    TotalMismatch { expected: Amount, submitted: Amount },

    #[error("Order details must have a positive quantity and a non-negative total.")]
    InvalidLineItem,

    #[error("Order contains an unknown product.")]
    UnknownProduct,
}

/// A submission that passed every check, with its references resolved.
#[derive(Debug, Clone)]
pub struct ValidatedOrder {
    pub account: Account,
    pub shipping_option: ShippingOption,
    pub shipping_address: ShippingAddress,
    pub purchase_order_pdf: Vec<u8>,
    pub details: Vec<OrderLineSubmission>,
    pub order_total: Amount,
}

/// Runs the submission checks against the catalog and account store.
pub struct OrderValidator<'a, S: ?Sized> {
    store: &'a S,
    file_size_limit: usize,
}

impl<'a, S: AccountStore + CatalogStore + ?Sized> OrderValidator<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, file_size_limit: usize) -> Self {
        Self {
            store,
            file_size_limit,
        }
    }

    /// Validate `submission` on behalf of `account_id`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Rejected` for the first failed check,
    /// `OrderError::UnknownAccount` if the caller no longer exists, and
    /// `OrderError::Repository` if a lookup fails.
    #[instrument(skip(self, submission))]
    pub async fn validate(
        &self,
        submission: Option<OrderSubmission>,
        account_id: AccountId,
    ) -> Result<ValidatedOrder, OrderError> {
        let submission = submission.ok_or(OrderRejection::InvalidData)?;

        let shipping_address = shipping_address(&submission)?;

        let purchase_order_pdf =
            decode_purchase_order(submission.purchase_order_pdf.as_deref(), self.file_size_limit)
                .map_err(OrderRejection::InvalidPurchaseOrder)?;

        let shipping_option = match submission.shipping_option_id {
            Some(id) => self.store.shipping_option(id).await?,
            None => None,
        }
        .ok_or(OrderRejection::InvalidShippingOption)?;

        if !submission.order_total.fits_money_column()
            || submission
                .details
                .iter()
                .any(|line| !line.total_price.fits_money_column())
        {
            return Err(OrderRejection::InvalidAmount.into());
        }

        let expected = expected_total(&submission.details, shipping_option.amount);
        if expected != Some(submission.order_total) {
            return Err(OrderRejection::TotalMismatch {
                expected: expected.unwrap_or_default(),
                submitted: submission.order_total,
            }
            .into());
        }

        if submission
            .details
            .iter()
            .any(|line| line.quantity < 1 || line.total_price.is_negative())
        {
            return Err(OrderRejection::InvalidLineItem.into());
        }

        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(OrderError::UnknownAccount(account_id))?;

        Ok(ValidatedOrder {
            account,
            shipping_option,
            shipping_address,
            purchase_order_pdf,
            details: submission.details,
            order_total: submission.order_total,
        })
    }
}

fn shipping_address(submission: &OrderSubmission) -> Result<ShippingAddress, OrderRejection> {
    fn required(value: Option<&str>) -> Result<String, OrderRejection> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or(OrderRejection::MissingShippingAddress)
    }

    Ok(ShippingAddress {
        address1: required(submission.shipping_address1.as_deref())?,
        address2: submission
            .shipping_address2
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        city: required(submission.shipping_city.as_deref())?,
        state: required(submission.shipping_state.as_deref())?,
        postal_code: required(submission.shipping_postal_code.as_deref())?,
    })
}

/// Sum of line totals plus shipping; `None` if the sum overflows.
fn expected_total(details: &[OrderLineSubmission], shipping: Amount) -> Option<Amount> {
    details
        .iter()
        .try_fold(shipping, |acc, line| acc.checked_add(line.total_price))
}
