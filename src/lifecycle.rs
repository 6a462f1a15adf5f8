//! Order status lifecycle.
//!
//! The status sequence is a progress ordering for display. Admins may write
//! any status directly; only quote issuance and quote acceptance move the
//! status as a side effect of another operation.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{QuoteStatus, RequestType},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    #[serde(rename = "In Estimating")]
    InEstimating,
    #[serde(rename = "Need Info")]
    NeedInfo,
    #[serde(rename = "Estimate Sent")]
    EstimateSent,
    #[serde(rename = "Payment Received")]
    PaymentReceived,
    #[serde(rename = "In Queue")]
    InQueue,
    #[serde(rename = "In Production")]
    InProduction,
    #[serde(rename = "Ready")]
    Ready,
    #[serde(rename = "Delivered")]
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::InEstimating,
        OrderStatus::NeedInfo,
        OrderStatus::EstimateSent,
        OrderStatus::PaymentReceived,
        OrderStatus::InQueue,
        OrderStatus::InProduction,
        OrderStatus::Ready,
        OrderStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::InEstimating => "In Estimating",
            OrderStatus::NeedInfo => "Need Info",
            OrderStatus::EstimateSent => "Estimate Sent",
            OrderStatus::PaymentReceived => "Payment Received",
            OrderStatus::InQueue => "In Queue",
            OrderStatus::InProduction => "In Production",
            OrderStatus::Ready => "Ready",
            OrderStatus::Delivered => "Delivered",
        }
    }

    /// Zero-based index in the progress sequence.
    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .unwrap_or_default()
    }

    /// Customers may still amend quantity, needed-by and notes before paying.
    pub fn accepts_customer_edits(&self) -> bool {
        matches!(
            self,
            OrderStatus::InEstimating | OrderStatus::NeedInfo | OrderStatus::EstimateSent
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::InvalidInput("Invalid order status".into()))
    }
}

/// Events that move an order's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Created(RequestType),
    QuoteIssued,
    QuoteAccepted,
    AdminSet(OrderStatus),
}

impl Transition {
    pub fn target(&self) -> OrderStatus {
        match self {
            // both request types enter estimating
            Transition::Created(_) => OrderStatus::InEstimating,
            Transition::QuoteIssued => OrderStatus::EstimateSent,
            Transition::QuoteAccepted => OrderStatus::PaymentReceived,
            Transition::AdminSet(status) => *status,
        }
    }
}

/// A quote can be accepted only while it is pending and the order is waiting on it.
pub fn quote_acceptable(order_status: OrderStatus, quote_status: QuoteStatus) -> bool {
    order_status == OrderStatus::EstimateSent && quote_status == QuoteStatus::Pending
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip_through_display_names() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn serde_uses_display_names() {
        let json = serde_json::to_string(&OrderStatus::PaymentReceived).unwrap();
        assert_eq!(json, "\"Payment Received\"");
    }

    #[test]
    fn creation_always_starts_in_estimating() {
        assert_eq!(
            Transition::Created(RequestType::Estimate).target(),
            OrderStatus::InEstimating
        );
        assert_eq!(
            Transition::Created(RequestType::Reorder).target(),
            OrderStatus::InEstimating
        );
    }

    #[test]
    fn quote_transitions_force_their_status_and_admin_sets_are_verbatim() {
        assert_eq!(Transition::QuoteIssued.target(), OrderStatus::EstimateSent);
        assert_eq!(Transition::QuoteAccepted.target(), OrderStatus::PaymentReceived);
        for status in OrderStatus::ALL {
            assert_eq!(Transition::AdminSet(status).target(), status);
        }
    }

    #[test]
    fn progress_ordering_matches_sequence() {
        assert_eq!(OrderStatus::InEstimating.position(), 0);
        assert_eq!(OrderStatus::Delivered.position(), 7);
        assert!(OrderStatus::EstimateSent.accepts_customer_edits());
        assert!(!OrderStatus::PaymentReceived.accepts_customer_edits());
    }

    #[test]
    fn quote_acceptance_requires_pending_quote_and_sent_estimate() {
        assert!(quote_acceptable(OrderStatus::EstimateSent, QuoteStatus::Pending));
        assert!(!quote_acceptable(OrderStatus::EstimateSent, QuoteStatus::Superseded));
        assert!(!quote_acceptable(OrderStatus::InQueue, QuoteStatus::Pending));
    }
}
