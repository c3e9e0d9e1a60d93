//! Application layer: the checkout flow.
//!
//! `PaymentInitiator` opens a payment with the gateway, `StatusPoller` follows
//! it to a terminal status on a background `tokio` task, and `PaymentModal`
//! ties both to the user-facing state machine. `Checkout` opens modals that
//! share one configuration.

pub mod checkout;
pub mod initiator;
pub mod modal;
pub mod poller;
