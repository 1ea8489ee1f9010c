//! Customer accounts: Customer bounded context.
//!
//! Responsible for registration, email-address confirmation, email-address
//! changes and deletion of customer accounts, each expressed as events on
//! the customer's stream.

pub mod application;
pub mod domain;
