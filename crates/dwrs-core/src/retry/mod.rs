//! Deciding whether a failed attempt is repeated.
//!
//! [`failure_class`] turns an attempt error into the class a failed transfer
//! reports. [`RetryPolicy::next_delay`] looks only at that class and at the
//! attempts already spent. The 416 and forced-restart rules live in the
//! transfer unit, which runs them before consulting the policy.

mod classify;
mod error;
mod policy;

pub use classify::failure_class;
pub use error::AttemptError;
pub use policy::RetryPolicy;
