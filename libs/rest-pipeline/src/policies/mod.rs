//! Built-in request policies
//!
//! ## Available Policies
//!
//! - [`ClientRequestIdPolicy`] - Tags requests with a correlation id
//! - [`UserAgentPolicy`] - Adds User-Agent header to requests
//! - [`RedirectPolicy`] - Follows 3xx redirects without HTTPS downgrades
//! - [`RpRegistrationPolicy`] - Registers missing resource providers and replays
//! - [`ExponentialRetryPolicy`] - Retries with exponential backoff and jitter
//! - [`SystemErrorRetryPolicy`] - Same, but fatal on well-known socket errors
//! - [`LogPolicy`] - Logs request lines and response statuses

mod client_request_id;
mod log;
mod redirect;
mod retry;
mod rp_registration;
#[cfg(test)]
mod stub;
mod system_error_retry;
mod user_agent;

pub use client_request_id::{ClientRequestIdPolicy, ClientRequestIdPolicyFactory};
pub use log::{LogPolicy, LogPolicyFactory};
pub use redirect::{RedirectPolicy, RedirectPolicyFactory};
pub use retry::{ExponentialRetryPolicy, ExponentialRetryPolicyFactory, is_retryable_status};
pub use rp_registration::{
    MISSING_REGISTRATION_CODE, RpRegistrationPolicy, RpRegistrationPolicyFactory,
    missing_registration_provider, subscription_url_prefix,
};
pub use system_error_retry::{
    NON_RETRYABLE_SYSTEM_CODES, SystemErrorRetryPolicy, SystemErrorRetryPolicyFactory,
    is_retryable_system_error,
};
pub use user_agent::{UserAgentPolicy, UserAgentPolicyFactory};
