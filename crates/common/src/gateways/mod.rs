//! External data gateways
//!
//! Wrappers for the three third-party data APIs. Each gateway owns its
//! HTTP client, performs no retries, and degrades failure to a neutral
//! value (empty list, absent record, zero count) instead of propagating.

pub mod estate;
pub mod places;
pub mod population;
