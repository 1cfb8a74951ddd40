//! Token broker: issuance, expiry sweep and the issuance endpoint.

pub mod issuer;
pub mod routes;
pub mod sweep;
