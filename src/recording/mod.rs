//! Pass-through to the video conferencing / recording provider used by the CMS.

pub mod client;
pub mod routes;
