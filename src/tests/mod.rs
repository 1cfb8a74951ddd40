pub mod common;

mod token_issuance;
