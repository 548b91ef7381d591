//! Domain models for mail entities

mod address;

pub use address::{EmailAddress, parse_address_list};
