//! Entity Module

pub mod account;
pub mod account_change;
pub mod principal;
pub mod role;
