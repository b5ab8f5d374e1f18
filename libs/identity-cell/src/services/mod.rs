// libs/identity-cell/src/services/mod.rs
pub mod account;
pub mod password;
