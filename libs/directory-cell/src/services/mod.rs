// libs/directory-cell/src/services/mod.rs
pub mod directory;
