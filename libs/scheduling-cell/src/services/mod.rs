pub mod availability;
pub mod booking;
pub mod slots;
pub mod treatment;
