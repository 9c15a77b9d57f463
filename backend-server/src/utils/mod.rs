pub mod cookies;
pub mod cors;
