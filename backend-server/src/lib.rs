pub mod api;
pub mod error;
pub mod middleware;
pub mod proxy;
pub mod state;
pub mod utils;
