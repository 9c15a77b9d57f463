pub mod controller;
pub mod gateway_client;
pub mod page;
pub mod routing;
