pub mod api_error;
pub mod data_routes;
pub mod info_routes;
pub mod ws_handler;
