pub mod http;
pub mod ws;

pub use http::HttpBackend;
pub use ws::WsConnector;
