pub mod logging;
pub mod span;

pub use logging::init_tracing;
pub use span::http_request_span;
