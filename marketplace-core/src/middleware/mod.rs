pub mod security_headers;
pub mod telemetry;

pub use security_headers::security_headers_middleware;
pub use telemetry::{render_metrics, install_metrics_recorder, request_id_middleware, request_metrics_middleware, REQUEST_ID_HEADER};
