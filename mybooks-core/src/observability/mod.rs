pub mod logging;
pub mod request_context;

pub use logging::init_tracing;
pub use request_context::{new_request_id, TracedClientExt, TracedRequest, REQUEST_ID_HEADER};
