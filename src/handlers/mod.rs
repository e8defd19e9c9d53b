pub mod health_handlers;
pub mod responder;
pub mod stream_handlers;
pub mod url_handlers;
