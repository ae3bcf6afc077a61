pub mod handlers;
pub mod routes;
pub mod upload_extractor;

pub use handlers::*;
pub use routes::*;
