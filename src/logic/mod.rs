pub mod converter;
pub mod notes_service;
pub mod office;
pub mod paths;
pub mod text_pdf;

pub use converter::*;
pub use notes_service::*;
pub use office::*;
pub use paths::*;
pub use text_pdf::*;
