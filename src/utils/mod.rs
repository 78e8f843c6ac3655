pub mod error;
pub mod jwt;
pub mod logging;
pub mod swagger_doc;
