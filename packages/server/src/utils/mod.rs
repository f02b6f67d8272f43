pub mod filename;
pub mod response;
