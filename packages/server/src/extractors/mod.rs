pub mod path;
pub mod session;
