pub mod file;
pub mod temp_file;
