mod common;
mod temp_file;
