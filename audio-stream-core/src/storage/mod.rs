pub mod cache_dir;
pub mod capture_file;
