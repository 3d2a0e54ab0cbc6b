pub mod metadata;
pub mod progress;
pub mod record;
pub mod upload_file;
