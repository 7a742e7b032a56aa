pub mod log;
pub mod s3;
