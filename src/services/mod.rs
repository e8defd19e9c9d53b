pub mod catalog;
pub mod local_store;
pub mod memory_store;
pub mod object_store;
pub mod range;
pub mod s3_store;
pub mod streaming_service;
pub mod url_signer;
