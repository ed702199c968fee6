pub mod blog_service;
pub mod catalog_service;
pub mod file_keys;
pub mod file_validation;
pub mod memory_store;
pub mod object_store;
pub mod quiz_service;
pub mod r2_store;
pub mod resource_service;
