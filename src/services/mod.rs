pub mod conversion_service;
pub mod converter;
pub mod remote_store;
