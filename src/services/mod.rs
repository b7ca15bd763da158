pub mod azure_blob;
pub mod catalog_service;
pub mod object_store;
pub mod sas;
