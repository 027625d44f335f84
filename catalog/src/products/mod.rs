pub mod catalog_service;
pub mod product_models;
pub mod product_operations;
