pub mod api;
pub mod common;
pub mod db;
pub mod memory;
pub mod mongodb;
pub mod store;
