pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod schema;
pub mod store;
pub mod ledger;
pub mod fanout;
pub mod delivery;
pub mod api;
