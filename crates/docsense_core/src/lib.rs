pub mod db;
pub mod error;
pub mod logging;
pub mod settings;
