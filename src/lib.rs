pub mod collector;
pub mod db;
pub mod kalman;
pub mod parse;
pub mod port;
pub mod reading;
pub mod schema;
