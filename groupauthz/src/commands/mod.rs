pub mod check;
pub mod db;
