pub mod db;
pub mod errors;
pub mod hasher;
pub mod helpers;
pub mod kv;
