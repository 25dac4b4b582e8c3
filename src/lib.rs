// src/lib.rs

//! modwatch: Steam Workshop update monitor library

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
