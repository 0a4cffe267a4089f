// Core infrastructure modules
pub mod config;
pub mod core;
pub mod retry;

// Feature-specific modules
pub mod record;
pub mod seed;
pub mod stream;

#[cfg(test)]
mod test_utils;
