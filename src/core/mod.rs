pub mod align;
pub mod bandpass;
pub mod cache;
pub mod compression;
pub mod constants;
pub mod error;
pub mod format;
pub mod outlier;
pub mod parser;
pub mod series;
pub mod store;
pub mod window;
