// Imgate on-demand image transcoding gateway library

pub mod config;
pub mod constants;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod proxy;
pub mod transcoder;
