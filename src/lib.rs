#![deny(unsafe_code)]

pub mod android;
pub mod config;
pub mod device;
pub mod env;
pub mod opts;
pub mod util;

pub static NAME: &str = "split-deploy";
