pub mod adb;
pub mod build_info;
#[cfg(feature = "cli")]
pub mod cli;
pub mod deploy;
pub mod device;
pub mod env;
