use crate::util::cli::{Report, Reportable};
use std::{
    ffi::OsStr,
    fmt::{self, Debug, Display},
};

pub trait ExplicitEnv: Debug {
    fn explicit_env(&self) -> Vec<(&str, &OsStr)>;
}

#[derive(Debug)]
pub enum Error {
    HomeNotSet(std::env::VarError),
    PathNotSet(std::env::VarError),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HomeNotSet(err) => write!(
                f,
                "The `HOME` environment variable isn't set, and adb needs it to find its keys: {}",
                err
            ),
            Self::PathNotSet(err) => write!(
                f,
                "The `PATH` environment variable isn't set, which is super weird: {}",
                err
            ),
        }
    }
}

impl std::error::Error for Error {}

impl Reportable for Error {
    fn report(&self) -> Report {
        Report::error("Failed to initialize base environment", self)
    }
}

/// The environment variables forwarded to the tools we run. Everything else
/// is left behind.
#[derive(Debug)]
pub struct Env {
    home: String,
    path: String,
    term: Option<String>,
    adb_server_port: Option<String>,
    adb_vendor_keys: Option<String>,
    system_root: Option<String>,
}

impl Env {
    pub fn new() -> Result<Self, Error> {
        let home = std::env::var("HOME").map_err(Error::HomeNotSet)?;
        let path = std::env::var("PATH").map_err(Error::PathNotSet)?;
        let term = std::env::var("TERM").ok();
        let adb_server_port = std::env::var("ANDROID_ADB_SERVER_PORT").ok();
        let adb_vendor_keys = std::env::var("ADB_VENDOR_KEYS").ok();
        // Windows won't start much of anything without it.
        let system_root = std::env::var("SYSTEMROOT").ok();
        Ok(Self {
            home,
            path,
            term,
            adb_server_port,
            adb_vendor_keys,
            system_root,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl ExplicitEnv for Env {
    fn explicit_env(&self) -> Vec<(&str, &std::ffi::OsStr)> {
        let mut env = vec![("HOME", self.home.as_ref()), ("PATH", self.path.as_ref())];
        if let Some(term) = self.term.as_ref() {
            env.push(("TERM", term.as_ref()));
        }
        if let Some(port) = self.adb_server_port.as_ref() {
            env.push(("ANDROID_ADB_SERVER_PORT", port.as_ref()));
        }
        if let Some(keys) = self.adb_vendor_keys.as_ref() {
            env.push(("ADB_VENDOR_KEYS", keys.as_ref()));
        }
        if let Some(system_root) = self.system_root.as_ref() {
            env.push(("SYSTEMROOT", system_root.as_ref()));
        }
        env
    }
}
