use crate::{
    env::{Env as CoreEnv, Error as CoreError, ExplicitEnv},
    util::cli::{Report, Reportable},
};
use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
};

#[derive(Debug)]
pub enum Error {
    CoreEnvError(CoreError),
    AdbNotFound(which::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoreEnvError(err) => write!(f, "{}", err),
            Self::AdbNotFound(err) => write!(
                f,
                "Have you installed the Android SDK? Neither `ANDROID_SDK_ROOT` nor `ANDROID_HOME` point to an SDK with `platform-tools/adb`, and `adb` isn't on your `PATH`: {}",
                err
            ),
        }
    }
}

impl std::error::Error for Error {}

impl Reportable for Error {
    fn report(&self) -> Report {
        match self {
            Self::CoreEnvError(err) => err.report(),
            Self::AdbNotFound(_) => Report::action_request(
                "Failed to initialize Android environment",
                self,
            ),
        }
    }
}

fn sdk_adb(sdk_root: &Path) -> Option<PathBuf> {
    let adb = sdk_root
        .join("platform-tools")
        .join(format!("adb{}", std::env::consts::EXE_SUFFIX));
    if adb.is_file() {
        Some(adb)
    } else {
        None
    }
}

#[derive(Debug)]
pub struct Env {
    pub base: CoreEnv,
    sdk_root: Option<PathBuf>,
    adb: PathBuf,
}

impl Env {
    pub fn new() -> Result<Self, Error> {
        let base = CoreEnv::new().map_err(Error::CoreEnvError)?;
        let sdk_root = std::env::var("ANDROID_SDK_ROOT")
            .ok()
            .map(PathBuf::from)
            .filter(|sdk_root| sdk_root.is_dir())
            .or_else(|| {
                let android_home = std::env::var("ANDROID_HOME")
                    .ok()
                    .map(PathBuf::from)
                    .filter(|android_home| android_home.is_dir());
                if android_home.is_some() {
                    log::warn!("`ANDROID_SDK_ROOT` isn't set; falling back to `ANDROID_HOME`, which is deprecated");
                }
                android_home
            });
        let adb = match sdk_root.as_deref().and_then(sdk_adb) {
            Some(adb) => adb,
            None => {
                log::info!("no SDK `adb` found; looking for `adb` on `PATH`");
                which::which_in("adb", Some(base.path()), ".").map_err(Error::AdbNotFound)?
            }
        };
        log::info!("using adb at {:?}", adb);
        Ok(Self {
            base,
            sdk_root,
            adb,
        })
    }

    pub fn adb_path(&self) -> &Path {
        &self.adb
    }
}

impl ExplicitEnv for Env {
    fn explicit_env(&self) -> Vec<(&str, &std::ffi::OsStr)> {
        let mut envs = self.base.explicit_env();
        if let Some(sdk_root) = self.sdk_root.as_ref() {
            envs.push(("ANDROID_SDK_ROOT", sdk_root.as_ref()));
        }
        envs
    }
}
