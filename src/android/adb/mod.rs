pub mod device_list;
pub mod get_prop;
pub mod install;

pub use self::{device_list::device_list, get_prop::get_prop, install::install_multiple};

use super::env::Env;
use crate::{env::ExplicitEnv as _, util::cli::Report};
use std::{ffi::OsString, process::Output, string::FromUtf8Error};
use thiserror::Error;

/// `adb` with nothing but our explicit environment.
pub fn adb_pure<U>(env: &Env, args: U) -> duct::Expression
where
    U: IntoIterator,
    U::Item: Into<OsString>,
{
    duct::cmd(env.adb_path(), args).full_env(env.explicit_env())
}

/// `adb`, talking to the device with this serial. Tack the rest of the
/// arguments on with `before_spawn`.
pub fn adb(env: &Env, serial_no: &str) -> duct::Expression {
    adb_pure(env, ["-s", serial_no])
}

#[derive(Debug, Error)]
pub enum RunCheckedError {
    #[error(transparent)]
    InvalidUtf8(#[from] FromUtf8Error),
    #[error("This device doesn't yet trust this computer. On the device, you should see a prompt like \"Allow USB debugging?\". Pressing \"Allow\" should fix this.")]
    Unauthorized,
    #[error("`adb` exited with {status}: {stderr}")]
    CommandFailed {
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RunCheckedError {
    pub fn report(&self, msg: &str) -> Report {
        match self {
            Self::Unauthorized => Report::action_request(msg, self),
            _ => Report::error(msg, self),
        }
    }
}

fn check_authorized(output: &Output) -> Result<String, RunCheckedError> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("device unauthorized") {
            return Err(RunCheckedError::Unauthorized);
        }
        return Err(RunCheckedError::CommandFailed {
            status: output.status,
            stderr: stderr.trim().to_owned(),
        });
    }
    let stdout = String::from_utf8(output.stdout.clone())?.trim().to_string();
    Ok(stdout)
}

/// Runs `expr` to completion and hands back its trimmed stdout.
fn run_checked(expr: duct::Expression) -> Result<String, RunCheckedError> {
    let output = expr
        .stdin_null()
        .stdout_capture()
        .stderr_capture()
        .unchecked()
        .run()?;
    check_authorized(&output)
}
