use super::{adb, run_checked, RunCheckedError};
use crate::{
    android::env::Env,
    util::cli::{Report, Reportable},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Failed to run `adb shell getprop {prop}`: {source}")]
pub struct Error {
    prop: String,
    source: RunCheckedError,
}

impl Reportable for Error {
    fn report(&self) -> Report {
        self.source
            .report(&format!("Failed to run `adb shell getprop {}`", self.prop))
    }
}

pub fn get_prop(env: &Env, serial_no: &str, prop: &str) -> Result<String, Error> {
    let prop_ = prop.to_string();
    run_checked(adb(env, serial_no).before_spawn(move |cmd| {
        cmd.args(["shell", "getprop", prop_.as_str()]);
        Ok(())
    }))
    .map_err(|source| Error {
        prop: prop.to_owned(),
        source,
    })
}
