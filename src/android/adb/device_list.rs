use super::{adb_pure, get_prop, run_checked, RunCheckedError};
use crate::{
    android::{device::Device, env::Env},
    util::cli::{Report, Reportable},
};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to run `adb devices`: {0}")]
    DevicesFailed(#[from] RunCheckedError),
    #[error(transparent)]
    ModelFailed(get_prop::Error),
    #[error(transparent)]
    CharacteristicsFailed(get_prop::Error),
}

impl Reportable for Error {
    fn report(&self) -> Report {
        match self {
            Self::DevicesFailed(err) => err.report("Failed to run `adb devices`"),
            Self::ModelFailed(err) | Self::CharacteristicsFailed(err) => err.report(),
        }
    }
}

#[derive(Debug, Default, Eq, PartialEq)]
struct Serials {
    ready: Vec<String>,
    unauthorized: Vec<String>,
}

fn parse_serials(raw_list: &str) -> Serials {
    let mut serials = Serials::default();
    for line in raw_list.lines() {
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some(serial_no), Some("device")) => serials.ready.push(serial_no.to_owned()),
            (Some(serial_no), Some("unauthorized")) => {
                serials.unauthorized.push(serial_no.to_owned())
            }
            (Some(serial_no), Some(state)) if !line.starts_with("List of devices") => {
                log::info!("skipping device {:?} in state {:?}", serial_no, state)
            }
            _ => (),
        }
    }
    serials
}

pub fn device_list(env: &Env) -> Result<BTreeSet<Device>, Error> {
    let raw_list = run_checked(adb_pure(env, ["devices"]))?;
    let Serials {
        ready,
        unauthorized,
    } = parse_serials(&raw_list);
    for serial_no in &unauthorized {
        log::warn!("device {:?} hasn't authorized this computer yet", serial_no);
    }
    if ready.is_empty() && !unauthorized.is_empty() {
        return Err(Error::DevicesFailed(RunCheckedError::Unauthorized));
    }
    ready
        .into_iter()
        .map(|serial_no| {
            let model =
                get_prop(env, &serial_no, "ro.product.model").map_err(Error::ModelFailed)?;
            let characteristics = get_prop(env, &serial_no, "ro.build.characteristics")
                .map_err(Error::CharacteristicsFailed)?;
            Ok(Device::new(serial_no, model, &characteristics))
        })
        .collect()
}
