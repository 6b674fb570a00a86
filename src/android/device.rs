use super::{adb, env::Env};
use std::{
    fmt::{self, Display},
    path::PathBuf,
    time::Duration,
};

pub use super::adb::install::InstallError;

/// Device classes advertised through `ro.build.characteristics`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HardwareFeature {
    Watch,
    Embedded,
    Tv,
}

impl HardwareFeature {
    pub fn characteristic(self) -> &'static str {
        match self {
            Self::Watch => "watch",
            Self::Embedded => "embedded",
            Self::Tv => "tv",
        }
    }
}

/// What installing needs from a device.
pub trait DeviceConnection {
    fn serial_no(&self) -> &str;

    fn supports_feature(&self, feature: HardwareFeature) -> bool;

    /// Installs `apks` as a single package, failing the whole lot if any of
    /// them fails.
    fn install_packages(
        &self,
        apks: &[PathBuf],
        reinstall: bool,
        options: &[String],
        timeout: Duration,
    ) -> Result<(), InstallError>;
}

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Device {
    serial_no: String,
    model: String,
    characteristics: Vec<String>,
}

impl Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.model, self.serial_no)
    }
}

impl Device {
    pub(super) fn new(serial_no: String, model: String, characteristics: &str) -> Self {
        Self {
            serial_no,
            model,
            characteristics: characteristics
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
        }
    }

    pub fn serial_no(&self) -> &str {
        &self.serial_no
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn characteristics(&self) -> &[String] {
        &self.characteristics
    }

    pub fn supports_feature(&self, feature: HardwareFeature) -> bool {
        self.characteristics
            .iter()
            .any(|c| c == feature.characteristic())
    }

    pub fn connect<'a>(&'a self, env: &'a Env) -> AdbConnection<'a> {
        AdbConnection { device: self, env }
    }
}

/// A [`Device`] reached through the `adb` binary.
#[derive(Debug)]
pub struct AdbConnection<'a> {
    device: &'a Device,
    env: &'a Env,
}

impl<'a> DeviceConnection for AdbConnection<'a> {
    fn serial_no(&self) -> &str {
        self.device.serial_no()
    }

    fn supports_feature(&self, feature: HardwareFeature) -> bool {
        self.device.supports_feature(feature)
    }

    fn install_packages(
        &self,
        apks: &[PathBuf],
        reinstall: bool,
        options: &[String],
        timeout: Duration,
    ) -> Result<(), InstallError> {
        adb::install_multiple(
            self.env,
            self.device.serial_no(),
            apks,
            reinstall,
            options,
            timeout,
        )
    }
}
