use super::printer::ConsolePrinter;
use crate::{
    android::{
        adb::install::install_args,
        build_info::BuildInfo,
        device::{DeviceConnection, HardwareFeature},
    },
    opts::DontKill,
};
use once_cell_regex::{
    exports::regex::{Error as RegexError, Regex},
    regex,
};
use std::{
    fmt::{self, Display},
    path::PathBuf,
    time::Duration,
};

pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Split installs always replace whatever is already there.
pub const REINSTALL: bool = true;

pub const TEST_OK: &str = "-t";
pub const GRANT_PERMISSIONS: &str = "-g";
pub const PARTIAL_INSTALL: &str = "-p";
pub const DONT_KILL: &str = "--dont-kill";

pub fn install_options(embedded: bool, patch_of: Option<&str>, dont_kill: DontKill) -> Vec<String> {
    let mut options = vec![TEST_OK.to_owned()];
    // Embedded devices have no one around to accept permission prompts, and
    // without -g some grants only land after the next reboot.
    if embedded {
        options.push(GRANT_PERMISSIONS.to_owned());
    }
    if let Some(application_id) = patch_of {
        options.push(PARTIAL_INSTALL.to_owned());
        options.push(application_id.to_owned());
    }
    if dont_kill.yes() {
        options.push(DONT_KILL.to_owned());
    }
    options
}

/// The split APKs to install and the `pm install` options to do it with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstallSpec {
    apks: Vec<PathBuf>,
    options: Vec<String>,
}

impl InstallSpec {
    pub fn new(apks: Vec<PathBuf>, options: Vec<String>) -> Self {
        Self { apks, options }
    }

    pub fn for_device(
        device: &dyn DeviceConnection,
        build_info: &BuildInfo,
        dont_kill: DontKill,
    ) -> Self {
        let options = install_options(
            device.supports_feature(HardwareFeature::Embedded),
            if build_info.is_patch_build() {
                Some(build_info.application_id())
            } else {
                None
            },
            dont_kill,
        );
        Self::new(build_info.split_apks(), options)
    }

    pub fn apks(&self) -> &[PathBuf] {
        &self.apks
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// The adb invocation this spec runs, for humans.
    pub fn command_line(&self) -> String {
        install_args(&self.apks, REINSTALL, &self.options)
            .iter()
            .fold(String::from("$ adb"), |mut cmd, arg| {
                cmd.push(' ');
                cmd.push_str(&arg.to_string_lossy());
                cmd
            })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    DeviceNotFound,
    Untyped,
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNotFound => write!(f, "device not found"),
            Self::Untyped => write!(f, "install failed"),
        }
    }
}

/// Sorts install failures by their message.
///
/// adb doesn't hand back error codes for a vanished device, so this matches
/// on its wording, which may change between adb releases. The pattern has
/// to match the whole message.
#[derive(Clone, Debug)]
pub struct FailureClassifier {
    device_not_found: Regex,
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self {
            device_not_found: regex!(r"^(?:device '.*' not found)$").clone(),
        }
    }
}

impl FailureClassifier {
    pub fn with_device_not_found(pattern: &str) -> Result<Self, RegexError> {
        Regex::new(&format!("^(?:{})$", pattern)).map(|device_not_found| Self { device_not_found })
    }

    pub fn classify(&self, message: Option<&str>) -> FailureKind {
        match message {
            Some(message) if self.device_not_found.is_match(message) => {
                FailureKind::DeviceNotFound
            }
            _ => FailureKind::Untyped,
        }
    }
}

/// How a single install attempt went.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InstallResult {
    Success,
    Failure {
        kind: FailureKind,
        message: Option<String>,
    },
}

impl InstallResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

pub trait Installer {
    /// Makes one attempt. Failures come back as [`InstallResult::Failure`];
    /// retrying is the caller's business.
    fn install_app(&self, device: &dyn DeviceConnection) -> InstallResult;
}

#[derive(Debug)]
pub struct SplitApkInstaller<'a, P: ?Sized> {
    printer: &'a P,
    spec: InstallSpec,
    classifier: FailureClassifier,
}

impl<'a, P: ConsolePrinter + ?Sized> SplitApkInstaller<'a, P> {
    pub fn new(printer: &'a P, spec: InstallSpec) -> Self {
        Self::with_classifier(printer, spec, FailureClassifier::default())
    }

    pub fn with_classifier(printer: &'a P, spec: InstallSpec, classifier: FailureClassifier) -> Self {
        Self {
            printer,
            spec,
            classifier,
        }
    }
}

impl<'a, P: ConsolePrinter + ?Sized> Installer for SplitApkInstaller<'a, P> {
    fn install_app(&self, device: &dyn DeviceConnection) -> InstallResult {
        let cmd = self.spec.command_line();
        self.printer.stdout(&cmd);
        log::info!("{}", cmd);

        match device.install_packages(
            self.spec.apks(),
            REINSTALL,
            self.spec.options(),
            INSTALL_TIMEOUT,
        ) {
            Ok(()) => InstallResult::Success,
            Err(err) => {
                let kind = self.classifier.classify(err.message());
                log::info!("install on {} failed ({}): {}", device.serial_no(), kind, err);
                InstallResult::Failure {
                    kind,
                    message: err.message().map(ToOwned::to_owned),
                }
            }
        }
    }
}
