//! Pushing split APKs to a device.
//!
//! [`SplitApkDeployTask`] works out what to install and how, then hands a
//! [`SplitApkInstaller`] to a [`RetryingInstaller`], which keeps at it for as
//! long as its [`RetryPolicy`] allows.

pub mod installer;
pub mod printer;
pub mod retry;

pub use self::{
    installer::{
        FailureClassifier, FailureKind, InstallResult, InstallSpec, Installer, SplitApkInstaller,
    },
    printer::{Console, ConsolePrinter},
    retry::{Backoff, Decision, InstallFailed, RetryPolicy, RetryingInstaller},
};

use super::{build_info::BuildInfo, device::DeviceConnection};
use crate::{
    opts::DontKill,
    util::cli::{Report, Reportable},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("The build info for {application_id:?} doesn't list any split APKs.")]
    NoSplitApks { application_id: String },
    #[error(transparent)]
    InstallFailed(#[from] InstallFailed),
}

impl Reportable for DeployError {
    fn report(&self) -> Report {
        match self {
            Self::NoSplitApks { .. } => Report::error("Nothing to deploy", self),
            Self::InstallFailed(err) => err.report(),
        }
    }
}

#[derive(Debug)]
pub struct SplitApkDeployTask<'a> {
    build_info: &'a BuildInfo,
    dont_kill: DontKill,
    classifier: FailureClassifier,
}

impl<'a> SplitApkDeployTask<'a> {
    pub const DESCRIPTION: &'static str = "Installing APKs";

    pub fn new(build_info: &'a BuildInfo) -> Self {
        Self {
            build_info,
            dont_kill: DontKill::default(),
            classifier: FailureClassifier::default(),
        }
    }

    pub fn with_dont_kill(mut self, dont_kill: DontKill) -> Self {
        self.dont_kill = dont_kill;
        self
    }

    pub fn with_classifier(mut self, classifier: FailureClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn description(&self) -> &'static str {
        Self::DESCRIPTION
    }

    pub fn perform<P, R>(
        &self,
        device: &dyn DeviceConnection,
        printer: &P,
        policy: R,
    ) -> Result<(), DeployError>
    where
        P: ConsolePrinter + ?Sized,
        R: RetryPolicy,
    {
        let application_id = self.build_info.application_id();
        let spec = InstallSpec::for_device(device, self.build_info, self.dont_kill);
        if spec.apks().is_empty() {
            return Err(DeployError::NoSplitApks {
                application_id: application_id.to_owned(),
            });
        }
        let installer = SplitApkInstaller::with_classifier(printer, spec, self.classifier.clone());
        let result = RetryingInstaller::new(device, installer, application_id, printer, policy).install();
        // Tracked whether or not the install went through.
        log::info!(
            "deploy type: split-apk (application {:?}, device {}, patch: {}, installed: {})",
            application_id,
            device.serial_no(),
            self.build_info.is_patch_build(),
            result.is_ok()
        );
        result?;
        printer.stdout("Split APKs installed");
        Ok(())
    }
}


#[cfg(test)]
mod test {
    use super::{
        fake::{capture_logs, logged, FakeDevice, Recorder, Stream},
        *,
    };
    use crate::android::{
        build_info::{Artifact, ArtifactType},
        device::HardwareFeature,
    };
    use rstest::rstest;
    use std::{path::PathBuf, time::Duration};

    fn no_wait() -> Backoff {
        Backoff::new(3, Duration::from_millis(0), Duration::from_millis(0), 2)
    }

    fn build_info(patch: bool) -> BuildInfo {
        BuildInfo::new(
            "com.example.app",
            patch,
            vec![
                Artifact::new(ArtifactType::Main, "app.apk"),
                Artifact::new(ArtifactType::SplitMain, "main.apk"),
                Artifact::new(ArtifactType::Split, "slice_0.apk"),
                Artifact::new(ArtifactType::Split, "slice_1.apk"),
            ],
        )
    }

    #[test]
    fn test_perform_installs_splits() {
        let info = build_info(true);
        let device = FakeDevice::new().with_feature(HardwareFeature::Embedded);
        let printer = Recorder::default();
        let task = SplitApkDeployTask::new(&info).with_dont_kill(DontKill::Yes);
        assert_eq!(task.description(), "Installing APKs");
        task.perform(&device, &printer, no_wait()).unwrap();

        let calls = device.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].apks,
            vec![
                PathBuf::from("main.apk"),
                PathBuf::from("slice_0.apk"),
                PathBuf::from("slice_1.apk"),
            ]
        );
        assert_eq!(
            calls[0].options,
            vec!["-t", "-g", "-p", "com.example.app", "--dont-kill"]
        );
        assert_eq!(
            printer.lines().last(),
            Some(&(Stream::Stdout, "Split APKs installed".to_owned()))
        );
    }

    #[test]
    fn test_perform_refuses_builds_without_splits() {
        let info = BuildInfo::new(
            "com.example.app",
            false,
            vec![Artifact::new(ArtifactType::Main, "app.apk")],
        );
        let device = FakeDevice::new();
        let err = SplitApkDeployTask::new(&info)
            .perform(&device, &Recorder::default(), no_wait())
            .unwrap_err();
        assert!(matches!(err, DeployError::NoSplitApks { .. }));
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_perform_reports_lost_device() {
        let info = build_info(false);
        let device = FakeDevice::new().failing_with(&[Some("device 'emulator-5554' not found")]);
        let printer = Recorder::default();
        let err = SplitApkDeployTask::new(&info)
            .perform(&device, &printer, no_wait())
            .unwrap_err();
        match err {
            DeployError::InstallFailed(err) => {
                assert_eq!(err.kind(), FailureKind::DeviceNotFound);
                assert_eq!(err.attempts(), 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!printer
            .lines()
            .contains(&(Stream::Stdout, "Split APKs installed".to_owned())));
    }

    #[test]
    fn test_perform_uses_custom_classifier() {
        let info = build_info(false);
        let device = FakeDevice::new().failing_with(&[Some("no such device: emulator-5554")]);
        let classifier = FailureClassifier::with_device_not_found("no such device: .*").unwrap();
        let err = SplitApkDeployTask::new(&info)
            .with_classifier(classifier)
            .perform(&device, &Recorder::default(), no_wait())
            .unwrap_err();
        assert!(matches!(
            err,
            DeployError::InstallFailed(ref err) if err.kind() == FailureKind::DeviceNotFound
        ));
    }

    #[rstest(
        application_id,
        failures,
        installed,
        case("com.example.tracked.ok", vec![], true),
        case("com.example.tracked.lost", vec![Some("device 'emulator-5554' not found")], false),
        case("com.example.tracked.full", vec![Some("INSTALL_FAILED_INSUFFICIENT_STORAGE"); 3], false)
    )]
    fn test_perform_tracks_deploy_type(
        application_id: &str,
        failures: Vec<Option<&str>>,
        installed: bool,
    ) {
        capture_logs();
        let info = BuildInfo::new(
            application_id,
            false,
            vec![Artifact::new(ArtifactType::SplitMain, "main.apk")],
        );
        let device = FakeDevice::new().failing_with(&failures);
        let result = SplitApkDeployTask::new(&info).perform(&device, &Recorder::default(), no_wait());
        assert_eq!(result.is_ok(), installed);
        let expected = format!(
            "deploy type: split-apk (application {:?}, device emulator-5554, patch: false, installed: {})",
            application_id, installed
        );
        assert_eq!(logged().iter().filter(|line| **line == expected).count(), 1);
    }
}
