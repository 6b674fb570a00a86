use super::{
    installer::{FailureKind, InstallResult, Installer},
    printer::ConsolePrinter,
};
use crate::{
    android::device::DeviceConnection,
    util::cli::{Report, Reportable},
};
use std::{thread::sleep, time::Duration};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    Retry { delay: Duration },
    GiveUp,
}

/// Decides what happens after a failed attempt. `attempt` counts from 1.
pub trait RetryPolicy {
    fn decide(&mut self, attempt: u32, kind: FailureKind, message: Option<&str>) -> Decision;
}

impl<F> RetryPolicy for F
where
    F: FnMut(u32, FailureKind, Option<&str>) -> Decision,
{
    fn decide(&mut self, attempt: u32, kind: FailureKind, message: Option<&str>) -> Decision {
        self(attempt, kind, message)
    }
}

/// Retries untyped failures with exponentially growing delays. A device
/// that went missing isn't coming back on its own, so that's never retried.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Backoff {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(10), 2)
    }
}

impl Backoff {
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: u32,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay,
            multiplier,
        }
    }

    pub fn once() -> Self {
        Self::new(1, Duration::from_secs(0), Duration::from_secs(0), 1)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The wait after failed attempt number `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl RetryPolicy for Backoff {
    fn decide(&mut self, attempt: u32, kind: FailureKind, _message: Option<&str>) -> Decision {
        match kind {
            FailureKind::DeviceNotFound => Decision::GiveUp,
            FailureKind::Untyped if attempt >= self.max_attempts => Decision::GiveUp,
            FailureKind::Untyped => Decision::Retry {
                delay: self.delay(attempt),
            },
        }
    }
}

#[derive(Debug, Error)]
#[error("Failed to install {application_id:?} after {attempts} attempt(s) ({kind}): {}", .message.as_deref().unwrap_or("no message from adb"))]
pub struct InstallFailed {
    application_id: String,
    attempts: u32,
    kind: FailureKind,
    message: Option<String>,
}

impl InstallFailed {
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl Reportable for InstallFailed {
    fn report(&self) -> Report {
        let msg = format!("Failed to install {}", self.application_id);
        match self.kind {
            FailureKind::DeviceNotFound => Report::action_request(
                msg,
                "The device disconnected during installation. Reconnect it and try again.",
            ),
            FailureKind::Untyped => Report::error(
                msg,
                format!(
                    "Gave up after {} attempt(s): {}",
                    self.attempts,
                    self.message().unwrap_or("no message from adb")
                ),
            ),
        }
    }
}

/// Keeps calling an [`Installer`] until it works or the policy gives up.
pub struct RetryingInstaller<'a, I, P: ?Sized, R> {
    device: &'a dyn DeviceConnection,
    installer: I,
    application_id: &'a str,
    printer: &'a P,
    policy: R,
}

impl<'a, I, P, R> RetryingInstaller<'a, I, P, R>
where
    I: Installer,
    P: ConsolePrinter + ?Sized,
    R: RetryPolicy,
{
    pub fn new(
        device: &'a dyn DeviceConnection,
        installer: I,
        application_id: &'a str,
        printer: &'a P,
        policy: R,
    ) -> Self {
        Self {
            device,
            installer,
            application_id,
            printer,
            policy,
        }
    }

    /// Returns how many attempts it took.
    pub fn install(mut self) -> Result<u32, InstallFailed> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (kind, message) = match self.installer.install_app(self.device) {
                InstallResult::Success => {
                    log::info!(
                        "installed {:?} on {} (attempt {})",
                        self.application_id,
                        self.device.serial_no(),
                        attempt
                    );
                    return Ok(attempt);
                }
                InstallResult::Failure { kind, message } => (kind, message),
            };
            match self.policy.decide(attempt, kind, message.as_deref()) {
                Decision::Retry { delay } => {
                    self.printer.stderr(&format!(
                        "Installation failed: {}. Retrying in {} ms...",
                        message.as_deref().unwrap_or_else(|| match kind {
                            FailureKind::DeviceNotFound => "device not found",
                            FailureKind::Untyped => "unknown error",
                        }),
                        delay.as_millis()
                    ));
                    log::warn!(
                        "attempt {} to install {:?} failed; retrying in {:?}",
                        attempt,
                        self.application_id,
                        delay
                    );
                    sleep(delay);
                }
                Decision::GiveUp => {
                    let failed = InstallFailed {
                        application_id: self.application_id.to_owned(),
                        attempts: attempt,
                        kind,
                        message,
                    };
                    self.printer.stderr(&failed.to_string());
                    return Err(failed);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::android::deploy::{
        fake::{FakeDevice, Recorder, Stream},
        installer::{InstallSpec, SplitApkInstaller},
    };
    use rstest::rstest;

    fn no_wait() -> Backoff {
        Backoff::new(3, Duration::from_millis(0), Duration::from_millis(0), 2)
    }

    fn installer(printer: &Recorder) -> SplitApkInstaller<'_, Recorder> {
        SplitApkInstaller::new(
            printer,
            InstallSpec::new(vec!["main.apk".into()], vec!["-t".into()]),
        )
    }

    #[rstest(
        attempt,
        delay_ms,
        case(1, 1000),
        case(2, 2000),
        case(3, 4000),
        case(4, 8000),
        case(5, 10000),
        case(40, 10000)
    )]
    fn test_backoff_delay(attempt: u32, delay_ms: u64) {
        assert_eq!(
            Backoff::default().delay(attempt),
            Duration::from_millis(delay_ms)
        );
    }

    #[rstest(
        attempt,
        kind,
        decision,
        case(1, FailureKind::DeviceNotFound, Decision::GiveUp),
        case(1, FailureKind::Untyped, Decision::Retry { delay: Duration::from_secs(1) }),
        case(2, FailureKind::Untyped, Decision::Retry { delay: Duration::from_secs(2) }),
        case(3, FailureKind::Untyped, Decision::GiveUp)
    )]
    fn test_backoff_decide(attempt: u32, kind: FailureKind, decision: Decision) {
        assert_eq!(Backoff::default().decide(attempt, kind, None), decision);
    }

    #[test]
    fn test_once_never_retries() {
        assert_eq!(
            Backoff::once().decide(1, FailureKind::Untyped, Some("INSTALL_FAILED_OLDER_SDK")),
            Decision::GiveUp
        );
        let backoff = Backoff::new(0, Duration::from_secs(1), Duration::from_secs(1), 2);
        assert_eq!(backoff.max_attempts(), 1);
    }

    #[test]
    fn test_succeeds_first_time() {
        let printer = Recorder::default();
        let device = FakeDevice::new();
        let attempts =
            RetryingInstaller::new(&device, installer(&printer), "com.example.app", &printer, no_wait())
                .install()
                .unwrap();
        assert_eq!(attempts, 1);
        assert_eq!(device.calls().len(), 1);
    }

    #[test]
    fn test_retries_untyped_failures() {
        let printer = Recorder::default();
        let device = FakeDevice::new().failing_with(&[
            Some("INSTALL_FAILED_INTERNAL_ERROR"),
            Some("INSTALL_FAILED_INTERNAL_ERROR"),
        ]);
        let attempts =
            RetryingInstaller::new(&device, installer(&printer), "com.example.app", &printer, no_wait())
                .install()
                .unwrap();
        assert_eq!(attempts, 3);
        assert_eq!(device.calls().len(), 3);
        assert_eq!(
            printer
                .lines()
                .iter()
                .filter(|(stream, _)| *stream == Stream::Stderr)
                .count(),
            2
        );
    }

    #[test]
    fn test_gives_up_when_budget_runs_out() {
        let printer = Recorder::default();
        let device = FakeDevice::new().failing_with(&[
            Some("INSTALL_FAILED_INSUFFICIENT_STORAGE"),
            Some("INSTALL_FAILED_INSUFFICIENT_STORAGE"),
            Some("INSTALL_FAILED_INSUFFICIENT_STORAGE"),
            None,
        ]);
        let err =
            RetryingInstaller::new(&device, installer(&printer), "com.example.app", &printer, no_wait())
                .install()
                .unwrap_err();
        assert_eq!(err.attempts(), 3);
        assert_eq!(err.kind(), FailureKind::Untyped);
        assert_eq!(err.message(), Some("INSTALL_FAILED_INSUFFICIENT_STORAGE"));
        assert_eq!(device.calls().len(), 3);
        assert_eq!(
            printer.lines().last(),
            Some(&(Stream::Stderr, err.to_string()))
        );
    }

    #[test]
    fn test_gives_up_at_once_when_device_is_gone() {
        let printer = Recorder::default();
        let device = FakeDevice::new().failing_with(&[Some("device 'emulator-5554' not found")]);
        let err =
            RetryingInstaller::new(&device, installer(&printer), "com.example.app", &printer, no_wait())
                .install()
                .unwrap_err();
        assert_eq!(err.attempts(), 1);
        assert_eq!(err.kind(), FailureKind::DeviceNotFound);
        assert_eq!(device.calls().len(), 1);
        assert!(err.report().details().contains("disconnected"));
    }

    #[test]
    fn test_closure_policy() {
        let printer = Recorder::default();
        let device = FakeDevice::new().failing_with(&[Some("device 'emulator-5554' not found")]);
        let mut seen = Vec::new();
        let attempts = RetryingInstaller::new(
            &device,
            installer(&printer),
            "com.example.app",
            &printer,
            |attempt: u32, kind: FailureKind, _message: Option<&str>| {
                seen.push((attempt, kind));
                Decision::Retry {
                    delay: Duration::from_millis(0),
                }
            },
        )
        .install()
        .unwrap();
        assert_eq!(attempts, 2);
        assert_eq!(seen, vec![(1, FailureKind::DeviceNotFound)]);
    }
}
