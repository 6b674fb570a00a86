use super::adb;
use crate::android::env::Env;
use once_cell_regex::regex;
use std::{
    ffi::OsString,
    fmt::{self, Display},
    path::PathBuf,
    process::Output,
    thread::sleep,
    time::{Duration, Instant},
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A failed installation, carrying whatever adb had to say about it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstallError {
    message: Option<String>,
}

impl Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}", message),
            None => write!(f, "Installation failed without a message"),
        }
    }
}

impl std::error::Error for InstallError {}

impl InstallError {
    pub fn new(message: Option<String>) -> Self {
        Self { message }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self::new(Some(message.into()))
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

fn strip_prefixes(line: &str) -> &str {
    let line = line.trim();
    let line = line.strip_prefix("adb: ").unwrap_or(line);
    line.strip_prefix("error: ").unwrap_or(line)
}

/// Digs the reason out of `adb install-multiple` output: the bit inside
/// `Failure [...]` when the package manager refused, otherwise adb's own
/// last word on the matter.
pub fn failure_message(stdout: &str, stderr: &str) -> Option<String> {
    // Greedy within a line, since reasons can quote file names in brackets.
    let failure = regex!(r"Failure \[(?P<reason>.*)\]");
    if let Some(caps) = failure
        .captures(stdout)
        .or_else(|| failure.captures(stderr))
    {
        return Some(caps["reason"].to_owned());
    }
    let last_line = |text: &str| {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .last()
            .map(|line| strip_prefixes(line).to_owned())
    };
    last_line(stderr).or_else(|| last_line(stdout))
}

fn check_install_output(output: &Output) -> Result<(), InstallError> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    log::debug!("`adb install-multiple` stdout: {}", stdout.trim());
    // Older adb releases exit with 0 even when the package manager refused.
    if output.status.success() && !stdout.contains("Failure [") {
        Ok(())
    } else {
        Err(InstallError::new(failure_message(&stdout, &stderr)))
    }
}

/// Everything after `adb -s <serial>`: the subcommand, `-r` when
/// reinstalling, then the options and packages in the order given.
pub fn install_args(apks: &[PathBuf], reinstall: bool, options: &[String]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["install-multiple".into()];
    if reinstall {
        args.push("-r".into());
    }
    args.extend(options.iter().map(Into::into));
    args.extend(apks.iter().map(|apk| apk.as_os_str().to_owned()));
    args
}

/// Polls `handle` until it exits, killing it once `timeout` has passed.
fn wait_with_timeout(handle: &duct::Handle, timeout: Duration) -> Result<(), InstallError> {
    let deadline = Instant::now() + timeout;
    loop {
        match handle.try_wait() {
            Ok(Some(output)) => return check_install_output(output),
            Ok(None) if Instant::now() >= deadline => {
                if let Err(err) = handle.kill() {
                    log::warn!("failed to kill `adb install-multiple`: {}", err);
                }
                return Err(InstallError::with_message(format!(
                    "Installation timed out after {} seconds",
                    timeout.as_secs()
                )));
            }
            Ok(None) => sleep(POLL_INTERVAL),
            Err(err) => return Err(InstallError::with_message(err.to_string())),
        }
    }
}

/// `adb install-multiple`, waiting at most `timeout` before killing it.
pub fn install_multiple(
    env: &Env,
    serial_no: &str,
    apks: &[PathBuf],
    reinstall: bool,
    options: &[String],
    timeout: Duration,
) -> Result<(), InstallError> {
    let args = install_args(apks, reinstall, options);
    let handle = adb(env, serial_no)
        .before_spawn(move |cmd| {
            cmd.args(&args);
            Ok(())
        })
        .stdin_null()
        .stdout_capture()
        .stderr_capture()
        .unchecked()
        .start()
        .map_err(|err| InstallError::with_message(err.to_string()))?;
    wait_with_timeout(&handle, timeout)
}
