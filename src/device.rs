use crate::{
    opts::Interactivity,
    util::{
        self,
        cli::{Report, Reportable},
        prompt,
    },
};
use std::{fmt::Display, io};

#[derive(Debug)]
pub enum PromptErrorCause<T: Reportable> {
    DetectionFailed(T),
    PromptFailed(io::Error),
    NoneDetected,
    SerialNotDetected { serial_no: String },
    Ambiguous { detected: Vec<String> },
}

#[derive(Debug)]
pub struct PromptError<T: Reportable> {
    name: &'static str,
    cause: PromptErrorCause<T>,
}

impl<T: Reportable> Reportable for PromptError<T> {
    fn report(&self) -> Report {
        let msg = format!("Failed to pick {} device", self.name);
        match &self.cause {
            PromptErrorCause::DetectionFailed(err) => err.report(),
            PromptErrorCause::PromptFailed(err) => Report::error(msg, err),
            PromptErrorCause::NoneDetected => {
                Report::error(msg, format!("No connected {} devices detected", self.name))
            }
            PromptErrorCause::SerialNotDetected { serial_no } => Report::error(
                msg,
                format!("No connected {} device has serial {:?}", self.name, serial_no),
            ),
            PromptErrorCause::Ambiguous { detected } => Report::action_request(
                msg,
                format!(
                    "Detected {}; pass `--serial` to pick one, since prompting is disabled.",
                    util::list_display(detected)
                ),
            ),
        }
    }
}

impl<T: Reportable> PromptError<T> {
    pub fn new(name: &'static str, cause: PromptErrorCause<T>) -> Self {
        Self { name, cause }
    }

    pub fn detection_failed(name: &'static str, err: T) -> Self {
        Self::new(name, PromptErrorCause::DetectionFailed(err))
    }

    pub fn prompt_failed(name: &'static str, err: io::Error) -> Self {
        Self::new(name, PromptErrorCause::PromptFailed(err))
    }

    pub fn none_detected(name: &'static str) -> Self {
        Self::new(name, PromptErrorCause::NoneDetected)
    }

    pub fn serial_not_detected(name: &'static str, serial_no: impl Into<String>) -> Self {
        Self::new(
            name,
            PromptErrorCause::SerialNotDetected {
                serial_no: serial_no.into(),
            },
        )
    }

    pub fn cause(&self) -> &PromptErrorCause<T> {
        &self.cause
    }
}

/// Picks one device out of `device_list`.
///
/// A single device is picked without asking. With several devices we prompt
/// for an index, unless we're non-interactive, in which case that's an error.
pub fn pick<D: Display, T: Reportable>(
    name: &'static str,
    device_list: Vec<D>,
    interactivity: Interactivity,
) -> Result<D, PromptError<T>> {
    let index = match device_list.len() {
        0 => return Err(PromptError::none_detected(name)),
        1 => 0,
        _ if interactivity.none() => {
            return Err(PromptError::new(
                name,
                PromptErrorCause::Ambiguous {
                    detected: device_list.iter().map(ToString::to_string).collect(),
                },
            ))
        }
        _ => prompt::list(
            format!("Detected {} devices", name),
            device_list.iter(),
            "device",
            "Device",
        )
        .map_err(|cause| PromptError::prompt_failed(name, cause))?,
    };
    let device = device_list
        .into_iter()
        .nth(index)
        .ok_or_else(|| PromptError::none_detected(name))?;
    println!("Detected connected device: {}", device);
    Ok(device)
}
