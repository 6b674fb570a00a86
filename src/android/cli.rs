use crate::{
    android::{
        adb,
        build_info::{BuildInfo, LoadError},
        deploy::{Console, DeployError, SplitApkDeployTask},
        device::Device,
        env::{Env, Error as EnvError},
    },
    config::{self, Config},
    device::{self, PromptError},
    opts::Interactivity,
    util::{
        cli::{self, Exec, GlobalFlags, Report, Reportable, TextWrapper},
        prompt,
    },
    NAME,
};
use std::path::PathBuf;
use structopt::StructOpt;

const DEVICE_NAME: &str = "Android";

#[derive(Debug, StructOpt)]
#[structopt(
    bin_name = cli::bin_name(NAME),
    global_settings = cli::GLOBAL_SETTINGS,
    settings = cli::SETTINGS,
)]
pub struct Input {
    #[structopt(flatten)]
    flags: GlobalFlags,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, StructOpt)]
pub enum Command {
    #[structopt(name = "deploy", about = "Installs split APKs on a connected device")]
    Deploy {
        #[structopt(
            name = "build-info",
            parse(from_os_str),
            help = "Build info JSON listing the artifacts to deploy"
        )]
        build_info: PathBuf,
        #[structopt(long = "dont-kill", help = "Don't kill the app while installing")]
        dont_kill: bool,
        #[structopt(
            short = "s",
            long = "serial",
            help = "Serial number of the device to install on"
        )]
        serial: Option<String>,
        #[structopt(
            long = "config",
            parse(from_os_str),
            help = "Config file to use instead of ./split-deploy.toml"
        )]
        config: Option<PathBuf>,
    },
    #[structopt(name = "list", about = "Lists connected devices")]
    List,
}

#[derive(Debug)]
pub enum Error {
    EnvInitFailed(EnvError),
    ConfigFailed(config::Error),
    BuildInfoFailed(LoadError),
    DevicePromptFailed(PromptError<adb::device_list::Error>),
    DeployFailed(DeployError),
    ListFailed(adb::device_list::Error),
    CurrentDirFailed(std::io::Error),
}

impl Reportable for Error {
    fn report(&self) -> Report {
        match self {
            Self::EnvInitFailed(err) => err.report(),
            Self::ConfigFailed(err) => err.report(),
            Self::BuildInfoFailed(err) => err.report(),
            Self::DevicePromptFailed(err) => err.report(),
            Self::DeployFailed(err) => err.report(),
            Self::ListFailed(err) => err.report(),
            Self::CurrentDirFailed(err) => {
                Report::error("Failed to get current working directory", err)
            }
        }
    }
}

fn device_prompt(
    env: &Env,
    serial: Option<&str>,
    interactivity: Interactivity,
) -> Result<Device, PromptError<adb::device_list::Error>> {
    let device_list = adb::device_list(env)
        .map_err(|cause| PromptError::detection_failed(DEVICE_NAME, cause))?;
    match serial {
        Some(serial) => device_list
            .into_iter()
            .find(|device| device.serial_no() == serial)
            .ok_or_else(|| PromptError::serial_not_detected(DEVICE_NAME, serial)),
        None => device::pick(DEVICE_NAME, device_list.into_iter().collect(), interactivity),
    }
}

impl Exec for Input {
    type Report = Error;

    fn global_flags(&self) -> GlobalFlags {
        self.flags
    }

    fn exec(self, _wrapper: &TextWrapper) -> Result<(), Self::Report> {
        let Self {
            flags: GlobalFlags { interactivity, .. },
            command,
        } = self;
        match command {
            Command::Deploy {
                build_info,
                dont_kill,
                serial,
                config,
            } => {
                let cwd = std::env::current_dir().map_err(Error::CurrentDirFailed)?;
                let config = Config::load_or_default(config.as_deref(), &cwd)
                    .map_err(Error::ConfigFailed)?;
                let classifier = config.classifier().map_err(Error::ConfigFailed)?;
                let build_info = BuildInfo::load(&build_info).map_err(Error::BuildInfoFailed)?;
                let env = Env::new().map_err(Error::EnvInitFailed)?;
                let device = device_prompt(&env, serial.as_deref(), interactivity)
                    .map_err(Error::DevicePromptFailed)?;
                let task = SplitApkDeployTask::new(&build_info)
                    .with_dont_kill(config.dont_kill(dont_kill))
                    .with_classifier(classifier);
                println!("{} on {}...", task.description(), device);
                task.perform(&device.connect(&env), &Console, config.backoff())
                    .map_err(Error::DeployFailed)
            }
            Command::List => {
                let env = Env::new().map_err(Error::EnvInitFailed)?;
                adb::device_list(&env)
                    .map_err(Error::ListFailed)
                    .map(|device_list| {
                        prompt::list_display_only(device_list.iter(), device_list.len());
                    })
            }
        }
    }
}
