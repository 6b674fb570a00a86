use colored::{Color, Colorize as _};
use std::fmt::{self, Debug, Display};

pub type TextWrapper = textwrap::Wrapper<'static, textwrap::NoHyphenation>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Label {
    Error,
    ActionRequest,
}

impl Label {
    fn color(self) -> Color {
        match self {
            Self::Error => Color::BrightRed,
            Self::ActionRequest => Color::BrightMagenta,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::ActionRequest => "action request",
        }
    }
}

/// A user-facing account of how things went.
#[derive(Clone, Debug)]
pub struct Report {
    label: Label,
    msg: String,
    details: String,
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}\n    {}", self.label.as_str(), self.msg, self.details)
    }
}

impl Report {
    fn new(label: Label, msg: impl Display, details: impl Display) -> Self {
        Self {
            label,
            msg: msg.to_string(),
            details: details.to_string(),
        }
    }

    pub fn action_request(msg: impl Display, details: impl Display) -> Self {
        Self::new(Label::ActionRequest, msg, details)
    }

    pub fn error(msg: impl Display, details: impl Display) -> Self {
        Self::new(Label::Error, msg, details)
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    /// Every report is about something going wrong, so this is never 0.
    pub fn exit_code(&self) -> i8 {
        1
    }

    fn format(&self, wrapper: &TextWrapper) -> String {
        let head = format!("{}: {}", self.label.as_str(), self.msg)
            .color(self.label.color())
            .bold();
        let wrapper = wrapper
            .clone()
            .initial_indent("    ")
            .subsequent_indent("    ");
        format!("{}\n{}\n", head, wrapper.fill(&self.details))
    }

    pub fn print(&self, wrapper: &TextWrapper) {
        let s = self.format(wrapper);
        if matches!(self.label, Label::Error) {
            eprint!("{}", s)
        } else {
            print!("{}", s)
        }
    }
}

pub trait Reportable: Debug {
    fn report(&self) -> Report;
}

#[cfg(feature = "cli")]
pub use self::runner::*;

#[cfg(feature = "cli")]
mod runner {
    use super::{Reportable, TextWrapper};
    use crate::opts;
    use structopt::{clap::AppSettings, StructOpt};

    pub static GLOBAL_SETTINGS: &[AppSettings] = &[
        AppSettings::ColoredHelp,
        AppSettings::DeriveDisplayOrder,
        AppSettings::VersionlessSubcommands,
    ];

    pub static SETTINGS: &[AppSettings] = &[AppSettings::SubcommandRequiredElseHelp];

    pub fn bin_name(name: &str) -> String {
        format!("cargo {}", name)
    }

    #[derive(Clone, Copy, Debug, StructOpt)]
    pub struct GlobalFlags {
        #[structopt(
            short = "v",
            long = "verbose",
            help = "Make life louder",
            global = true,
            multiple = true,
            parse(from_occurrences = opts::NoiseLevel::from_occurrences),
        )]
        pub noise_level: opts::NoiseLevel,
        #[structopt(
            long = "non-interactive",
            help = "Go with the flow",
            global = true,
            parse(from_flag = opts::Interactivity::from_flag),
        )]
        pub interactivity: opts::Interactivity,
    }

    pub trait Exec: StructOpt {
        type Report: Reportable;

        fn global_flags(&self) -> GlobalFlags;

        fn exec(self, wrapper: &TextWrapper) -> Result<(), Self::Report>;
    }

    fn get_args(name: &str) -> Vec<String> {
        let mut args: Vec<String> = std::env::args().collect();
        // Running this as a cargo subcommand gives us our name as an argument,
        // so let's just discard that...
        if args.get(1).map(String::as_str) == Some(name) {
            args.remove(1);
        }
        args
    }

    fn init_logging(noise_level: opts::NoiseLevel) {
        use env_logger::{Builder, Env};
        let default_level = match noise_level {
            opts::NoiseLevel::Polite => "warn",
            opts::NoiseLevel::LoudAndProud => "split_deploy=info",
            opts::NoiseLevel::FranklyQuitePedantic => "debug",
        };
        let env = Env::default().default_filter_or(default_level);
        Builder::from_env(env).init();
    }

    pub fn exec<E: Exec>(name: &str) {
        let wrapper = TextWrapper::with_splitter(textwrap::termwidth(), textwrap::NoHyphenation);
        let input = match E::from_iter_safe(get_args(name)) {
            Ok(input) => input,
            Err(err) => err.exit(),
        };
        init_logging(input.global_flags().noise_level);
        if let Err(err) = input.exec(&wrapper) {
            let report = err.report();
            report.print(&wrapper);
            // We only expose access to the 8 lsb of the exit code, since:
            // https://doc.rust-lang.org/std/process/fn.exit.html#platform-specific-behavior
            std::process::exit(report.exit_code() as i32)
        }
    }
}
