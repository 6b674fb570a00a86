use colored::Colorize as _;

/// Somewhere for the user to read what's going on.
pub trait ConsolePrinter {
    fn stdout(&self, message: &str);

    fn stderr(&self, message: &str);
}

/// Prints straight to the terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct Console;

impl ConsolePrinter for Console {
    fn stdout(&self, message: &str) {
        println!("{}", message);
    }

    fn stderr(&self, message: &str) {
        eprintln!("{}", message.bright_red());
    }
}
