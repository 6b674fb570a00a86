use colored::{Color, Colorize as _};
use std::{
    fmt::Display,
    io::{self, Write},
};

pub fn minimal(msg: impl Display) -> io::Result<String> {
    let mut input = String::new();
    print!("{}: ", msg);
    io::stdout().flush()?;
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().to_owned())
}

pub fn default(
    msg: impl Display,
    default: Option<&str>,
    default_color: Option<Color>,
) -> io::Result<String> {
    let msg = match (default, default_color) {
        (Some(default), Some(default_color)) => {
            format!("{} ({})", msg, default.color(default_color).bold())
        }
        (Some(default), None) => format!("{} ({})", msg, default),
        (None, _) => msg.to_string(),
    };
    minimal(msg).map(|response| match default {
        Some(default) if response.is_empty() => default.to_owned(),
        _ => response,
    })
}

pub fn list_display_only(choices: impl Iterator<Item = impl Display>, choice_count: usize) {
    if choice_count > 0 {
        for (index, choice) in choices.enumerate() {
            println!("  [{}] {}", index.to_string().green(), choice);
        }
    } else {
        println!("  -- none --");
    }
}

/// Asks for an index into `choices` until a valid one is entered.
pub fn list(
    header: impl Display,
    choices: impl ExactSizeIterator<Item = impl Display>,
    noun: impl Display,
    msg: impl Display,
) -> io::Result<usize> {
    println!("{}:", header);
    let choice_count = choices.len();
    list_display_only(choices, choice_count);
    println!("  Enter an {} for a {} above.", "index".green(), noun);
    loop {
        let response = default(
            &msg,
            if choice_count == 1 { Some("0") } else { None },
            Some(Color::Green),
        )?;
        if !response.is_empty() {
            if let Ok(index) = response.parse::<usize>() {
                if index < choice_count {
                    return Ok(index);
                } else {
                    println!("There's no {} with an index that high.", noun);
                }
            } else {
                println!("Hey, that wasn't a number! You're silly.");
            }
        } else {
            println!("Not to be pushy, but you need to pick a {}.", noun);
        }
    }
}
