#![cfg(feature = "cli")]
#![forbid(unsafe_code)]

use split_deploy::{android::cli::Input, util::cli::exec, NAME};

fn main() {
    exec::<Input>(NAME)
}
