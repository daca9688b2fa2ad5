mod bootstrap;

use bootstrap_core::{config::BootstrapConfig, console};

fn main() {
    console::setup();

    let workdir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            println!("[ERROR] could not resolve the working directory: {err}");
            console::pause("Press enter to exit...");
            std::process::exit(1);
        }
    };

    let cfg = BootstrapConfig::from_env();
    match bootstrap::bootstrap(&workdir, &cfg) {
        Ok(code) => {
            if code != 0 {
                println!("[ERROR] application exited with code {code}");
                console::pause("Press enter to exit...");
            }
            std::process::exit(code);
        }
        Err(err) => {
            println!("[ERROR] {err:#}");
            console::pause("Press enter to exit...");
            std::process::exit(1);
        }
    }
}
