mod create;

use bootstrap_core::{config::BootstrapConfig, console, elevate};

fn main() {
    console::setup();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let workdir = match elevate::parse_working_dir(&args) {
        Some(dir) => {
            if let Err(err) = std::env::set_current_dir(&dir) {
                eprintln!("warning: could not enter {}: {err}", dir.display());
            }
            dir
        }
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(err) => {
                println!("[ERROR] could not resolve the working directory: {err}");
                console::pause("Press enter to exit...");
                std::process::exit(1);
            }
        },
    };
    println!("Working directory: {}", workdir.display());

    if !elevate::is_elevated() {
        println!("Administrator privileges are required to create the environment.");
        println!("Requesting elevation...");
        // One-way handoff: the elevated child carries on, this process exits.
        elevate::relaunch_elevated(&args, &workdir);
    }
    println!("Running with administrator privileges.");

    let cfg = BootstrapConfig::from_env();
    let code = match create::run(&workdir, &cfg) {
        Ok(()) => 0,
        Err(err) => {
            println!("[ERROR] {err:#}");
            1
        }
    };

    console::pause("Press enter to exit...");
    std::process::exit(code);
}
