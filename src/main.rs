#[macro_use]
extern crate log;

mod os;

use game::Config;
use std::process;

fn main() {
    env_logger::init();
    // log levels: error, warn, info, debug, trace
    info!("starting up... log level: {}", log::max_level());

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("bad configuration: {}", e);
            process::exit(1);
        }
    };
    debug!("{:?}", config);

    if let Err(e) = os::main(&config) {
        error!("{}", e);
        process::exit(1);
    }
}
