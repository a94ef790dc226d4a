/*
 * File: /main.rs
 * Created Date: Tuesday November 21st 2023
 * Author: Zihan
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-03-10		Zihan	Command line entry for densification
 */

use std::error::Error;
use std::process;
use std::time::Instant;

use chrono::Local;
use log::{error, info, warn, LevelFilter};
use ndarray_npy::write_npy;

use gfusion::config::Config;
use gfusion::{Densifier, KnownAssociations};

const METHOD: &str = "gfusion";

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

fn run(config: &Config) -> Result<(), Box<dyn Error>> {
    info!(
        "[method: {}] [{}] D: {:?}, S: {:?}, R: {:?}",
        METHOD,
        timestamp(),
        config.get_d().dim(),
        config.get_s().dim(),
        config.get_r().dim()
    );

    let start_time = Instant::now();
    let known = KnownAssociations::from_sentinel(config.get_r().clone());
    let outcome = Densifier::new(config.get_densify().clone()).run(
        config.get_d().view(),
        config.get_s().view(),
        &known,
    )?;
    if let Some(warning) = &outcome.warning {
        warn!("[method: {}] [{}] {}", METHOD, timestamp(), warning);
    }
    info!(
        "[method: {}] [{}] {:?} after {} iterations in {:.3}s, omega {:?}, pi {:?}",
        METHOD,
        timestamp(),
        outcome.status,
        outcome.iterations,
        start_time.elapsed().as_secs_f32(),
        outcome.omega.to_vec(),
        outcome.pi.to_vec()
    );

    write_npy(config.get_output(), &outcome.theta)?;
    info!(
        "[method: {}] [{}] Theta written to {}",
        METHOD,
        timestamp(),
        config.get_output().display()
    );
    Ok(())
}

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap_or_else(|e| eprintln!("logger: {}", e));

    let config = Config::new(std::env::args()).unwrap_or_else(|err| {
        eprintln!("Problem parsing arguments: {}", err);
        eprintln!("usage: gfusion <D.npy> <S.npy> <R.npy> <out.npy> [latent_dim1] [latent_dim2] [tol]");
        process::exit(1);
    });

    if let Err(e) = run(&config) {
        error!("[method: {}] [{}] {}", METHOD, timestamp(), e);
        process::exit(1);
    }
}
