//! `dosa run`: real-time control loop fed by stdin command lines.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use dosa_core::Controller;
use dosa_traits::{DigitalIo, MonotonicClock};
use eyre::WrapErr;

use crate::session::{Printer, build_controller, open_backend, split_command_line};

/// Spawn the stdin reader. The channel disconnects when stdin closes.
fn spawn_stdin_reader() -> xch::Receiver<String> {
    let (tx, rx) = xch::bounded(64);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
        tracing::debug!("stdin closed");
    });
    rx
}

pub fn apply_line<I: DigitalIo>(ctl: &mut Controller<I>, line: &str) {
    let Some((topic, payload)) = split_command_line(line) else {
        return;
    };
    match ctl.handle_message(topic, payload) {
        Ok(cmd) => tracing::info!(topic = cmd.topic(), payload, "command applied"),
        Err(e) => tracing::warn!(error = %e, "command rejected"),
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

pub fn run(cfg: &dosa_config::Config, json: bool, max_ticks: Option<u64>) -> eyre::Result<()> {
    let io = open_backend(cfg)?;
    let mut ctl = build_controller(cfg, io, Box::new(MonotonicClock::new()))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }
    let commands = spawn_stdin_reader();

    let period = Duration::from_millis(cfg.runner.tick_ms);
    let started = Instant::now();
    let mut printer = Printer::new(json);
    let mut ticks: u64 = 0;
    tracing::info!(tick_ms = cfg.runner.tick_ms, max_ticks, "control loop started");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }
        for line in commands.try_iter() {
            apply_line(&mut ctl, &line);
        }
        ctl.tick(printer.at(elapsed_ms(started)));
        ticks += 1;
        if max_ticks.is_some_and(|n| ticks >= n) {
            break;
        }
        std::thread::sleep(period);
    }

    ctl.shutdown(printer.at(elapsed_ms(started)));
    tracing::info!(ticks, events = printer.count(), "control loop stopped");
    Ok(())
}
