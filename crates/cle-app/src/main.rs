//! cle-demo: a small program built on the command line executor.
//!
//! Every invocation runs one command (ECHO, SUM) or one built-in function
//! and exits with the resulting condition code. Try `cle-demo HELP`.

mod commands;

use std::process::ExitCode;

use anyhow::Context;
use cle_exec::{Dispatcher, ProgramInfo};

use commands::{Echo, Sum};

const PROGRAM: &str = include_str!("../program.toml");

fn dispatcher() -> anyhow::Result<Dispatcher> {
    let info = ProgramInfo::from_toml(PROGRAM).context("invalid program manifest")?;
    log::debug!("Starting {} (default owner {})", info.program, info.default_owner);

    let mut dispatcher = Dispatcher::new(info).with_reason_lookup(commands::reason);
    dispatcher.register(Box::new(Echo::default()));
    dispatcher.register(Box::new(Sum::default()));
    Ok(dispatcher)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut dispatcher = match dispatcher() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("cle-demo: {e:#}");
            return ExitCode::from(cle_types::ConditionCode::Fatal.code() as u8);
        },
    };
    let argv: Vec<String> = std::env::args().collect();
    let code = dispatcher.execute(&argv);
    ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX))
}
