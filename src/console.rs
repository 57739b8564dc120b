//! Operator console on the serial/JTAG port.
//!
//! A line-oriented command interface for bench work: inspect status, start
//! and stop runs, retune the PID gains.  Parsing and response shaping are
//! pure functions (host-tested); [`run`] is the blocking stdin loop the
//! main task parks in.

use std::io::{BufRead, Write as _};

use crate::drivers::power;
use crate::oven::OvenHandle;
use crate::profile;

/// A parsed console command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Status,
    Profiles,
    Start { idx: usize, temp_c: f32 },
    Stop,
    Pid { kp: f32, ki: f32, kd: f32 },
    Help,
}

/// Parse one input line.  Errors are usage strings for the operator.
pub fn parse_line(line: &str) -> Result<Command, &'static str> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Err("empty line");
    };

    let cmd = match word {
        "status" => Command::Status,
        "profiles" => Command::Profiles,
        "stop" => Command::Stop,
        "help" => Command::Help,
        "start" => {
            let idx = parts
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or("usage: start <profile> <temp>")?;
            let temp_c = parts
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or("usage: start <profile> <temp>")?;
            Command::Start { idx, temp_c }
        }
        "pid" => {
            let mut gain = || parts.next().and_then(|s| s.parse().ok());
            match (gain(), gain(), gain()) {
                (Some(kp), Some(ki), Some(kd)) => Command::Pid { kp, ki, kd },
                _ => return Err("usage: pid <kp> <ki> <kd>"),
            }
        }
        _ => return Err("unknown command (try 'help')"),
    };

    if parts.next().is_some() {
        return Err("trailing arguments");
    }
    Ok(cmd)
}

/// Execute a command against the controller and return the reply text.
pub fn dispatch(cmd: Command, oven: &OvenHandle) -> String {
    match cmd {
        Command::Status => {
            let s = oven.status();
            format!(
                "current: {:.2} C  target: {:.2} C  running: {}  duty: {}/{}",
                s.current,
                s.target,
                s.running,
                power::active_threshold(),
                power::period_cycles(),
            )
        }
        Command::Profiles => {
            let lines: Vec<String> = profile::PROFILES
                .iter()
                .enumerate()
                .map(|(idx, p)| format!("{}: {}", idx, p.name))
                .collect();
            lines.join("\n")
        }
        Command::Start { idx, temp_c } => {
            if oven.start(idx, temp_c) {
                format!("started profile {}", idx)
            } else {
                format!("no such profile: {}", idx)
            }
        }
        Command::Stop => {
            oven.stop();
            "stopped".into()
        }
        Command::Pid { kp, ki, kd } => {
            oven.set_pid_gains(kp, ki, kd);
            "gains updated".into()
        }
        Command::Help => "commands: status | profiles | start <profile> <temp> | stop | \
                          pid <kp> <ki> <kd> | help"
            .into(),
    }
}

/// Blocking console loop.  Never returns; EOF on stdin just idles the
/// console, the control loop is unaffected.
pub fn run(oven: &OvenHandle) -> ! {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut line = String::new();

    loop {
        let _ = write!(stdout, "> ");
        let _ = stdout.flush();

        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => std::thread::sleep(std::time::Duration::from_secs(1)),
            Ok(_) => {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_line(&line) {
                    Ok(cmd) => println!("{}", dispatch(cmd, oven)),
                    Err(usage) => println!("{}", usage),
                }
            }
            Err(_) => std::thread::sleep(std::time::Duration::from_secs(1)),
        }
    }
}
