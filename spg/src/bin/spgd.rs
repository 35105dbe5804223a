//! # SPG Host Daemon
//!
//! Loads the spg module into a simulated kernel and prints the passwords
//! read from its device node.

use spg::host::{self, HostConfig, HostError};
use spg::{BufferPolicy, SpgConfig};
use std::env;
use std::fs;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    let options = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(&args[0]);
        process::exit(1);
    });

    let report = host::run(&options.host).unwrap_or_else(|e| {
        match &e {
            HostError::Kernel(err) => eprintln!("Runtime error: {} (errno {})", err, err.errno()),
            other => eprintln!("Runtime error: {}", other),
        }
        process::exit(1);
    });

    for password in &report.passwords {
        println!("{}", password);
    }
    if options.verbose {
        for entry in &report.log {
            eprintln!("{}", entry);
        }
    }
}

struct Options {
    host: HostConfig,
    verbose: bool,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut host = HostConfig::default();
    let mut verbose = false;
    let mut scrub = false;
    let mut overrides: Vec<(&str, &str)> = Vec::new();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let path = value(args, &mut i, "--config")?;
                let text = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file: {}", e))?;
                host.module = SpgConfig::from_json(&text).map_err(|e| e.to_string())?;
            }
            flag @ ("--major" | "--minor" | "--policy" | "--name") => {
                overrides.push((flag, value(args, &mut i, flag)?));
            }
            "--scrub" => {
                scrub = true;
            }
            "--seed" => {
                let v = value(args, &mut i, "--seed")?;
                host.seed = Some(v.parse().map_err(|_| format!("Invalid seed: {}", v))?);
            }
            "--opens" | "-n" => {
                let v = value(args, &mut i, "--opens")?;
                host.opens = v.parse().map_err(|_| format!("Invalid opens value: {}", v))?;
            }
            "--chunk" => {
                let v = value(args, &mut i, "--chunk")?;
                host.chunk = v.parse().map_err(|_| format!("Invalid chunk value: {}", v))?;
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    // Flags win over the config file regardless of order.
    for (flag, v) in overrides {
        match flag {
            "--major" => {
                host.module.major = v.parse().map_err(|_| format!("Invalid major: {}", v))?;
            }
            "--minor" => {
                host.module.minor = v.parse().map_err(|_| format!("Invalid minor: {}", v))?;
            }
            "--policy" => {
                host.module.buffer_policy = match v {
                    "shared" => BufferPolicy::Shared,
                    "per-session" | "per_session" => BufferPolicy::PerSession,
                    other => return Err(format!("Invalid policy: {}", other)),
                };
            }
            _ => host.module.device_name = v.to_string(),
        }
    }
    if scrub {
        host.module.scrub_on_release = true;
    }

    Ok(Options { host, verbose })
}

fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("Missing value for {}", flag))
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>      JSON module parameters");
    eprintln!("  --major <N>              Major device number (default 42)");
    eprintln!("  --minor <N>              Minor device number (default 0)");
    eprintln!("  --name <NAME>            Device name (default spg)");
    eprintln!("  --policy <POLICY>        Buffer policy: shared (default) or per-session");
    eprintln!("  --scrub                  Zero password buffers on close and unload");
    eprintln!("  --seed <N>               Deterministic seed (default: OS entropy)");
    eprintln!("  -n, --opens <N>          Number of passwords to read (default 1)");
    eprintln!("  --chunk <N>              Bytes per read call (default 64)");
    eprintln!("  -v, --verbose            Print the kernel log to stderr");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --opens 3", program);
    eprintln!("  {} --seed 7 --chunk 5 --verbose", program);
}
