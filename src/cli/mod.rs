mod compile;
mod serve;

use anyhow::{Result, bail};
use console::style;
use std::path::PathBuf;

use crate::core::terminal::{self, GuideSection};
use crate::platform::{NativePlatform, Platform};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Server")
        .command("serve", "Start the API server (alias: daemon-run)")
        .command("  --host <HOST>", "Bind address (default from config.toml)")
        .command("  --port <PORT>", "Listen port (default from config.toml or PORT)")
        .print();

    GuideSection::new("Flows")
        .command("compile <file.json>", "Compile a questionnaire to a flow script")
        .command("  --output <FILE>", "Write the script to FILE instead of stdout")
        .print();

    GuideSection::new("Other")
        .command("help", "Show this guide")
        .print();

    println!(
        "\n {} {} <command> [options]\n",
        style("Usage:").bold(),
        style(NativePlatform::binary_name()).green()
    );
}

/// Host/port given on the command line; unset values fall back to config.
pub(crate) fn parse_serve_flags(args: &[String], start: usize) -> (Option<String>, Option<u16>) {
    let mut api_host = None;
    let mut api_port = None;
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    api_port = args[i + 1].parse().ok();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--host" => {
                if i + 1 < args.len() {
                    api_host = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    (api_host, api_port)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompileArgs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
}

pub(crate) fn parse_compile_args(args: &[String], start: usize) -> Result<CompileArgs> {
    let mut input = None;
    let mut output = None;
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--output" | "-o" => {
                if i + 1 < args.len() {
                    output = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    bail!("--output needs a file path");
                }
            }
            other if input.is_none() && !other.starts_with('-') => {
                input = Some(PathBuf::from(other));
                i += 1;
            }
            _ => i += 1,
        }
    }
    match input {
        Some(input) => Ok(CompileArgs { input, output }),
        None => bail!("compile needs a questionnaire JSON file"),
    }
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(String::as_str).unwrap_or("help");

    match cmd {
        "serve" | "daemon-run" => {
            let (api_host, api_port) = parse_serve_flags(&args, 2);
            serve::run_server(serve::ServeOverrides { api_host, api_port }).await
        }
        "compile" => {
            let parsed = parse_compile_args(&args, 2)?;
            compile::compile_file(&parsed.input, parsed.output.as_deref())
        }
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => {
            print_help();
            bail!("Unknown command '{}'", other)
        }
    }
}
