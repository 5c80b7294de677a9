//! notebook-hash-password: produce a value for `AUTH_HASHED_PASSWORD`.
//!
//! Reads the password from `--password` or, when omitted, from the first
//! line of standard input so it stays out of shell history.

use clap::Parser;
use notebook_api::services::hash_password;
use std::io::BufRead;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "notebook-hash-password")]
#[command(author, version, about = "Hash the notebook login password with Argon2id")]
struct Cli {
    /// Password to hash (read from stdin when omitted)
    #[arg(short, long)]
    password: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(hash) => {
            println!("{}", hash);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<String> {
    let password = match cli.password {
        Some(p) => p,
        None => {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    Ok(hash_password(&password)?)
}
