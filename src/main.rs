use std::fs;
use std::path::PathBuf;

use calc_interpreter::try_evaluate;
use clap::Parser;
use clap::Subcommand;
use miette::IntoDiagnostic;
use miette::WrapErr;

#[derive(Parser, Debug)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Evaluate a single expression given on the command line
    Eval { expression: String },
    /// Evaluate a file of expressions, one per line
    Run { filename: PathBuf },
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Eval { expression } => {
            let value = try_evaluate(&expression)?;
            println!("{value}");
        }
        Commands::Run { filename } => {
            let file_contents = fs::read_to_string(&filename)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading `{}` failed", filename.display()))?;

            for (n, line) in file_contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match try_evaluate(line) {
                    Ok(value) => println!("{} = {value}", line.trim()),
                    Err(e) => {
                        eprintln!("[line {}] Error: expression has no defined value", n + 1);
                        eprintln!("{e:?}");

                        std::process::exit(65);
                    }
                }
            }
        }
    }
    Ok(())
}
