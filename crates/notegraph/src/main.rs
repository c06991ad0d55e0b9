use clap::Parser;
use notegraph::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    notegraph::logging::init(&args.log_level);

    let output = cli::execute(&args.command)?;
    print!("{}", output);
    Ok(())
}
