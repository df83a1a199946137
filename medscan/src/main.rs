use clap::Parser;
use medscan::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    medscan::init_logger(cli.verbose);
    medscan::run(cli)
}
