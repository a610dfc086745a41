use clap::Parser;
use colored::Colorize;

use reaccess::cli::Cli;
use reaccess::config::{get_config, init_config_from};
use reaccess::interfaces::cli::run_cli_command;
use reaccess::system::init_logging;

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_config_from(cli.config.as_deref());

    // guard 必须存活到进程结束，否则文件日志会丢失
    let _guard = match init_logging(&get_config().logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {}", "Failed to initialize logging:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{} {}", "Failed to start tokio runtime:".red().bold(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run_cli_command(cli.command)) {
        eprintln!("{}", e.format_colored());
        std::process::exit(1);
    }
}
