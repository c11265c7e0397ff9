use balance_report::{
    arguments::{self, print_help},
    config::ToolConfig,
    logger::{self, LogTag},
    report,
};

/// Entry point for the balance report tool.
///
/// Usage: balance-report <settings.json> [--debug]
///
/// The run either completes the whole batch or exits non-zero after the
/// first pre-loop failure; per-address indexer failures only reach the
/// error file.
#[tokio::main]
async fn main() {
    arguments::set_cmd_args(std::env::args().collect());

    if arguments::is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    let settings_path = match arguments::get_settings_file_path() {
        Some(path) => path,
        None => {
            print_help();
            std::process::exit(0);
        }
    };

    logger::info(LogTag::System, "Balance report starting up");

    let config = match ToolConfig::load(&settings_path) {
        Ok(config) => config,
        Err(error) => {
            logger::error(LogTag::Config, &format!("{:#}", error));
            std::process::exit(1);
        }
    };

    logger::info(
        LogTag::Config,
        &format!(
            "Wallet type: {:?}, result file: {}",
            config.wallet_type, config.result_file_path
        ),
    );

    if let Err(error) = report::run(&config).await {
        logger::error(LogTag::System, &format!("Batch failed: {:#}", error));
        std::process::exit(1);
    }
}
