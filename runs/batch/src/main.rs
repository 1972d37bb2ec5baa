//! 批量处理受试者, 生成白质 / 灰质 / 脑脊液体积特征表.
//!
//! 目录约定见 `brain_berry::dataset`. 中断后重新运行会跳过结果表中已有的受试者.

use std::process::ExitCode;

use clap::Parser;
use log::error;

mod args;
mod runner;

fn main() -> ExitCode {
    let args = args::Args::parse();
    if let Err(e) = utils::init_logger(args.verbose) {
        eprintln!("cannot initialise logger: {e}");
    }

    match runner::run(&args) {
        Ok(summary) => {
            utils::sep();
            println!(
                "processed: {}, already processed: {}, skipped: {}, without volume: {}",
                summary.processed, summary.resumed, summary.skipped, summary.missing
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
