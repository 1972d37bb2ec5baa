//! 批处理程序依赖的通用组件.

use std::env;
use std::path::PathBuf;

use log::LevelFilter;
use simple_logger::SimpleLogger;

const SEP: &str = "--------------------------------------------------------";

/// 数据根目录对应的环境变量.
pub const DATA_DIR_ENV: &str = "BRAIN_DATA_DIR";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获取数据根目录.
///
/// 1. 若环境变量 `$BRAIN_DATA_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/brain`;
/// 3. 无法确定用户主目录时返回 `None`.
pub fn data_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var(DATA_DIR_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => brain_berry::dataset::home_dataset_dir_with(["brain"]),
    }
}

/// 初始化日志. `verbose` 为真时输出 debug 级别日志, 否则只输出 info 及以上.
pub fn init_logger(verbose: bool) -> Result<(), log::SetLoggerError> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init()
}
