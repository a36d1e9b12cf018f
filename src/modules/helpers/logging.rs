use fern::Dispatch;
use snafu::ResultExt;

use crate::config::Config;
use crate::errors::{CustomResult, LoggingSnafu};

pub fn setup_logging(config: &Config) -> CustomResult<()> {
    let base_config = fern::Dispatch::new().level(config.logging_level);

    let log_file = fern::log_file(&config.log_file)
        .map_err(fern::InitError::Io)
        .context(LoggingSnafu)?;

    let file_logger_config = Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .chain(log_file);

    base_config
        .chain(file_logger_config)
        .apply()
        .map_err(fern::InitError::SetLoggerError)
        .context(LoggingSnafu)?;

    Ok(())
}
