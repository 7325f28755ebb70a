use solarlog::config::LoggingConfig;
use solarlog::logging::{
    LogContext, get_logger, get_logger_with_context, init_logging, level_rank, min_level,
    parse_log_level,
};
use tracing::Level;

#[test]
fn log_levels_parse_case_insensitively() {
    assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
    assert_eq!(parse_log_level("WARNING").unwrap(), Level::WARN);
    assert!(parse_log_level("loud").is_err());
}

#[test]
fn min_level_prefers_the_more_verbose() {
    assert_eq!(min_level(Level::INFO, Level::DEBUG), Level::DEBUG);
    assert_eq!(min_level(Level::ERROR, Level::WARN), Level::WARN);
    assert!(level_rank(Level::TRACE) < level_rank(Level::ERROR));
}

#[test]
fn init_logging_is_idempotent() {
    let config = LoggingConfig::default();
    assert!(init_logging(&config, true).is_ok());
    assert!(init_logging(&config, false).is_ok());

    let logger = get_logger_with_context(
        LogContext::new("scheduler")
            .with_operation("backfill")
            .with_field("date", "2024-01-02".to_string()),
    );
    logger.info("backfill started");
    get_logger("store").debug("opened");
}
