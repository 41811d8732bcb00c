use std::fs;

use common_log::config::{LogConfig, LoggerConfig};
use common_log::logger::Logger;
use serial_test::serial;

fn logger_config(target: &str, file: &str, level: &str) -> LoggerConfig {
    LoggerConfig {
        target_prefix: target.to_string(),
        log_directory: "logs".to_string(),
        log_file_name: file.to_string(),
        max_file_size: 1024 * 1024,
        max_zip_count: 2,
        level: level.to_string(),
    }
}

#[test]
#[serial]
fn test_build_creates_log_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::env::remove_var("LOG_OUTPUT_DIR");
    let config = LogConfig {
        log_root: dir.path().display().to_string(),
        loggers: vec![logger_config("root", "root.log", "info")],
    };

    assert!(Logger::build(&config).is_ok());
    assert!(dir.path().join("logs").is_dir());
}

#[test]
#[serial]
fn test_init_writes_to_target_file_once() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("LOG_OUTPUT_DIR", dir.path());
    let config = LogConfig {
        log_root: "unused".to_string(),
        loggers: vec![
            logger_config("root", "root.log", "info"),
            logger_config("test_logger", "target.log", "debug"),
        ],
    };

    common_log::init_with_config(config).unwrap();
    log::debug!("lock protocol message");
    log::logger().flush();

    let contents = fs::read_to_string(dir.path().join("logs").join("target.log")).unwrap();
    assert!(contents.contains("lock protocol message"));

    let again = LogConfig { log_root: ".".to_string(), loggers: vec![] };
    assert!(common_log::init_with_config(again).is_err());
    std::env::remove_var("LOG_OUTPUT_DIR");
}
