// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Log module provides various log functions, reference
//! https://docs.rs/log4rs
//!
//! Records go to the frontend's log interface when it offers one,
//! otherwise to stderr; a log file can be added through config.

use crate::config::LogConfig;
use crate::retro::abi::{
    retro_log_printf_t, RETRO_LOG_DEBUG, RETRO_LOG_ERROR, RETRO_LOG_INFO, RETRO_LOG_WARN,
};
use log::{Level, Record};
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
        Append,
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Handle,
};
use std::ffi::{c_uint, CString};
use std::fmt;
use std::sync::OnceLock;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {l} {t} {m}{n}";

static LOG_HANDLE: OnceLock<Handle> = OnceLock::new();

/// Appender writing through the frontend's `retro_log_printf_t`
pub struct HostLogAppender {
    printf: retro_log_printf_t,
}

impl HostLogAppender {
    pub fn new(printf: retro_log_printf_t) -> Self {
        Self { printf }
    }
}

impl fmt::Debug for HostLogAppender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostLogAppender")
    }
}

fn host_level(level: Level) -> c_uint {
    match level {
        Level::Error => RETRO_LOG_ERROR,
        Level::Warn => RETRO_LOG_WARN,
        Level::Info => RETRO_LOG_INFO,
        Level::Debug | Level::Trace => RETRO_LOG_DEBUG,
    }
}

impl Append for HostLogAppender {
    fn append(&self, record: &Record) -> anyhow::Result<()> {
        let line = format!("[{}] {}\n", record.target(), record.args()).replace('\0', " ");
        let msg = CString::new(line)?;
        unsafe {
            (self.printf)(host_level(record.level()), c"%s".as_ptr(), msg.as_ptr());
        }
        Ok(())
    }

    fn flush(&self) {}
}

/// init logs system
///
/// Safe to call again after a deinit: the running logger gets the new
/// config instead of failing on a second registration.
pub fn init_log(config: &LogConfig, host: Option<retro_log_printf_t>) {
    let level = config.level;
    let mut builder = Config::builder();
    let mut root = Root::builder();
    let mut file_error = None;

    match host {
        Some(printf) => {
            builder = builder.appender(
                Appender::builder()
                    .filter(Box::new(ThresholdFilter::new(level)))
                    .build("host", Box::new(HostLogAppender::new(printf))),
            );
            root = root.appender("host");
        }
        None => {
            let stderr = ConsoleAppender::builder()
                .target(Target::Stderr)
                .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
                .build();
            builder = builder.appender(
                Appender::builder()
                    .filter(Box::new(ThresholdFilter::new(level)))
                    .build("stderr", Box::new(stderr)),
            );
            root = root.appender("stderr");
        }
    }

    if let Some(path) = &config.file {
        match FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build(path)
        {
            Ok(logfile) => {
                builder = builder.appender(
                    Appender::builder()
                        .filter(Box::new(ThresholdFilter::new(level)))
                        .build("logfile", Box::new(logfile)),
                );
                root = root.appender("logfile");
            }
            Err(e) => file_error = Some(format!("cannot open log file {:?}: {}", path, e)),
        }
    }

    let config = match builder.build(root.build(level)) {
        Ok(c) => c,
        Err(_) => return,
    };
    match LOG_HANDLE.get() {
        Some(handle) => handle.set_config(config),
        None => {
            // another logger may already own the facade (tests, host apps)
            if let Ok(handle) = log4rs::init_config(config) {
                let _ = LOG_HANDLE.set(handle);
            }
        }
    }
    if let Some(msg) = file_error {
        log::warn!("{}", msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_levels() {
        assert_eq!(host_level(Level::Error), RETRO_LOG_ERROR);
        assert_eq!(host_level(Level::Warn), RETRO_LOG_WARN);
        assert_eq!(host_level(Level::Info), RETRO_LOG_INFO);
        assert_eq!(host_level(Level::Trace), RETRO_LOG_DEBUG);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let cfg = LogConfig::default();
        init_log(&cfg, None);
        init_log(&cfg, None);
        log::info!("logger re-initialized");
    }
}
