/* Log records go to stderr, so reports on stdout stay clean */

use std::io::Write;

use log::{LevelFilter, Log, Metadata, Record};

pub struct Logger {
    level: LevelFilter,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
        Logger { level }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /* Installs the global logger. Only the first call of a process takes effect. */
    pub fn init(verbose: bool) -> Result<(), log::SetLoggerError> {
        let logger = Logger::new(verbose);
        log::set_max_level(logger.level);
        log::set_boxed_logger(Box::new(logger))
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _ = writeln!(std::io::stderr().lock(), "[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use log::Level;

    use super::*;

    #[test]
    fn test_levels() {
        let logger = Logger::new(false);
        assert_eq!(logger.level(), LevelFilter::Info);
        assert!(logger.enabled(&Metadata::builder().level(Level::Warn).build()));
        assert!(!logger.enabled(&Metadata::builder().level(Level::Debug).build()));

        let verbose = Logger::new(true);
        assert!(verbose.enabled(&Metadata::builder().level(Level::Debug).build()));
        assert!(!verbose.enabled(&Metadata::builder().level(Level::Trace).build()));
    }
}
