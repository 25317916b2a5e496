use std::fmt;

use log::{Level, Log, Metadata, Record};

/// Target of every record a session emits.
pub const LOG_TARGET: &str = "scram";

/// Forwards session events to the logger injected at construction instead of the global one.
#[derive(Clone, Copy)]
pub(crate) struct SessionLog<'a> {
    logger: &'a dyn Log,
}

impl<'a> SessionLog<'a> {
    pub(crate) fn new(logger: &'a dyn Log) -> Self {
        SessionLog { logger }
    }

    pub(crate) fn log(&self, level: Level, args: fmt::Arguments) {
        let metadata = Metadata::builder().level(level).target(LOG_TARGET).build();
        if !self.logger.enabled(&metadata) {
            return;
        }
        self.logger.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path_static(Some(module_path!()))
                .build(),
        );
    }

    pub(crate) fn trace(&self, args: fmt::Arguments) {
        self.log(Level::Trace, args)
    }

    pub(crate) fn debug(&self, args: fmt::Arguments) {
        self.log(Level::Debug, args)
    }

    pub(crate) fn info(&self, args: fmt::Arguments) {
        self.log(Level::Info, args)
    }

    pub(crate) fn warn(&self, args: fmt::Arguments) {
        self.log(Level::Warn, args)
    }
}

impl<'a> fmt::Debug for SessionLog<'a> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str("SessionLog")
    }
}
