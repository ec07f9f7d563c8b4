use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use sentinel_config::SentinelConfig;
use sentinel_core::clock::display_zone;
use sentinel_core::{Calendar, LocaleClock, SystemClock};
use sentinel_notify::NotificationGateway;

use crate::action::{ActionReceipt, ActionRecorder, AgentAction};
use crate::buffer::{BufferEntry, ContextBuffer};
use crate::journal::DailyDocument;
use crate::writer::{LogContent, LogOptions, LogReceipt, LogWriter};

/// Build the system clock described by `[clock]`.
pub fn clock_from_config(config: &SentinelConfig) -> LocaleClock {
    LocaleClock::new(
        Arc::new(SystemClock),
        display_zone(&config.clock.display_timezone),
        Calendar::from_name(&config.clock.calendar_timezone),
    )
}

/// Everything an agent process needs, wired from one config.
#[derive(Debug, Clone)]
pub struct Sentinel {
    clock: LocaleClock,
    recorder: ActionRecorder,
    writer: LogWriter,
    buffer: ContextBuffer,
    notifier: Arc<NotificationGateway>,
}

impl Sentinel {
    pub fn from_config(config: &SentinelConfig) -> Result<Self> {
        let clock = clock_from_config(config);
        let gateway = NotificationGateway::from_config(config, clock.clone())?;
        Ok(Self::with_gateway(config, clock, Arc::new(gateway)))
    }

    /// Wire components around an existing clock and gateway.
    pub fn with_gateway(
        config: &SentinelConfig,
        clock: LocaleClock,
        notifier: Arc<NotificationGateway>,
    ) -> Self {
        let paths = config.paths();
        let journal = DailyDocument::journal(&paths.logs_dir, clock.clone());
        let action_log = DailyDocument::action_log(
            &paths.raw_logs_dir,
            paths.action_log_prefix.clone(),
            clock.clone(),
        );

        Self {
            recorder: ActionRecorder::new(action_log),
            writer: LogWriter::new(journal, Some(notifier.clone())),
            buffer: ContextBuffer::new(&paths.buffer_file, clock.clone()),
            notifier,
            clock,
        }
    }

    pub fn record_action(&self, action: &AgentAction) -> Result<ActionReceipt> {
        self.recorder.record(action)
    }

    pub fn ensure_journal(&self) -> Result<PathBuf> {
        self.writer.journal().ensure()
    }

    pub fn write_log(&self, content: &LogContent, options: LogOptions) -> Result<LogReceipt> {
        self.writer.write(content, options)
    }

    pub fn push_semantic_context(&self, data: BufferEntry) -> Result<usize> {
        self.buffer.push(data)
    }

    pub fn consume_buffer(&self) -> Result<Option<Vec<BufferEntry>>> {
        self.buffer.consume()
    }

    pub fn current_timestamp(&self) -> String {
        self.clock.timestamp()
    }

    pub fn buffer(&self) -> &ContextBuffer {
        &self.buffer
    }

    pub fn journal(&self) -> &DailyDocument {
        self.writer.journal()
    }

    pub fn action_log(&self) -> &DailyDocument {
        self.recorder.document()
    }

    pub fn notifier(&self) -> &NotificationGateway {
        &self.notifier
    }
}
