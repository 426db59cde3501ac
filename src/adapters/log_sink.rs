//! Event sink adapter that turns [`AppEvent`]s into log lines.
//!
//! Alert severity maps onto log level, so the serial console shows the
//! same prioritisation the cloud alert feed would.

use log::{error, info, warn};

use crate::app::events::{AlertLevel, AppEvent};
use crate::app::ports::EventSink;

#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { position } => {
                info!("started at position {}", position.as_str());
            }
            AppEvent::PositionChanged { from, to } => {
                info!("position {} -> {}", from.as_str(), to.as_str());
            }
            AppEvent::Alert { level, message } => match level {
                AlertLevel::Info => info!("[{}] {}", level.as_str(), message),
                AlertLevel::Warning => warn!("[{}] {}", level.as_str(), message),
                AlertLevel::Emergency | AlertLevel::Error => {
                    error!("[{}] {}", level.as_str(), message);
                }
            },
            AppEvent::ManualCommandAccepted { target } => {
                info!("manual command accepted: {:?}", target);
            }
            AppEvent::ManualCommandCompleted { target } => {
                info!("manual command completed: {:?}", target);
            }
        }
    }
}
