use async_trait::async_trait;
use chrono::Utc;
use relay_types::EventPayload;
use std::fmt;
use std::str::FromStr;

use crate::error::StepError;
use crate::poll_loop::PollStep;
use crate::sink::EventSink;

/// Synthetic event sources, no backing service needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    Counter,
    Timestamp,
    Custom,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 3] = [
        GeneratorKind::Counter,
        GeneratorKind::Timestamp,
        GeneratorKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorKind::Counter => "counter",
            GeneratorKind::Timestamp => "timestamp",
            GeneratorKind::Custom => "custom",
        }
    }

    fn payload(&self, count: u64) -> EventPayload {
        match self {
            GeneratorKind::Counter => EventPayload::Counter { count },
            GeneratorKind::Timestamp => EventPayload::Timestamp {
                current_time: Utc::now().to_rfc3339(),
                message: format!("Update #{}", count),
            },
            GeneratorKind::Custom => EventPayload::Custom {
                data: format!("Custom data #{}", count),
            },
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneratorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GeneratorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let available: Vec<&str> = GeneratorKind::ALL.iter().map(|k| k.as_str()).collect();
                format!(
                    "Unsupported data_type: {}. Available types: {}",
                    s,
                    available.join(", ")
                )
            })
    }
}

/// Emits one synthetic event per cycle with an increasing count
pub struct GeneratorStep {
    kind: Result<GeneratorKind, String>,
    count: u64,
}

impl GeneratorStep {
    /// Unknown names are accepted here and reported as a single error event on start
    pub fn new(data_type: &str) -> Self {
        Self {
            kind: data_type.parse(),
            count: 0,
        }
    }
}

#[async_trait]
impl PollStep for GeneratorStep {
    fn kind(&self) -> &'static str {
        match &self.kind {
            Ok(kind) => kind.as_str(),
            Err(_) => "generator",
        }
    }

    async fn bootstrap(&mut self, _sink: &mut EventSink) -> Result<(), StepError> {
        match &self.kind {
            Ok(_) => Ok(()),
            Err(message) => Err(StepError::Precondition(message.clone())),
        }
    }

    async fn poll(&mut self, sink: &mut EventSink) -> Result<(), StepError> {
        let kind = self
            .kind
            .as_ref()
            .map_err(|message| StepError::Precondition(message.clone()))?;

        sink.emit(kind.payload(self.count)).await?;
        self.count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!("counter".parse::<GeneratorKind>(), Ok(GeneratorKind::Counter));
        assert_eq!("custom".parse::<GeneratorKind>(), Ok(GeneratorKind::Custom));

        let err = "weather".parse::<GeneratorKind>().unwrap_err();
        assert_eq!(
            err,
            "Unsupported data_type: weather. Available types: counter, timestamp, custom"
        );
    }

    #[test]
    fn test_payloads() {
        assert_eq!(GeneratorKind::Counter.payload(4), EventPayload::Counter { count: 4 });
        assert_eq!(
            GeneratorKind::Custom.payload(1),
            EventPayload::Custom {
                data: "Custom data #1".to_string()
            }
        );

        match GeneratorKind::Timestamp.payload(2) {
            EventPayload::Timestamp { message, .. } => assert_eq!(message, "Update #2"),
            other => panic!("unexpected payload: {:?}", other),
        }
    }
}
