//! Scenario reports
//!
//! A `Recorder` is shared between the scenario driver and the controller
//! callbacks; it stamps each event with the timer service clock.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};

use cadence_core::TimerService;
use serde::Serialize;

use crate::error::Result;

/// One observed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub at_ms: u64,
    pub kind: String,
    pub detail: String,
}

/// Timestamped event sink
#[derive(Clone)]
pub struct Recorder {
    clock: Arc<dyn TimerService>,
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new(clock: Arc<dyn TimerService>) -> Self {
        Self {
            clock,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn record(&self, kind: &str, detail: impl Into<String>) {
        let event = Event {
            at_ms: self.clock.now().as_millis(),
            kind: kind.to_string(),
            detail: detail.into(),
        };
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Close out the scenario
    pub fn finish(&self, scenario: &str) -> Report {
        Report {
            scenario: scenario.to_string(),
            events: self.events(),
            summary: BTreeMap::new(),
        }
    }
}

/// Everything a scenario observed
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub scenario: String,
    pub events: Vec<Event>,
    pub summary: BTreeMap<String, String>,
}

impl Report {
    pub fn with_summary(mut self, key: &str, value: impl ToString) -> Self {
        self.summary.insert(key.to_string(), value.to_string());
        self
    }

    pub fn render(&self, json: bool) -> Result<String> {
        if json {
            return Ok(serde_json::to_string_pretty(self)?);
        }

        let mut out = format!("{} scenario\n", self.scenario);
        for event in &self.events {
            let _ = writeln!(
                out,
                "  {:>6}ms  {:<10} {}",
                event.at_ms, event.kind, event.detail
            );
        }
        for (key, value) in &self.summary {
            let _ = writeln!(out, "  {}: {}", key, value);
        }
        Ok(out)
    }
}
