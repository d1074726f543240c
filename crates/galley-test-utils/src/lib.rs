//! Testing utilities for Galley workspace
//!
//! Canned raw responses and a recording observer.

#![allow(missing_docs)]

use galley_recovery::{Recovery, RecoveryObserver, Stage, StageEvent, StageOutcome};
use galley_core::RecoveryConfig;
use parking_lot::Mutex;
use std::sync::Arc;

/// Raw responses as they come back from the completion service
pub mod fixtures {
    pub const CLEAN_PAYLOAD: &str = r#"{"items":[{"kind":"error","original":"teh","suggestion":"the","reason":"typo","category":"spelling"}]}"#;

    pub const FENCED_PAYLOAD: &str = "Here is the review:\n```json\n{\"items\":[{\"kind\":\"error\",\"original\":\"teh\",\"suggestion\":\"the\",\"reason\":\"typo\",\"category\":\"spelling\"}]}\n```\nLet me know if you need more.";

    pub const TRACE_THEN_PAYLOAD: &str = r#"<think>considering whether "teh" is a typo. The [1] citation looks fine.</think>{"items":[{"kind":"error","original":"teh","suggestion":"the","reason":"typo","category":"spelling"}]}"#;

    pub const TRUNCATED_INSIDE_TRACE: &str =
        r#"<think>still thinking, no closing tag, {"items":[{"kind":"warning","orig"#;

    pub const EMPTY: &str = "";

    pub const STRAY_CLOSER: &str = r#"{"items":[{"kind":"error","original":"teh","suggestion":"the","reason":"typo","category":"spelling"]]}"#;

    pub const CHAT_ENVELOPE: &str = r#"{"id":"cmpl-1","object":"chat.completion","choices":[{"index":0,"message":{"role":"assistant","content":"{\"items\":[{\"kind\":\"suggestion\",\"original\":\"utilise\",\"suggestion\":\"utilize\",\"reason\":\"house style\",\"category\":\"style\"}]}"},"finish_reason":"stop"}]}"#;

    pub const PROSE_AROUND_PAYLOAD: &str = r#"As noted in [1] and {see below}, the findings are: [{"kind":"warning","original":"data is","suggestion":"data are","reason":"agreement","category":"grammar"},{"kind":"error","original":"recieve","suggestion":"receive","reason":"spelling","category":"spelling"}] Hope this helps."#;

    pub const SLOPPY_SYNTAX: &str = "{items: [{kind: error, original: 'teh', suggestion: 'the', reason: 'typo', category: spelling, start: 004, end: 007,},]}";

    pub const TRACE_ONLY: &str = "<think>The second sentence has a typo: \"recieve\" should be \"receive\". Otherwise fine.</think>";

    pub const GARBAGE: &str = "I'm sorry, I can't help with that request.";

    /// Every fixture, for blanket totality checks
    pub const ALL: &[&str] = &[
        CLEAN_PAYLOAD,
        FENCED_PAYLOAD,
        TRACE_THEN_PAYLOAD,
        TRUNCATED_INSIDE_TRACE,
        EMPTY,
        STRAY_CLOSER,
        CHAT_ENVELOPE,
        PROSE_AROUND_PAYLOAD,
        SLOPPY_SYNTAX,
        TRACE_ONLY,
        GARBAGE,
    ];
}

/// Observer that keeps every event it sees
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<StageEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<StageEvent> {
        self.events.lock().clone()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.events.lock().iter().map(|e| e.stage).collect()
    }

    pub fn outcome_of(&self, stage: Stage) -> Option<StageOutcome> {
        self.events
            .lock()
            .iter()
            .rev()
            .find(|e| e.stage == stage)
            .map(|e| e.outcome)
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl RecoveryObserver for RecordingObserver {
    fn on_stage(&self, event: &StageEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Pipeline wired to a fresh recording observer
pub fn recording_recovery(config: RecoveryConfig) -> (Recovery, Arc<RecordingObserver>) {
    let observer = RecordingObserver::new();
    let recovery = Recovery::new(config).with_observer(observer.clone());
    (recovery, observer)
}
