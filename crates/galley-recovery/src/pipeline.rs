//! Recovery pipeline
//!
//! Stages run top to bottom, each consuming the previous stage's
//! best-effort output:
//! 1. Envelope and escape normalization
//! 2. Reasoning-trace stripping
//! 3. Fence and markup stripping
//! 4. Boundary location, then the repair ladder with validation
//! 5. Field harvesting
//! 6. Trace synthesis
//! 7. Guaranteed fallback
//!
//! # Guarantee
//!
//! [`Recovery::recover`] never fails and never returns an empty list.

use crate::boundary::{locate, naive_region};
use crate::envelope::normalize;
use crate::error::RungError;
use crate::fallback::guaranteed_fallback;
use crate::markup::{strip_markup, strip_markup_unfenced};
use crate::observer::{RecoveryObserver, Stage, StageEvent, StageOutcome, TracingObserver};
use crate::reconstruct::{harvest_fields, synthesize_from_trace};
use crate::repair::Rung;
use crate::scan::has_opener;
use crate::trace::{strip_reasoning, TraceStrip};
use crate::validate::{structural_parse, Validator};
use galley_core::{AnnotationItem, AnnotationList, IdAllocator, RecoveryConfig, Span};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// How the annotations were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPath {
    /// A ladder rung produced an accepted list
    Parsed {
        /// Winning rung
        rung: Rung,
        /// Payload was found inside the reasoning trace
        from_trace: bool,
    },
    /// Rebuilt from harvested field fragments
    Harvested,
    /// Synthesized from reasoning-trace sentences
    TraceSynthesized,
    /// Guaranteed fallback item
    Fallback,
}

impl RecoveryPath {
    /// Anything other than a parsed payload
    ///
    /// Callers may use this to decide whether to retry the completion call.
    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !matches!(self, RecoveryPath::Parsed { .. })
    }
}

impl fmt::Display for RecoveryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryPath::Parsed {
                rung,
                from_trace: false,
            } => write!(f, "parsed ({rung})"),
            RecoveryPath::Parsed {
                rung,
                from_trace: true,
            } => write!(f, "parsed from trace ({rung})"),
            RecoveryPath::Harvested => f.write_str("harvested"),
            RecoveryPath::TraceSynthesized => f.write_str("trace-synthesized"),
            RecoveryPath::Fallback => f.write_str("fallback"),
        }
    }
}

/// Result of one recovery run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Recovered annotations, never empty
    pub annotations: AnnotationList,
    /// Stage that produced them
    pub path: RecoveryPath,
    /// A reasoning trace was detected
    pub had_trace: bool,
}

/// Configured recovery pipeline
///
/// Holds no per-run state and can be shared across threads.
#[derive(Clone)]
pub struct Recovery {
    config: RecoveryConfig,
    observer: Arc<dyn RecoveryObserver>,
}

impl Recovery {
    /// Create pipeline reporting to `tracing`
    ///
    /// Values [`RecoveryConfig::validate`] rejects are replaced by their
    /// defaults, so a blank placeholder can never reach an item.
    #[must_use]
    pub fn new(config: RecoveryConfig) -> Self {
        if let Err(err) = config.validate() {
            tracing::warn!(error = %err, "Invalid recovery config, using defaults for rejected values");
        }
        Self {
            config: config.sanitized(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// With observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RecoveryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Recover annotations from a raw completion response
    ///
    /// `document` is the proofread text; it is only consulted when
    /// [`RecoveryConfig::anchor_spans`] is set.
    #[must_use]
    pub fn recover(&self, raw: &str, document: &str) -> RecoveryReport {
        let mut run = Run {
            config: &self.config,
            observer: self.observer.as_ref(),
            validator: Validator::new(&self.config, document),
            ids: IdAllocator::new(),
        };

        let normalized = run.normalize(raw);
        let stripped = run.strip_trace(&normalized);
        let text = run.strip_markup(&stripped.text);
        let (annotations, path) = run.resolve(&text, &stripped.text, stripped.trace.as_deref());

        tracing::debug!("Recovered {} annotations via {}", annotations.len(), path);
        RecoveryReport {
            annotations,
            path,
            had_trace: stripped.had_trace(),
        }
    }
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new(RecoveryConfig::default())
    }
}

impl fmt::Debug for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recovery")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// State of a single invocation
struct Run<'a> {
    config: &'a RecoveryConfig,
    observer: &'a dyn RecoveryObserver,
    validator: Validator<'a>,
    ids: IdAllocator,
}

impl Run<'_> {
    fn emit(&self, stage: Stage, outcome: StageOutcome, detail: impl Into<String>) {
        self.observer
            .on_stage(&StageEvent::new(stage, outcome, detail));
    }

    fn normalize(&self, raw: &str) -> String {
        let normalized = normalize(raw, &self.config.list_keys, self.config.max_envelope_depth);
        let outcome = if normalized == raw {
            StageOutcome::Unchanged
        } else {
            StageOutcome::Changed
        };
        self.emit(
            Stage::Normalize,
            outcome,
            format!("{} -> {} bytes", raw.len(), normalized.len()),
        );
        normalized
    }

    fn strip_trace(&self, text: &str) -> TraceStrip {
        let stripped = strip_reasoning(text);
        match &stripped.trace {
            Some(trace) => self.emit(
                Stage::StripTrace,
                StageOutcome::Changed,
                format!("removed {} bytes of reasoning", trace.len()),
            ),
            None => self.emit(Stage::StripTrace, StageOutcome::Unchanged, "no trace markers"),
        }
        stripped
    }

    fn strip_markup(&self, text: &str) -> String {
        let stripped = strip_markup(text);
        let outcome = if stripped == text {
            StageOutcome::Unchanged
        } else {
            StageOutcome::Changed
        };
        self.emit(
            Stage::StripMarkup,
            outcome,
            format!("{} -> {} bytes", text.len(), stripped.len()),
        );
        stripped
    }

    fn resolve(
        &mut self,
        text: &str,
        marked_up: &str,
        trace: Option<&str>,
    ) -> (AnnotationList, RecoveryPath) {
        if let Some(found) = self.parse(text, marked_up, trace) {
            return found;
        }
        if let Some(found) = self.harvest(text, trace) {
            return found;
        }
        if let Some(found) = self.synthesize(trace) {
            return found;
        }
        self.fallback()
    }

    /// Decode the stripped text, or the trace when the text has no payload
    ///
    /// When a selected fence yields nothing, the text is decoded again with
    /// only its tags removed.
    fn parse(
        &mut self,
        text: &str,
        marked_up: &str,
        trace: Option<&str>,
    ) -> Option<(AnnotationList, RecoveryPath)> {
        let mut decoded = self.decode(text);
        if decoded.is_none() {
            let unfenced = strip_markup_unfenced(marked_up);
            if unfenced != text {
                self.emit(
                    Stage::StripMarkup,
                    StageOutcome::Changed,
                    "retrying without fence selection",
                );
                decoded = self.decode(&unfenced);
            }
        }
        if let Some((items, rung)) = decoded {
            let path = RecoveryPath::Parsed {
                rung,
                from_trace: false,
            };
            return Some((AnnotationList::from_items(items)?, path));
        }

        let trace = trace.filter(|_| !has_opener(text))?;
        let (items, rung) = self.decode(&strip_markup(trace))?;
        let path = RecoveryPath::Parsed {
            rung,
            from_trace: true,
        };
        Some((AnnotationList::from_items(items)?, path))
    }

    /// Locate a candidate and climb the ladder on it
    ///
    /// If the longest parseable region is not an annotation list, the naive
    /// region gets its own climb.
    fn decode(&mut self, text: &str) -> Option<(Vec<AnnotationItem>, Rung)> {
        let Some(boundary) = locate(text, self.config.max_boundary_starts) else {
            self.emit(Stage::LocateBoundary, StageOutcome::Skipped, "no opening bracket");
            return None;
        };
        let outcome = if boundary.text.len() == text.len() {
            StageOutcome::Unchanged
        } else {
            StageOutcome::Changed
        };
        self.emit(
            Stage::LocateBoundary,
            outcome,
            format!(
                "bytes {}..{} ({})",
                boundary.start,
                boundary.end,
                if boundary.parsed { "parsed" } else { "naive" }
            ),
        );

        let mut tried = HashSet::new();
        if let Some(found) = self.climb(boundary.text, &mut tried) {
            return Some(found);
        }
        if !boundary.parsed {
            return None;
        }
        let naive = naive_region(text)?;
        if naive.text == boundary.text {
            return None;
        }
        self.emit(
            Stage::LocateBoundary,
            StageOutcome::Changed,
            format!("retrying naive region {}..{}", naive.start, naive.end),
        );
        self.climb(naive.text, &mut tried)
    }

    fn climb(
        &mut self,
        candidate: &str,
        tried: &mut HashSet<String>,
    ) -> Option<(Vec<AnnotationItem>, Rung)> {
        for rung in Rung::LADDER {
            let attempt = rung.apply(candidate);
            if !tried.insert(attempt.clone()) {
                self.emit(
                    Stage::Repair(rung),
                    StageOutcome::Skipped,
                    "output identical to an earlier attempt",
                );
                continue;
            }
            match self.accept(&attempt) {
                Ok(items) => {
                    self.emit(
                        Stage::Repair(rung),
                        StageOutcome::Accepted(items.len()),
                        "candidate accepted",
                    );
                    return Some((items, rung));
                }
                Err(err) => self.emit(Stage::Repair(rung), StageOutcome::Rejected, err.to_string()),
            }
        }
        None
    }

    fn accept(&mut self, text: &str) -> Result<Vec<AnnotationItem>, RungError> {
        let value = structural_parse(text)?;
        Ok(self.validator.validate(&value, &mut self.ids)?)
    }

    fn harvest(&mut self, text: &str, trace: Option<&str>) -> Option<(AnnotationList, RecoveryPath)> {
        let mut items = harvest_fields(text, self.config, &mut self.ids);
        if items.is_empty() {
            if let Some(trace) = trace {
                items = harvest_fields(trace, self.config, &mut self.ids);
            }
        }

        if items.is_empty() {
            self.emit(Stage::Harvest, StageOutcome::Rejected, "no field fragments");
            return None;
        }
        self.emit(
            Stage::Harvest,
            StageOutcome::Accepted(items.len()),
            "zipped field fragments",
        );
        self.anchor(&mut items);
        Some((AnnotationList::from_items(items)?, RecoveryPath::Harvested))
    }

    fn synthesize(&mut self, trace: Option<&str>) -> Option<(AnnotationList, RecoveryPath)> {
        let Some(trace) = trace else {
            self.emit(Stage::TraceSynthesis, StageOutcome::Skipped, "no reasoning trace");
            return None;
        };
        let mut items = synthesize_from_trace(trace, self.config, &mut self.ids);
        self.emit(
            Stage::TraceSynthesis,
            StageOutcome::Accepted(items.len()),
            "synthesized from reasoning",
        );
        self.anchor(&mut items);
        Some((AnnotationList::from_items(items)?, RecoveryPath::TraceSynthesized))
    }

    fn fallback(&mut self) -> (AnnotationList, RecoveryPath) {
        let item = guaranteed_fallback(self.config, &mut self.ids);
        self.emit(
            Stage::Fallback,
            StageOutcome::Accepted(1),
            "no stage recovered any annotation",
        );
        (AnnotationList::single(item), RecoveryPath::Fallback)
    }

    /// Anchor reconstructed items that carry no span
    fn anchor(&self, items: &mut [AnnotationItem]) {
        for item in items.iter_mut().filter(|item| item.span == Span::default()) {
            if let Some(span) = self.validator.anchor(&item.original) {
                item.span = span;
            }
        }
    }
}
