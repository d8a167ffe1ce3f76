//! Scans agent output text for the fixed set of in-band control signals
//! described below. Stateless: each call is independent.
//!
//! Signals are wrapped in a document-level delimiter pair shared between
//! the (external, non-goal) prompt generator and this parser:
//!
//! ```text
//! <<<SIGNAL:TAG>>>reason text, possibly
//! spanning more than one line<<<END_SIGNAL>>>
//! ```
//!
//! `COMPLETE` carries no reason and may omit the closing delimiter. The
//! parser only recognizes a tag inside its delimiter pair, so a bare mention
//! of e.g. "blocked" in prose never triggers a false match.

use once_cell::sync::Lazy;
use regex::Regex;

use tasksmith_types::Signal;

const OPEN_PREFIX: &str = "<<<SIGNAL:";
const OPEN_SUFFIX: &str = ">>>";
const CLOSE: &str = "<<<END_SIGNAL>>>";

/// Priority-ordered tag table, co-located with the signal enumeration per
/// a single constant table rather than
/// module-global state). `COMPLETE` always wins if present; ties among the
/// rest are broken by first-occurrence offset, which [`parse`] enforces by
/// scanning the whole table and keeping the earliest match.
const SIGNAL_TAGS: &[&str] = &[
    "COMPLETE",
    "EJECT",
    "BLOCKED",
    "APPROVAL_NEEDED",
    "INPUT_NEEDED",
    "REVIEW_REQUESTED",
    "CONTENT_REVIEW",
    "ESCALATE",
    "CHECKPOINT",
];

static TAG_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    SIGNAL_TAGS
        .iter()
        .map(|tag| {
            let pattern = format!(
                r"(?s){}{}{}(.*?)(?:{}|$)",
                regex::escape(OPEN_PREFIX),
                regex::escape(tag),
                regex::escape(OPEN_SUFFIX),
                regex::escape(CLOSE),
            );
            (*tag, Regex::new(&pattern).expect("valid signal regex"))
        })
        .collect()
});

fn build_signal(tag: &str, reason: String) -> Signal {
    let reason = reason.trim().to_string();
    match tag {
        "COMPLETE" => Signal::Complete,
        "EJECT" => Signal::Eject(reason),
        "BLOCKED" => Signal::Blocked(reason),
        "APPROVAL_NEEDED" => Signal::ApprovalNeeded(reason),
        "INPUT_NEEDED" => Signal::InputNeeded(reason),
        "REVIEW_REQUESTED" => Signal::ReviewRequested(reason),
        "CONTENT_REVIEW" => Signal::ContentReview(reason),
        "ESCALATE" => Signal::Escalate(reason),
        "CHECKPOINT" => Signal::Checkpoint(reason),
        _ => unreachable!("tag table is exhaustive"),
    }
}

/// Scans `text` for the first occurrence of any recognized signal.
/// Returns `(Signal::None, "")` if no delimited signal token is present.
pub fn parse(text: &str) -> (Signal, String) {
    // COMPLETE takes absolute priority regardless of offset.
    if let Some((_, re)) = TAG_PATTERNS.iter().find(|(tag, _)| *tag == "COMPLETE") {
        if re.is_match(text) {
            return (Signal::Complete, String::new());
        }
    }

    let mut best: Option<(usize, &str, String)> = None;
    for (tag, re) in TAG_PATTERNS.iter() {
        if *tag == "COMPLETE" {
            continue;
        }
        if let Some(captures) = re.captures(text) {
            let offset = captures.get(0).map(|g| g.start()).unwrap_or(0);
            let reason = captures.get(1).map(|g| g.as_str()).unwrap_or("").to_string();
            match &best {
                Some((best_offset, _, _)) if *best_offset <= offset => {}
                _ => best = Some((offset, tag, reason)),
            }
        }
    }

    match best {
        Some((_, tag, reason)) => {
            let signal = build_signal(tag, reason.clone());
            (signal, reason)
        }
        None => (Signal::None, String::new()),
    }
}
