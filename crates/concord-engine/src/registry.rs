//! Pattern-based handler registry
//!
//! Registrations are `{kind, compiled pattern, handler}` tuples evaluated in
//! registration order. A pattern like `sections.{uid}` compiles once, at
//! registration time, to an anchored regex with a UID capture group. A
//! dispatched path matches either exactly (the handler fires, captures become
//! token matches) or as a dot-suffixed descendant (the pattern's own path is
//! reprocessed instead).

use crate::error::{HandlerFailure, SyncError};
use crate::event::{ChangeEvent, ChangeKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// Character class a `{uid}` token matches
pub const UID_PATTERN: &str = "[a-zA-Z0-9_-]+";

static UID_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\\{uid\\\}").unwrap_or_else(|_| unreachable!()));

/// A change handler
///
/// Errors propagate to the caller of the mutation or reconciliation that
/// triggered dispatch.
pub type Handler = Box<dyn FnMut(&ChangeEvent) -> Result<(), HandlerFailure>>;

/// Outcome of matching a dispatched path against one registration
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PathMatch {
    /// The dispatched path equals the pattern; captured UID tokens inside
    Exact(Vec<String>),
    /// The dispatched path is a descendant; the matched pattern path to
    /// reprocess
    Descendant(String),
}

pub(crate) struct Registration {
    kind: ChangeKind,
    pattern: Regex,
    handler: Handler,
}

impl Registration {
    /// Match a dispatched path against this registration's pattern
    fn evaluate(&self, path: &str) -> Option<PathMatch> {
        let captures = self.pattern.captures(path)?;
        let matched_path = captures.name("path")?.as_str().to_string();

        if captures.name("extra").is_some() {
            return Some(PathMatch::Descendant(matched_path));
        }

        // Group 0 is the full match, 1 the path group, and the final group
        // is `extra`; everything between is a UID capture, in pattern order.
        let tokens = (2..captures.len().saturating_sub(1))
            .filter_map(|i| captures.get(i))
            .map(|m| m.as_str().to_string())
            .collect();
        Some(PathMatch::Exact(tokens))
    }
}

/// Registry of change handlers plus reconciliation-completed callbacks
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    registrations: Vec<Registration>,
    completion: Vec<Box<dyn FnMut()>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("registrations", &self.registrations.len())
            .field("completion", &self.completion.len())
            .finish()
    }
}

impl HandlerRegistry {
    /// Register a handler for a change kind at a path pattern
    pub(crate) fn register(
        &mut self,
        kind: ChangeKind,
        pattern: &str,
        handler: Handler,
    ) -> Result<(), SyncError> {
        let compiled = compile_pattern(pattern)?;
        self.registrations.push(Registration {
            kind,
            pattern: compiled,
            handler,
        });
        Ok(())
    }

    /// Register a reconciliation-completed callback
    pub(crate) fn register_completion(&mut self, handler: Box<dyn FnMut()>) {
        self.completion.push(handler);
    }

    /// Fire every completion callback
    pub(crate) fn fire_completion(&mut self) {
        for handler in &mut self.completion {
            handler();
        }
    }

    /// Dispatch an event to matching handlers
    ///
    /// Returns the pattern paths whose registrations matched as descendants
    /// and therefore need reprocessing. The first handler error aborts the
    /// scan.
    pub(crate) fn dispatch(
        &mut self,
        kind: ChangeKind,
        event: &ChangeEvent,
    ) -> Result<Vec<String>, SyncError> {
        let path = event.path.to_string();
        let mut reprocess = Vec::new();

        for registration in &mut self.registrations {
            if registration.kind != kind {
                continue;
            }
            match registration.evaluate(&path) {
                Some(PathMatch::Descendant(base)) => reprocess.push(base),
                Some(PathMatch::Exact(tokens)) => {
                    let fired = event.with_tokens(tokens);
                    (registration.handler)(&fired).map_err(|source| SyncError::Handler {
                        path: path.clone(),
                        source,
                    })?;
                }
                None => {}
            }
        }

        Ok(reprocess)
    }
}

/// Compile a path pattern into its anchored matching regex
///
/// The dispatched path must equal the pattern (`path` group) or continue
/// past it with a `.` (`extra` group). `{uid}` placeholders become capture
/// groups over [`UID_PATTERN`].
fn compile_pattern(pattern: &str) -> Result<Regex, SyncError> {
    let quoted = regex::escape(pattern);
    let with_uids = UID_TOKEN.replace_all(&quoted, format!("({UID_PATTERN})"));
    let anchored = format!("^(?P<path>{with_uids})(?P<extra>\\..+)?$");
    Regex::new(&anchored).map_err(|source| SyncError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
