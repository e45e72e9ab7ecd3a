//! Action provenance.

use std::fmt;
use std::panic::Location;

use serde::{Deserialize, Serialize};

/// Where an action was dispatched from, plus a free-text trace.
///
/// Bridged actions keep the trigger's `{file, function, line}` and append
/// their own causality to `info`, so a consumer always sees where in the app
/// the chain started.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionSource {
    pub file: String,
    pub function: String,
    pub line: u32,
    pub info: Option<String>,
}

impl ActionSource {
    pub fn new(file: impl Into<String>, function: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            function: function.into(),
            line,
            info: None,
        }
    }

    /// Source at the caller's location. `function` is not recoverable at
    /// runtime, so it is left as `"<unknown>"`; prefer [`action_source!`]
    /// when the enclosing module path matters.
    ///
    /// [`action_source!`]: crate::action_source
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(location.file(), "<unknown>", location.line())
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Provenance for an action derived from `self` by the bridge declared at
    /// `origin`.
    pub fn bridged(&self, action_repr: &str, origin: &ActionSource) -> ActionSource {
        let trace = format!(
            "Bridged from {action_repr} at {}, {}:{}",
            origin.file, origin.function, origin.line
        );
        let info = match &self.info {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{trace}"),
            _ => trace,
        };

        ActionSource {
            file: self.file.clone(),
            function: self.function.clone(),
            line: self.line,
            info: Some(info),
        }
    }
}

impl fmt::Display for ActionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}:{}", self.file, self.function, self.line)?;
        if let Some(info) = &self.info {
            write!(f, " ({info})")?;
        }
        Ok(())
    }
}

/// Capture the current `file!()`, `module_path!()` and `line!()` as an
/// [`ActionSource`].
///
/// ```
/// let here = relay_bridge::action_source!();
/// assert_eq!(here.function, module_path!());
/// ```
#[macro_export]
macro_rules! action_source {
    () => {
        $crate::ActionSource::new(file!(), module_path!(), line!())
    };
    ($info:expr) => {
        $crate::ActionSource::new(file!(), module_path!(), line!()).with_info($info)
    };
}
