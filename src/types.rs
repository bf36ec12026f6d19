use std::str::FromStr;
use serde::Deserialize;

/// What the engine does when a runner is requested while it is already
/// executing further up the same call chain.
///
/// - `Skip`: emit a diagnostic and report success for the re-entered runner,
///   so the outer invocation carries on (default).
/// - `Fail`: emit the same diagnostic but report exit code 1, failing every
///   dependent up the chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    #[default]
    Skip,
    Fail,
}

impl FromStr for CyclePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(CyclePolicy::Skip),
            "fail" => Ok(CyclePolicy::Fail),
            other => Err(format!(
                "invalid on_cycle: {other} (expected \"skip\" or \"fail\")"
            )),
        }
    }
}
