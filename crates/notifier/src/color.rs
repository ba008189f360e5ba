//! Highlight color selection.

use slack_common::env::EnvSnapshot;

/// Grey, used when nothing indicates an outcome.
pub const DEFAULT_COLOR: &str = "#cfd3d7";
/// Green
pub const SUCCESS_COLOR: &str = "#33ad7f";
/// Red
pub const FAILURE_COLOR: &str = "#a1040c";

/// Build status exposed by the CI system the process runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiSignal<'a> {
    Drone { status: &'a str },
    Vela { status: &'a str },
}

impl<'a> CiSignal<'a> {
    /// Detect the CI system from its marker variable. Drone is checked before Vela.
    pub fn detect(env: &'a EnvSnapshot) -> Option<Self> {
        if env.is_true("DRONE") {
            Some(CiSignal::Drone {
                status: env.get("DRONE_BUILD_STATUS").unwrap_or_default(),
            })
        } else if env.is_true("VELA") {
            Some(CiSignal::Vela {
                status: env.get("VELA_BUILD_STATUS").unwrap_or_default(),
            })
        } else {
            None
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            CiSignal::Drone { status } => match *status {
                "success" => SUCCESS_COLOR,
                "failure" | "error" | "killed" => FAILURE_COLOR,
                _ => DEFAULT_COLOR,
            },
            // Within a step, Vela reports `running` while no earlier step has failed
            CiSignal::Vela { status } => match *status {
                "success" | "running" => SUCCESS_COLOR,
                "failure" | "error" => FAILURE_COLOR,
                _ => DEFAULT_COLOR,
            },
        }
    }
}

/// Decide the highlight color. An explicit color always wins, then the CI
/// build status, then [`DEFAULT_COLOR`].
pub fn select_color(explicit: &str, env: &EnvSnapshot) -> String {
    if !explicit.is_empty() {
        return explicit.to_string();
    }

    CiSignal::detect(env)
        .map(|signal| signal.color())
        .unwrap_or(DEFAULT_COLOR)
        .to_string()
}
