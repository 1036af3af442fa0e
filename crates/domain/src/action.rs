//! Action: a discrete user-intent command applied to an appliance.
//!
//! Transitions are pure: [`Appliance::apply_action`] never mutates its
//! receiver and never fails, it returns the next snapshot. Stores use it only
//! as an optimistic preview; the committed value always comes from the
//! transport.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::appliance::{Appliance, ApplianceState, PowerState, Program};

/// A control command understood by the appliance backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApplianceAction {
    /// Start the current program. Idempotent when already running.
    TurnOn,
    /// Stop and return to [`ApplianceState::ReadyToStart`].
    TurnOff,
    /// Select another cooking program without touching the state.
    ChangeProgram { program: Program },
    /// Set a new target temperature. Range checks belong to the backend.
    ChangeTemperature { temperature: i32 },
}

impl ApplianceAction {
    /// The power action that flips the appliance's on/off label.
    #[must_use]
    pub fn toggle_for(appliance: &Appliance) -> Self {
        match appliance.state() {
            PowerState::Off => Self::TurnOn,
            PowerState::On => Self::TurnOff,
        }
    }
}

impl fmt::Display for ApplianceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TurnOn => f.write_str("turn_on"),
            Self::TurnOff => f.write_str("turn_off"),
            Self::ChangeProgram { program } => write!(f, "change_program({program})"),
            Self::ChangeTemperature { temperature } => {
                write!(f, "change_temperature({temperature})")
            }
        }
    }
}

impl Appliance {
    /// Compute the snapshot that results from applying `action`.
    #[must_use]
    pub fn apply_action(&self, action: ApplianceAction) -> Self {
        match action {
            ApplianceAction::TurnOn => {
                if self.appliance_state() == ApplianceState::Running {
                    self.clone()
                } else {
                    self.with_state(ApplianceState::Running)
                }
            }
            ApplianceAction::TurnOff => self.with_state(ApplianceState::ReadyToStart),
            ApplianceAction::ChangeProgram { program } => self.with_program(program),
            ApplianceAction::ChangeTemperature { temperature } => {
                self.with_target_temperature(temperature)
            }
        }
    }
}
