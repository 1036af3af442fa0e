//! Operational state, door state, and the derived power label.

use std::fmt;

use serde::{Deserialize, Serialize};

wire_enum!(
    /// Operational state reported by the appliance.
    ApplianceState, "appliance state" {
        ReadyToStart => "READY_TO_START",
        Running => "RUNNING",
        Paused => "PAUSED",
        Finished => "FINISHED",
        Error => "ERROR",
    }
);

wire_enum!(
    /// Whether the appliance door is open.
    DoorState, "door state" {
        Open => "OPEN",
        Closed => "CLOSED",
    }
);

/// Binary on/off label derived from [`ApplianceState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerState {
    Off,
    On,
}

impl PowerState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::On => "On",
        }
    }
}

impl From<ApplianceState> for PowerState {
    fn from(state: ApplianceState) -> Self {
        if state == ApplianceState::ReadyToStart {
            Self::Off
        } else {
            Self::On
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_ready_to_start_to_off() {
        assert_eq!(PowerState::from(ApplianceState::ReadyToStart), PowerState::Off);
    }

    #[test]
    fn should_map_running_to_on() {
        assert_eq!(PowerState::from(ApplianceState::Running), PowerState::On);
        assert_eq!(PowerState::On.to_string(), "On");
    }

    #[test]
    fn should_parse_appliance_state_case_insensitively() {
        assert_eq!(
            "ready_to_start".parse::<ApplianceState>().unwrap(),
            ApplianceState::ReadyToStart
        );
        assert_eq!("paused".parse::<ApplianceState>().unwrap(), ApplianceState::Paused);
    }

    #[test]
    fn should_roundtrip_door_state_through_serde_json() {
        let json = serde_json::to_string(&DoorState::Open).unwrap();
        assert_eq!(json, "\"OPEN\"");
        let parsed: DoorState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, DoorState::Open);
    }
}
