//! Appliance: the full state snapshot of a controlled kitchen device.
//!
//! An [`Appliance`] is an immutable value: the identifier never changes and
//! every other field only changes by producing a new snapshot, either from
//! a transport response or from one of the pure transitions in
//! [`action`](crate::action).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{KitchenError, ValidationError};
use crate::id::ApplianceId;

/// Declare a wire-named enum with `Display` and a forgiving `FromStr`.
///
/// Parsing accepts the wire spelling (`KEEP_WARM`) as well as snake and
/// camel case (`keep_warm`, `keepWarm`).
macro_rules! wire_enum {
    ($(#[doc = $doc:expr])* $name:ident, $kind:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire spelling of this variant.
            #[must_use]
            pub fn as_wire_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_wire_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = $crate::appliance::normalize_variant(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| $crate::appliance::normalize_variant(v.as_wire_str()) == wanted)
                    .ok_or_else(|| $crate::error::ValidationError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

mod program;
mod state;
mod temperature;

pub use program::Program;
pub use state::{ApplianceState, DoorState, PowerState};
pub use temperature::TemperatureRepresentation;

/// Lowercase a variant name and strip `_` / `-` separators.
pub(crate) fn normalize_variant(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Full snapshot of one appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appliance {
    appliance_id: ApplianceId,
    appliance_data: ApplianceData,
    properties: Properties,
}

/// Static descriptive data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceData {
    pub appliance_name: String,
}

/// Operational properties reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    pub door_state: DoorState,
    /// Unit used when rendering temperatures, never the stored unit.
    pub temperature_representation: TemperatureRepresentation,
    pub target_temperature: i32,
    pub program: Program,
    pub start_time: i64,
    pub target_duration: i64,
    pub running_time: i64,
    pub appliance_state: ApplianceState,
    pub display_temperature: i32,
}

impl Appliance {
    /// Create a builder for constructing an [`Appliance`].
    #[must_use]
    pub fn builder() -> ApplianceBuilder {
        ApplianceBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyId`] or [`ValidationError::EmptyName`]
    /// when the identity or display label is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.appliance_id.as_str().trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.appliance_data.appliance_name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> &ApplianceId {
        &self.appliance_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.appliance_data.appliance_name
    }

    #[must_use]
    pub fn data(&self) -> &ApplianceData {
        &self.appliance_data
    }

    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    #[must_use]
    pub fn program(&self) -> Program {
        self.properties.program
    }

    #[must_use]
    pub fn appliance_state(&self) -> ApplianceState {
        self.properties.appliance_state
    }

    #[must_use]
    pub fn target_temperature(&self) -> i32 {
        self.properties.target_temperature
    }

    #[must_use]
    pub fn display_temperature(&self) -> i32 {
        self.properties.display_temperature
    }

    #[must_use]
    pub fn temperature_representation(&self) -> TemperatureRepresentation {
        self.properties.temperature_representation
    }

    #[must_use]
    pub fn door_state(&self) -> DoorState {
        self.properties.door_state
    }

    /// Binary power label: `Off` iff the appliance is ready to start.
    #[must_use]
    pub fn state(&self) -> PowerState {
        PowerState::from(self.properties.appliance_state)
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.state() == PowerState::On
    }

    /// The display temperature followed by the unit glyph, e.g. `24℃`.
    #[must_use]
    pub fn display_temperature_with_unit(&self) -> String {
        self.properties
            .temperature_representation
            .format(self.properties.display_temperature)
    }

    /// Copy of this snapshot with a different program.
    #[must_use]
    pub fn with_program(&self, program: Program) -> Self {
        let mut updated = self.clone();
        updated.properties.program = program;
        updated
    }

    /// Copy of this snapshot with a different target temperature.
    #[must_use]
    pub fn with_target_temperature(&self, temperature: i32) -> Self {
        let mut updated = self.clone();
        updated.properties.target_temperature = temperature;
        updated
    }

    /// Copy of this snapshot with a different operational state.
    #[must_use]
    pub fn with_state(&self, state: ApplianceState) -> Self {
        let mut updated = self.clone();
        updated.properties.appliance_state = state;
        updated
    }
}

impl fmt::Display for Appliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {} {} {}",
            self.name(),
            self.appliance_id,
            self.state(),
            self.display_temperature_with_unit(),
            self.properties.program,
        )
    }
}

/// Step-by-step builder for [`Appliance`].
#[derive(Debug, Default)]
pub struct ApplianceBuilder {
    id: Option<ApplianceId>,
    name: Option<String>,
    door_state: Option<DoorState>,
    temperature_representation: Option<TemperatureRepresentation>,
    target_temperature: i32,
    program: Option<Program>,
    start_time: i64,
    target_duration: i64,
    running_time: i64,
    appliance_state: Option<ApplianceState>,
    display_temperature: i32,
}

impl ApplianceBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<ApplianceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn door_state(mut self, door_state: DoorState) -> Self {
        self.door_state = Some(door_state);
        self
    }

    #[must_use]
    pub fn temperature_representation(mut self, repr: TemperatureRepresentation) -> Self {
        self.temperature_representation = Some(repr);
        self
    }

    #[must_use]
    pub fn target_temperature(mut self, temperature: i32) -> Self {
        self.target_temperature = temperature;
        self
    }

    #[must_use]
    pub fn program(mut self, program: Program) -> Self {
        self.program = Some(program);
        self
    }

    #[must_use]
    pub fn start_time(mut self, start_time: i64) -> Self {
        self.start_time = start_time;
        self
    }

    #[must_use]
    pub fn target_duration(mut self, target_duration: i64) -> Self {
        self.target_duration = target_duration;
        self
    }

    #[must_use]
    pub fn running_time(mut self, running_time: i64) -> Self {
        self.running_time = running_time;
        self
    }

    #[must_use]
    pub fn appliance_state(mut self, state: ApplianceState) -> Self {
        self.appliance_state = Some(state);
        self
    }

    #[must_use]
    pub fn display_temperature(mut self, temperature: i32) -> Self {
        self.display_temperature = temperature;
        self
    }

    /// Consume the builder, validate, and return an [`Appliance`].
    ///
    /// # Errors
    ///
    /// Returns [`KitchenError::MalformedData`] if the id or name is missing
    /// or empty.
    pub fn build(self) -> Result<Appliance, KitchenError> {
        let appliance = Appliance {
            appliance_id: self.id.unwrap_or_else(|| ApplianceId::new("")),
            appliance_data: ApplianceData {
                appliance_name: self.name.unwrap_or_default(),
            },
            properties: Properties {
                door_state: self.door_state.unwrap_or(DoorState::Closed),
                temperature_representation: self
                    .temperature_representation
                    .unwrap_or(TemperatureRepresentation::Celsius),
                target_temperature: self.target_temperature,
                program: self.program.unwrap_or(Program::Grill),
                start_time: self.start_time,
                target_duration: self.target_duration,
                running_time: self.running_time,
                appliance_state: self.appliance_state.unwrap_or(ApplianceState::ReadyToStart),
                display_temperature: self.display_temperature,
            },
        };
        appliance.validate()?;
        Ok(appliance)
    }
}
