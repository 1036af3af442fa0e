//! Cooking program selected on the appliance.

use serde::{Deserialize, Serialize};

wire_enum!(
    /// Cooking program the appliance runs.
    Program, "program" {
        Grill => "GRILL",
        Bake => "BAKE",
        Broil => "BROIL",
        Convection => "CONVECTION",
        Defrost => "DEFROST",
        Preheat => "PREHEAT",
        KeepWarm => "KEEP_WARM",
    }
);
