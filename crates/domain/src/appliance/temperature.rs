//! Temperature unit used for display.

use serde::{Deserialize, Serialize};

wire_enum!(
    /// Unit the appliance renders temperatures in.
    TemperatureRepresentation, "temperature representation" {
        Celsius => "CELSIUS",
        Fahrenheit => "FAHRENHEIT",
    }
);

impl TemperatureRepresentation {
    /// Degree glyph for this unit (`℃` or `℉`).
    #[must_use]
    pub fn glyph(self) -> char {
        match self {
            Self::Celsius => '\u{2103}',
            Self::Fahrenheit => '\u{2109}',
        }
    }

    /// Render an integer temperature followed by the unit glyph.
    #[must_use]
    pub fn format(self, value: i32) -> String {
        format!("{value}{}", self.glyph())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_use_celsius_glyph() {
        assert_eq!(TemperatureRepresentation::Celsius.format(24), "24\u{2103}");
    }

    #[test]
    fn should_use_fahrenheit_glyph_for_any_value() {
        for value in [-459, -1, 0, 75, 500] {
            let rendered = TemperatureRepresentation::Fahrenheit.format(value);
            assert_eq!(rendered, format!("{value}\u{2109}"));
        }
    }
}
