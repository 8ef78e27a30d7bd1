//! Fixed appliance catalog and washing-machine program presets.
//!
//! The catalog is consulted once when the timer engine is constructed;
//! appliances are never created or destroyed at runtime.

use serde::{Deserialize, Serialize};

/// A household appliance with a shared countdown timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appliance {
    /// Stable identifier (e.g. `"washingMachine"`). Immutable.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
}

impl Appliance {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The fixed, pre-enumerated appliance list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    appliances: Vec<Appliance>,
}

impl Catalog {
    pub fn new(appliances: Vec<Appliance>) -> Self {
        Self { appliances }
    }

    /// The built-in household catalog.
    pub fn builtin() -> Self {
        Self::new(vec![
            Appliance::new("washingMachine", "Washing machine"),
            Appliance::new("tumbleDryer", "Tumble dryer"),
            Appliance::new("dishwasher", "Dishwasher"),
            Appliance::new("oven", "Oven"),
        ])
    }

    pub fn appliances(&self) -> &[Appliance] {
        &self.appliances
    }

    pub fn get(&self, id: &str) -> Option<&Appliance> {
        self.appliances.iter().find(|a| a.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// One washing-machine program variant: mode, temperature and cycle length.
///
/// Durations include the machine's fixed 55-minute rinse/spin tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WashProgram {
    /// Program mode, e.g. `"Cotton"`.
    pub mode: &'static str,
    /// Temperature variant label, e.g. `"40°C"`.
    pub temperature: &'static str,
    /// Full cycle length in minutes.
    pub minutes: u64,
}

impl WashProgram {
    const fn new(mode: &'static str, temperature: &'static str, minutes: u64) -> Self {
        Self {
            mode,
            temperature,
            minutes,
        }
    }

    /// Cycle length in seconds, the engine's unit.
    pub fn duration_secs(&self) -> u64 {
        self.minutes.saturating_mul(60)
    }
}

/// All built-in washing programs, as shipped on the household's machine.
pub const WASH_PROGRAMS: &[WashProgram] = &[
    WashProgram::new("Cotton", "Cold", 143),
    WashProgram::new("Cotton", "20°C", 148),
    WashProgram::new("Cotton", "40°C", 392),
    WashProgram::new("Cotton", "60°C", 350),
    WashProgram::new("Cotton", "90°C", 204),
    WashProgram::new("Mix", "Cold", 121),
    WashProgram::new("Mix", "40°C", 133),
    WashProgram::new("Mix", "60°C", 150),
    WashProgram::new("Synthetic", "Cold", 116),
    WashProgram::new("Synthetic", "40°C", 128),
    WashProgram::new("Delicate", "Cold", 111),
    WashProgram::new("Delicate", "20°C", 114),
    WashProgram::new("Tub Clean", "60°C", 133),
    WashProgram::new("Spin", "No temperature", 69),
    WashProgram::new("Quick 15'", "Cold", 70),
    WashProgram::new("Rinse+Spin", "Cold", 89),
];

/// Look up a program by mode and temperature (both case-insensitive).
pub fn find_program(mode: &str, temperature: &str) -> Option<&'static WashProgram> {
    WASH_PROGRAMS.iter().find(|p| {
        p.mode.eq_ignore_ascii_case(mode) && p.temperature.eq_ignore_ascii_case(temperature)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_washing_machine() {
        let catalog = Catalog::builtin();
        assert!(catalog.contains("washingMachine"));
        assert_eq!(catalog.get("washingMachine").unwrap().name, "Washing machine");
        assert!(!catalog.contains("jacuzzi"));
    }

    #[test]
    fn program_lookup_is_case_insensitive() {
        let program = find_program("cotton", "40°c").unwrap();
        assert_eq!(program.minutes, 392);
        assert_eq!(program.duration_secs(), 392 * 60);
        assert!(find_program("Cotton", "150°C").is_none());
    }
}
