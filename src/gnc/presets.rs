//! Named mission scripts shipped with the simulator.

pub const ORBITAL: &str = "\
// Two-stage ascent to a low orbit
WHEN TIME >= 0 THEN THROTTLE 100
WHEN TIME >= 0 THEN SAS STABILITY
WHEN ALTITUDE > 1000 THEN PITCH 80
WHEN ALTITUDE > 8000 THEN PITCH 60
WHEN ALTITUDE > 25000 THEN PITCH 35
WHEN FUEL < 1 THEN STAGE
WHEN ALTITUDE > 60000 THEN PITCH 10
WHEN ALTITUDE > 110000 AND DYNAMIC_PRESSURE < 1 THEN STAGE
WHEN APOGEE > 200000 AND HORIZONTAL_VEL > 7700 THEN THROTTLE 0
";

pub const SUBORBITAL: &str = "\
// Sounding flight: climb, coast, separate above the Karman line
WHEN TIME >= 0 THEN THROTTLE 100
WHEN TIME >= 0 THEN SAS STABILITY
WHEN ALTITUDE > 2000 THEN PITCH 85
WHEN APOGEE > 120000 THEN THROTTLE 0
WHEN ALTITUDE > 100000 AND VERTICAL_VEL < 200 THEN STAGE
";

pub const HOP: &str = "\
# Low hop over the pad
WHEN TIME >= 0 THEN THROTTLE 80
WHEN TIME >= 0 THEN SAS STABILITY
WHEN ALTITUDE > 400 THEN THROTTLE 0
";

pub const PRESETS: &[(&str, &str)] = &[("orbital", ORBITAL), ("suborbital", SUBORBITAL), ("hop", HOP)];

pub fn preset(name: &str) -> Option<&'static str> {
    PRESETS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, text)| *text)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(n, _)| *n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gnc::script::MissionScript;

    #[test]
    fn every_preset_parses() {
        for (name, text) in PRESETS {
            let script = MissionScript::parse(*name, text)
                .unwrap_or_else(|e| panic!("{name}: {:?}", e.0));
            assert!(!script.commands.is_empty());
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(preset("Orbital").is_some());
        assert!(preset("lunar").is_none());
        assert_eq!(names().count(), 3);
    }
}
