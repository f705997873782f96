use std::collections::BTreeSet;

use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Failure modes a vessel's reliability subsystem knows how to apply.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum FailureType {
    EngineFlameout,
    IgnitionFailure,
    GimbalLock,
    SensorGlitch,
    SasFailure,
    StructuralFailure,
}

/// Set of failures currently affecting one vessel.
#[derive(Debug, Clone, Default)]
pub struct Reliability {
    active: BTreeSet<FailureType>,
}

impl Reliability {
    /// Record a failure. Returns `false` when it was already active.
    pub fn trigger(&mut self, failure: FailureType) -> bool {
        self.active.insert(failure)
    }

    /// Trigger a failure by its catalog name. Unknown names are ignored.
    pub fn trigger_named(&mut self, name: &str) -> Option<FailureType> {
        let failure: FailureType = name.parse().ok()?;
        self.trigger(failure);
        Some(failure)
    }

    pub fn has(&self, failure: FailureType) -> bool {
        self.active.contains(&failure)
    }

    pub fn clear(&mut self, failure: FailureType) {
        self.active.remove(&failure);
    }

    pub fn clear_all(&mut self) {
        self.active.clear();
    }

    pub fn active(&self) -> impl Iterator<Item = FailureType> + '_ {
        self.active.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_kebab_case() {
        assert_eq!(FailureType::EngineFlameout.to_string(), "engine-flameout");
        assert_eq!("gimbal-lock".parse::<FailureType>().unwrap(), FailureType::GimbalLock);
    }

    #[test]
    fn unknown_name_is_ignored() {
        let mut r = Reliability::default();
        assert!(r.trigger_named("warp-core-breach").is_none());
        assert_eq!(r.active().count(), 0);
        assert_eq!(r.trigger_named("sas-failure"), Some(FailureType::SasFailure));
        assert!(r.has(FailureType::SasFailure));
    }
}
