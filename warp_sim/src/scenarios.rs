//! Observation scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// WARP-001: delay grows with observer distance
    Lightcone,

    /// WARP-002: far observers are clamped to the oldest frame
    Horizon,

    /// WARP-003: despawned probes linger until they age past the horizon
    Ghosts,

    /// WARP-004: mothership under laser fire, seen dying at different times
    Salvo,

    /// WARP-005: seeded random probes with consistency checks every tick
    Swarm,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Lightcone,
            ScenarioId::Horizon,
            ScenarioId::Ghosts,
            ScenarioId::Salvo,
            ScenarioId::Swarm,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Lightcone => "lightcone",
            ScenarioId::Horizon => "horizon",
            ScenarioId::Ghosts => "ghosts",
            ScenarioId::Salvo => "salvo",
            ScenarioId::Swarm => "swarm",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Lightcone => "Probes in a line, each seen exactly distance/c*f ticks late",
            ScenarioId::Horizon => "Observer beyond the universe edge reads only the oldest frame",
            ScenarioId::Ghosts => "Expired probes stay visible to far observers for up to capacity ticks",
            ScenarioId::Salvo => "Mothership destroyed by lasers, near observers see it vanish first",
            ScenarioId::Swarm => "Random movers and spawns, observation consistency every tick",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lightcone" | "light_cone" | "warp-001" => Ok(ScenarioId::Lightcone),
            "horizon" | "warp-002" => Ok(ScenarioId::Horizon),
            "ghosts" | "ghost" | "warp-003" => Ok(ScenarioId::Ghosts),
            "salvo" | "warp-004" => Ok(ScenarioId::Salvo),
            "swarm" | "warp-005" => Ok(ScenarioId::Swarm),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_aliases() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>().unwrap(), scenario);
        }
        assert_eq!("WARP-003".parse::<ScenarioId>().unwrap(), ScenarioId::Ghosts);
        assert_eq!("Light_Cone".parse::<ScenarioId>().unwrap(), ScenarioId::Lightcone);
    }

    #[test]
    fn test_unknown_scenario() {
        let err = "wormhole".parse::<ScenarioId>().unwrap_err();
        assert_eq!(err, "Unknown scenario: wormhole");
    }
}
