//! Simulation data types.

use serde::{Deserialize, Serialize};

/// Health state of an agent.
///
/// Transitions only move forward:
/// `Susceptible -> Exposed -> Infectious* -> Recovered | Deceased`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthState {
    Susceptible,
    Exposed,
    InfectiousAsymptomatic,
    InfectiousSymptomatic,
    Recovered,
    Deceased,
}

impl HealthState {
    pub fn is_infectious(self) -> bool {
        matches!(
            self,
            HealthState::InfectiousAsymptomatic | HealthState::InfectiousSymptomatic
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, HealthState::Recovered | HealthState::Deceased)
    }

    /// Position in the forward-only ordering of states.
    ///
    /// Both infectious states share a rank, as do both terminal states.
    pub fn rank(self) -> u8 {
        match self {
            HealthState::Susceptible => 0,
            HealthState::Exposed => 1,
            HealthState::InfectiousAsymptomatic | HealthState::InfectiousSymptomatic => 2,
            HealthState::Recovered | HealthState::Deceased => 3,
        }
    }
}

/// Location of an agent inside the `env_dim x env_dim` area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn dist_2(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Individual of the simulated population.
///
/// `is_asymptomatic` and `recovery_duration` are drawn once, when the agent
/// is infected, and never resampled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    id: usize,
    pos: Position,

    pub state: HealthState,
    pub days_in_state: u32,

    pub recovery_duration: u32,
    pub is_asymptomatic: bool,

    pub infected_by: Option<usize>,
    /// Step of exposure; `None` for seeded agents.
    pub infection_day: Option<usize>,

    /// Number of agents this agent has infected so far.
    pub secondary_infections: u32,
}

impl Agent {
    /// Create a new susceptible agent.
    pub fn new(id: usize, pos: Position) -> Self {
        Self {
            id,
            pos,
            state: HealthState::Susceptible,
            days_in_state: 0,
            recovery_duration: 0,
            is_asymptomatic: false,
            infected_by: None,
            infection_day: None,
            secondary_infections: 0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    /// Agent was placed in an infectious state at step 0 rather than infected by another.
    pub fn is_seeded(&self) -> bool {
        self.state != HealthState::Susceptible && self.infected_by.is_none()
    }
}

/// Number of agents in each health state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub susceptible: usize,
    pub exposed: usize,
    pub infectious: usize,
    pub recovered: usize,
    pub dead: usize,
}

impl Counts {
    pub fn tally(agt_vec: &[Agent]) -> Self {
        let mut counts = Self::default();
        for agt in agt_vec {
            match agt.state {
                HealthState::Susceptible => counts.susceptible += 1,
                HealthState::Exposed => counts.exposed += 1,
                HealthState::InfectiousAsymptomatic | HealthState::InfectiousSymptomatic => {
                    counts.infectious += 1
                }
                HealthState::Recovered => counts.recovered += 1,
                HealthState::Deceased => counts.dead += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.susceptible + self.exposed + self.infectious + self.recovered + self.dead
    }

    /// Agents with an infection still in progress.
    pub fn active(&self) -> usize {
        self.exposed + self.infectious
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_orders_states_forward() {
        use HealthState::*;
        assert!(Susceptible.rank() < Exposed.rank());
        assert!(Exposed.rank() < InfectiousSymptomatic.rank());
        assert_eq!(InfectiousAsymptomatic.rank(), InfectiousSymptomatic.rank());
        assert!(InfectiousAsymptomatic.rank() < Recovered.rank());
        assert_eq!(Recovered.rank(), Deceased.rank());
    }

    #[test]
    fn tally_counts_every_agent_once() {
        let pos = Position { x: 0.0, y: 0.0 };
        let states = [
            HealthState::Susceptible,
            HealthState::Susceptible,
            HealthState::Exposed,
            HealthState::InfectiousAsymptomatic,
            HealthState::InfectiousSymptomatic,
            HealthState::Recovered,
            HealthState::Deceased,
        ];
        let agt_vec: Vec<_> = states
            .iter()
            .enumerate()
            .map(|(id, &state)| {
                let mut agt = Agent::new(id, pos);
                agt.state = state;
                agt
            })
            .collect();

        let counts = Counts::tally(&agt_vec);
        assert_eq!(counts.susceptible, 2);
        assert_eq!(counts.exposed, 1);
        assert_eq!(counts.infectious, 2);
        assert_eq!(counts.recovered, 1);
        assert_eq!(counts.dead, 1);
        assert_eq!(counts.total(), agt_vec.len());
        assert_eq!(counts.active(), 3);
    }
}
