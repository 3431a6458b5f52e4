use crate::config::Config;
use crate::model::{Agent, HealthState};
use anyhow::Result;
use rand::prelude::*;
use rand_distr::Bernoulli;

/// Advances one agent's health by one step.
pub struct HealthStateMachine {
    days_until_infectious: u32,
    death_dist: Bernoulli,
}

impl HealthStateMachine {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            days_until_infectious: cfg.days_until_infectious,
            death_dist: Bernoulli::new(cfg.mortality_rate)?,
        })
    }

    /// Apply at most one transition to `agt`.
    ///
    /// Returns the new state if a transition happened.
    pub fn advance<R: Rng>(&self, agt: &mut Agent, rng: &mut R) -> Option<HealthState> {
        let new_state = match agt.state {
            HealthState::Exposed => {
                if agt.days_in_state >= self.days_until_infectious {
                    Some(if agt.is_asymptomatic {
                        HealthState::InfectiousAsymptomatic
                    } else {
                        HealthState::InfectiousSymptomatic
                    })
                } else {
                    None
                }
            }
            HealthState::InfectiousAsymptomatic | HealthState::InfectiousSymptomatic => {
                if agt.days_in_state >= agt.recovery_duration {
                    Some(if self.death_dist.sample(rng) {
                        HealthState::Deceased
                    } else {
                        HealthState::Recovered
                    })
                } else {
                    None
                }
            }
            HealthState::Susceptible | HealthState::Recovered | HealthState::Deceased => {
                return None;
            }
        };

        match new_state {
            Some(state) => agt.state = state,
            None => agt.days_in_state = agt.days_in_state.saturating_add(1),
        }
        new_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::base_config;
    use crate::model::Position;
    use rand_chacha::ChaCha12Rng;

    fn agent_in(state: HealthState, days_in_state: u32, recovery_duration: u32) -> Agent {
        let mut agt = Agent::new(0, Position { x: 0.0, y: 0.0 });
        agt.state = state;
        agt.days_in_state = days_in_state;
        agt.recovery_duration = recovery_duration;
        agt
    }

    #[test]
    fn incubation_counts_down_then_becomes_infectious() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let cfg = base_config();
        let machine = HealthStateMachine::new(&cfg).unwrap();
        let mut agt = agent_in(HealthState::Exposed, 0, 10);

        for day in 0..cfg.days_until_infectious {
            assert_eq!(machine.advance(&mut agt, &mut rng), None);
            assert_eq!(agt.days_in_state, day + 1);
        }
        assert_eq!(
            machine.advance(&mut agt, &mut rng),
            Some(HealthState::InfectiousSymptomatic)
        );
        assert_eq!(agt.days_in_state, cfg.days_until_infectious);
    }

    #[test]
    fn asymptomatic_flag_decides_infectious_kind() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let machine = HealthStateMachine::new(&base_config()).unwrap();
        let mut agt = agent_in(HealthState::Exposed, 5, 10);
        agt.is_asymptomatic = true;
        assert_eq!(
            machine.advance(&mut agt, &mut rng),
            Some(HealthState::InfectiousAsymptomatic)
        );
    }

    #[test]
    fn infectious_resolves_after_recovery_duration() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let mut cfg = base_config();
        cfg.mortality_rate = 0.0;
        let machine = HealthStateMachine::new(&cfg).unwrap();
        let mut agt = agent_in(HealthState::InfectiousSymptomatic, 2, 4);

        assert_eq!(machine.advance(&mut agt, &mut rng), None);
        assert_eq!(machine.advance(&mut agt, &mut rng), None);
        assert_eq!(
            machine.advance(&mut agt, &mut rng),
            Some(HealthState::Recovered)
        );
    }

    #[test]
    fn certain_mortality_kills() {
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let mut cfg = base_config();
        cfg.mortality_rate = 1.0;
        let machine = HealthStateMachine::new(&cfg).unwrap();
        let mut agt = agent_in(HealthState::InfectiousAsymptomatic, 9, 9);
        assert_eq!(
            machine.advance(&mut agt, &mut rng),
            Some(HealthState::Deceased)
        );
    }

    #[test]
    fn other_states_are_left_alone() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let machine = HealthStateMachine::new(&base_config()).unwrap();
        for state in [
            HealthState::Susceptible,
            HealthState::Recovered,
            HealthState::Deceased,
        ] {
            let mut agt = agent_in(state, 3, 1);
            assert_eq!(machine.advance(&mut agt, &mut rng), None);
            assert_eq!(agt.state, state);
            assert_eq!(agt.days_in_state, 3);
        }
    }
}
