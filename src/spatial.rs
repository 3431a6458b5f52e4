use crate::model::Position;
use anyhow::Result;
use rand::{prelude::*, seq::index};
use rand_distr::Uniform;
use std::collections::HashMap;

/// Static placement of the population in the `env_dim x env_dim` area.
///
/// When an interaction radius is configured, agents are also bucketed into
/// radius-sized cells so that radius queries only visit nearby agents.
pub struct SpatialIndex {
    pos_vec: Vec<Position>,
    grid: Option<Grid>,
    radius: Option<f64>,
}

/// Occupied cells only; memory scales with the population, not the area.
struct Grid {
    cell_size: f64,
    cells: HashMap<(u64, u64), Vec<usize>>,
}

impl Grid {
    fn new(cell_size: f64, pos_vec: &[Position]) -> Self {
        let mut cells: HashMap<_, Vec<usize>> = HashMap::new();
        for (i_agt, pos) in pos_vec.iter().enumerate() {
            cells
                .entry(cell_of(cell_size, pos.x, pos.y))
                .or_default()
                .push(i_agt);
        }
        Self { cell_size, cells }
    }

    /// Agents in the cells overlapping the square of half-side `radius` around `center`.
    fn candidates(&self, center: Position, radius: f64) -> Vec<usize> {
        let (col_min, row_min) = cell_of(self.cell_size, center.x - radius, center.y - radius);
        let (col_max, row_max) = cell_of(self.cell_size, center.x + radius, center.y + radius);

        let n_box = (col_max - col_min)
            .saturating_add(1)
            .saturating_mul((row_max - row_min).saturating_add(1));
        if n_box > self.cells.len() as u64 {
            return self.cells.values().flatten().copied().collect();
        }

        let mut found = Vec::new();
        for row in row_min..=row_max {
            for col in col_min..=col_max {
                if let Some(cell) = self.cells.get(&(col, row)) {
                    found.extend_from_slice(cell);
                }
            }
        }
        found
    }
}

impl SpatialIndex {
    /// Place `pop_size` agents uniformly at random.
    pub fn generate<R: Rng>(
        env_dim: usize,
        pop_size: usize,
        radius: Option<f64>,
        rng: &mut R,
    ) -> Result<Self> {
        let coord_dist = Uniform::new(0.0, env_dim as f64)?;
        let pos_vec = (0..pop_size)
            .map(|_| Position {
                x: coord_dist.sample(rng),
                y: coord_dist.sample(rng),
            })
            .collect();
        Ok(Self::from_positions(pos_vec, radius))
    }

    pub fn from_positions(pos_vec: Vec<Position>, radius: Option<f64>) -> Self {
        let grid = radius.map(|radius| Grid::new(radius, &pos_vec));
        Self {
            pos_vec,
            grid,
            radius,
        }
    }

    pub fn pos(&self, i_agt: usize) -> Position {
        self.pos_vec[i_agt]
    }

    pub fn len(&self) -> usize {
        self.pos_vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos_vec.is_empty()
    }

    /// Draw up to `n` distinct contacts for agent `i_agt`, never including itself.
    ///
    /// Without an interaction radius every other agent is a candidate and the
    /// result has length `min(n, pop_size - 1)`. With a radius only agents
    /// within that distance are candidates.
    pub fn sample_contacts<R: Rng>(&self, i_agt: usize, n: usize, rng: &mut R) -> Vec<usize> {
        match self.radius {
            None => {
                let n_others = self.len().saturating_sub(1);
                let amount = n.min(n_others);
                if amount == 0 {
                    return Vec::new();
                }
                // Sample among the others, then skip over the caller's own index.
                index::sample(rng, n_others, amount)
                    .into_iter()
                    .map(|i_other| if i_other >= i_agt { i_other + 1 } else { i_other })
                    .collect()
            }
            Some(radius) => {
                let candidates = self.within_radius(i_agt, radius);
                candidates.choose_multiple(rng, n).copied().collect()
            }
        }
    }

    /// Indices of all other agents within `radius` of agent `i_agt`, in ascending order.
    pub fn within_radius(&self, i_agt: usize, radius: f64) -> Vec<usize> {
        let center = self.pos_vec[i_agt];
        let radius_2 = radius * radius;
        let is_near =
            |&i_other: &usize| i_other != i_agt && center.dist_2(&self.pos_vec[i_other]) <= radius_2;

        let mut found: Vec<_> = match &self.grid {
            Some(grid) => grid
                .candidates(center, radius)
                .into_iter()
                .filter(is_near)
                .collect(),
            None => (0..self.len()).filter(is_near).collect(),
        };
        found.sort_unstable();
        found
    }
}

fn cell_of(cell_size: f64, x: f64, y: f64) -> (u64, u64) {
    let col = (x.max(0.0) / cell_size).floor() as u64;
    let row = (y.max(0.0) / cell_size).floor() as u64;
    (col, row)
}
