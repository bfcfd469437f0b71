//! Generational selection for steering networks
//!
//! Truncation selection: rank by fitness, keep the top fraction as
//! survivor brains, then build every member of the next generation by
//! cloning a random survivor and mutating the clone.

use serde::{Deserialize, Serialize};

use crate::rng::BrainRng;
use crate::steering::SteeringNetwork;

/// Evolution parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Fraction of the population kept as templates
    pub survivor_fraction: f32,
    /// Per-weight mutation probability
    pub mutation_rate: f32,
    /// Mutation perturbation range is [-magnitude, magnitude)
    pub mutation_magnitude: f32,
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub output_dim: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            survivor_fraction: 0.2,
            mutation_rate: 0.3,
            mutation_magnitude: 0.5,
            input_dim: 5,
            hidden_dim: 6,
            output_dim: 1,
        }
    }
}

/// Breeds the next generation of steering networks
#[derive(Debug, Clone, Default)]
pub struct Breeder {
    pub config: EvolutionConfig,
}

impl Breeder {
    pub fn new(config: EvolutionConfig) -> Self {
        Self { config }
    }

    /// `ceil(population * survivor_fraction)`, at least one for a non-empty
    /// population and never more than the population
    pub fn survivor_count(&self, population: usize) -> usize {
        if population == 0 {
            return 0;
        }
        // Whole per-mille keeps the ceiling exact (0.3 is not 0.3 in f32)
        let per_mille = (self.config.survivor_fraction * 1000.0).round() as usize;
        (population * per_mille).div_ceil(1000).clamp(1, population)
    }

    /// Fresh network with randomized weights
    pub fn random_brain<R: BrainRng + ?Sized>(&self, rng: &mut R) -> SteeringNetwork {
        SteeringNetwork::random(
            self.config.input_dim,
            self.config.hidden_dim,
            self.config.output_dim,
            rng,
        )
    }

    /// Sort by fitness (descending) and keep the top fraction
    ///
    /// NaN fitness ranks below every number.
    pub fn select_survivors(&self, mut scored: Vec<(f32, SteeringNetwork)>) -> Vec<SteeringNetwork> {
        let keep = self.survivor_count(scored.len());
        let rank = |f: f32| if f.is_nan() { f32::NEG_INFINITY } else { f };
        scored.sort_by(|a, b| rank(b.0).total_cmp(&rank(a.0)));
        scored.into_iter().take(keep).map(|(_, brain)| brain).collect()
    }

    /// Clone a uniformly chosen survivor and mutate it. With no survivors
    /// (first generation) a random network is returned instead.
    pub fn offspring<R: BrainRng + ?Sized>(
        &self,
        survivors: &[SteeringNetwork],
        rng: &mut R,
    ) -> SteeringNetwork {
        if survivors.is_empty() {
            return self.random_brain(rng);
        }
        let mut child = survivors[rng.gen_index(survivors.len())].clone();
        child.mutate(
            self.config.mutation_rate,
            self.config.mutation_magnitude,
            rng,
        );
        child
    }

    /// Build a whole generation of `count` brains
    pub fn next_generation<R: BrainRng + ?Sized>(
        &self,
        survivors: &[SteeringNetwork],
        count: usize,
        rng: &mut R,
    ) -> Vec<SteeringNetwork> {
        (0..count).map(|_| self.offspring(survivors, rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;

    #[test]
    fn test_survivor_count_is_ceiling() {
        let breeder = Breeder::default();
        assert_eq!(breeder.survivor_count(50), 10);
        assert_eq!(breeder.survivor_count(10), 2);
        assert_eq!(breeder.survivor_count(7), 2);
        assert_eq!(breeder.survivor_count(1), 1);
        assert_eq!(breeder.survivor_count(0), 0);
    }

    #[test]
    fn test_survivor_count_other_fractions() {
        let breeder = |fraction: f32| {
            Breeder::new(EvolutionConfig {
                survivor_fraction: fraction,
                ..EvolutionConfig::default()
            })
        };
        // 10 * 0.3 is 3.0000001 in f32
        assert_eq!(breeder(0.3).survivor_count(10), 3);
        assert_eq!(breeder(0.25).survivor_count(10), 3);
        assert_eq!(breeder(0.1).survivor_count(30), 3);
        assert_eq!(breeder(1.0).survivor_count(12), 12);
        assert_eq!(breeder(0.0).survivor_count(12), 1);
    }

    #[test]
    fn test_select_survivors_keeps_top_fitness() {
        let mut rng = seeded(21);
        let breeder = Breeder::default();

        let scored: Vec<(f32, SteeringNetwork)> = (0..10)
            .map(|i| (i as f32 * 10.0, breeder.random_brain(&mut rng)))
            .collect();
        let best = scored[9].1.clone();
        let second = scored[8].1.clone();

        let survivors = breeder.select_survivors(scored);
        assert_eq!(survivors.len(), 2);
        assert_eq!(survivors[0], best);
        assert_eq!(survivors[1], second);
    }

    #[test]
    fn test_select_survivors_ranks_nan_last() {
        let mut rng = seeded(22);
        let breeder = Breeder::default();

        let good = breeder.random_brain(&mut rng);
        let scored = vec![
            (f32::NAN, breeder.random_brain(&mut rng)),
            (-500.0, breeder.random_brain(&mut rng)),
            (3.0, good.clone()),
            (f32::NAN, breeder.random_brain(&mut rng)),
            (-1.0, breeder.random_brain(&mut rng)),
        ];

        let survivors = breeder.select_survivors(scored);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0], good);
    }

    #[test]
    fn test_first_generation_is_random() {
        let mut rng = seeded(23);
        let breeder = Breeder::default();
        let brains = breeder.next_generation(&[], 50, &mut rng);

        assert_eq!(brains.len(), 50);
        assert_ne!(brains[0], brains[1]);
        assert!(brains.iter().all(|b| b.shape() == [(6, 5), (1, 6)]));
    }

    #[test]
    fn test_offspring_derive_from_survivors() {
        let mut rng = seeded(24);
        let breeder = Breeder::default();
        let survivor = breeder.random_brain(&mut rng);

        for child in breeder.next_generation(std::slice::from_ref(&survivor), 20, &mut rng) {
            assert_eq!(child.shape(), survivor.shape());
            for (a, b) in survivor.weights().iter().zip(child.weights().iter()) {
                assert!((a - b).abs() <= 0.5);
            }
        }
    }
}
