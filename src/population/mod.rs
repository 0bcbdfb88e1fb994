//! Searches that evolve a population of points.

mod encoding;
mod evolution;
mod genetic;
mod pso;

pub use self::encoding::BitGene;

pub use self::evolution::EvolutionStrategy;
pub use self::evolution::EvolutionStrategyBuilder;
pub use self::evolution::Marriage;

pub use self::genetic::Genetic;
pub use self::genetic::GeneticBuilder;

pub use self::pso::von_neumann;
pub use self::pso::ParticleSwarm;
pub use self::pso::ParticleSwarmBuilder;
pub use self::pso::PsoMode;
pub use self::pso::UpdateMode;
