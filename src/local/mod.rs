//! Searches that move a single point or a single simplex through the box.

mod hill_climber;
mod nelder_mead;
mod rosenbrock;

pub use self::hill_climber::HillClimber;
pub use self::hill_climber::HillClimberBuilder;

pub use self::nelder_mead::NelderMead;
pub use self::nelder_mead::NelderMeadBuilder;

pub use self::rosenbrock::RotatingBasis;
pub use self::rosenbrock::Rosenbrock;
pub use self::rosenbrock::RosenbrockBuilder;
