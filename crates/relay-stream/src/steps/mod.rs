mod clock;
mod generator;
mod orders;
mod pubsub;

pub use clock::{DbClockStep, TelemetryStep};
pub use generator::{GeneratorKind, GeneratorStep};
pub use orders::OrderChangeStep;
pub use pubsub::PubSubStep;
