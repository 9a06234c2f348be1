//! Signal-processing modules.
//!
//! Each module is a self-contained [`RackModule`](crate::port::RackModule)
//! implementation: comparator/counter logic, a chaotic digital oscillator
//! pair, slew-based integrators, a state-variable filter core, a voltage
//! sequencer and a multi-stage window/envelope generator.

pub mod chaos;
pub mod comparing_counter;
pub mod dual_integrator;
pub mod nonlinear_integrator;
pub mod sequencer;
pub mod window;

pub use chaos::DigitalChaos;
pub use comparing_counter::ComparingCounter;
pub use dual_integrator::DualIntegrator;
pub use nonlinear_integrator::NonlinearIntegrator;
pub use sequencer::VoltageSequencer;
pub use window::WindowGenerators;
