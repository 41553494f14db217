//! Runtime services: the per-debate event bus, run locks, control
//! requests, violation scanning, and the orchestrator loop itself.

pub mod bus;
pub mod control;
pub mod debate_lock;
pub mod orchestrator;
pub mod violations;
