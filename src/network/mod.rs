//! Transport and timing: channels, nodes and the discrete-event run loop.

mod channel;
mod node;
mod scheduler;
mod simulation;

pub use channel::{Channel, LossModel, NoiseModel, Payload, Transmission, TransmissionPolicy};
pub use node::{Connection, LogEntry, Node, NodeId};
pub use scheduler::{CancellationToken, Scheduler};
pub use simulation::{
    NodeContext, Poll, Process, Receiver, RunSummary, SendOutcome, Simulation,
};
