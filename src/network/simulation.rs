use crate::errors::{ConfigurationError, SchedulerError, SimError};
use crate::network::channel::{Payload, Transmission};
use crate::network::node::{Node, NodeId};
use crate::network::scheduler::{CancellationToken, Scheduler};
use crate::rng::SimRng;
use tracing::{debug, info};

/// Protocol-specific handling of arrivals at one node.
///
/// Arrivals are logged in the node's receive log before this is called.
pub trait Receiver {
    fn receive(
        &mut self,
        ctx: &mut NodeContext<'_>,
        payload: Payload,
        port: &str,
    ) -> Result<(), SimError>;
}

/// What a [`Process`] wants after one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Poll {
    /// Resume after this many seconds
    Wait(f64),
    Done,
}

/// A node's running behavior, driven as a sequence of (act, wait) steps.
pub trait Process {
    fn resume(&mut self, ctx: &mut NodeContext<'_>) -> Result<Poll, SimError>;
}

/// Result of [`Simulation::send`].
#[derive(Clone, Debug)]
pub enum SendOutcome {
    /// Dropped by the channel; nothing will arrive.
    Lost,
    Scheduled {
        arrival: f64,
        token: CancellationToken,
    },
}

/// Counters reported at the end of [`Simulation::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub events_processed: usize,
    pub deliveries: usize,
    pub resumptions: usize,
    pub final_time: f64,
}

enum Event {
    Deliver {
        target: NodeId,
        port: String,
        payload: Payload,
    },
    Resume {
        process: usize,
    },
}

struct ProcessSlot {
    node: NodeId,
    process: Box<dyn Process>,
}

/// View of the simulation handed to receivers and processes while they run.
pub struct NodeContext<'a> {
    node: NodeId,
    nodes: &'a mut [Node],
    scheduler: &'a mut Scheduler<Event>,
    rng: &'a SimRng,
}

impl NodeContext<'_> {
    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn node(&self) -> &Node {
        &self.nodes[self.node.0]
    }

    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.nodes[self.node.0]
    }

    /// Handle on the run's random stream.
    pub fn rng(&self) -> SimRng {
        self.rng.clone()
    }

    /// Sends from this node; see [`Simulation::send`].
    pub fn send(
        &mut self,
        port: &str,
        payload: impl Into<Payload>,
    ) -> Result<SendOutcome, SimError> {
        send_from(self.nodes, self.scheduler, self.node, port, payload.into())
    }
}

fn node_at(nodes: &mut [Node], id: NodeId) -> Result<&mut Node, ConfigurationError> {
    nodes
        .get_mut(id.0)
        .ok_or(ConfigurationError::UnknownNode(id.0))
}

fn send_from(
    nodes: &mut [Node],
    scheduler: &mut Scheduler<Event>,
    from: NodeId,
    port: &str,
    payload: Payload,
) -> Result<SendOutcome, SimError> {
    let now = scheduler.now();
    let node = node_at(nodes, from)?;
    let node_name = node.name().to_string();
    let Some(connection) = node.connection_mut(port) else {
        return Err(ConfigurationError::PortNotConnected {
            node: node_name,
            port: port.to_string(),
        }
        .into());
    };

    let target = connection.remote_node;
    let target_port = connection.remote_port.clone();
    let sent = payload.clone();
    let transmission = connection.channel.transmit(payload);
    let channel_name = connection.channel.name.clone();
    node.log_sent(now, port, sent);

    match transmission {
        Transmission::Lost => {
            debug!(node = %node_name, port, channel = %channel_name, "payload lost");
            Ok(SendOutcome::Lost)
        }
        Transmission::Delivered { payload, delay } => {
            node_at(nodes, target)?;
            let token = scheduler.schedule(
                delay,
                Event::Deliver {
                    target,
                    port: target_port,
                    payload,
                },
            )?;
            Ok(SendOutcome::Scheduled {
                arrival: now + delay,
                token,
            })
        }
    }
}

/// Single-threaded discrete-event simulation of a set of nodes.
pub struct Simulation {
    scheduler: Scheduler<Event>,
    nodes: Vec<Node>,
    receivers: Vec<Option<Box<dyn Receiver>>>,
    processes: Vec<ProcessSlot>,
    rng: SimRng,
}

impl Simulation {
    /// `rng` is the run's only random stream; hand clones of it to components.
    pub fn new(rng: SimRng) -> Self {
        Self {
            scheduler: Scheduler::new(),
            nodes: Vec::new(),
            receivers: Vec::new(),
            processes: Vec::new(),
            rng,
        }
    }

    pub fn rng(&self) -> SimRng {
        self.rng.clone()
    }

    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, name));
        self.receivers.push(None);
        id
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, ConfigurationError> {
        self.nodes
            .get(id.0)
            .ok_or(ConfigurationError::UnknownNode(id.0))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, ConfigurationError> {
        node_at(&mut self.nodes, id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Installs the arrival handler for `node`, replacing any previous one.
    pub fn set_receiver(
        &mut self,
        node: NodeId,
        receiver: impl Receiver + 'static,
    ) -> Result<(), ConfigurationError> {
        let slot = self
            .receivers
            .get_mut(node.0)
            .ok_or(ConfigurationError::UnknownNode(node.0))?;
        *slot = Some(Box::new(receiver));
        Ok(())
    }

    /// Starts `process` on `node`; its first step runs at the current time.
    pub fn spawn(
        &mut self,
        node: NodeId,
        process: impl Process + 'static,
    ) -> Result<CancellationToken, SimError> {
        self.node(node)?;
        let index = self.processes.len();
        self.processes.push(ProcessSlot {
            node,
            process: Box::new(process),
        });
        Ok(self.scheduler.schedule(0.0, Event::Resume { process: index })?)
    }

    /// Sends `payload` out of `port` on `node` at the current time.
    ///
    /// The send is logged whatever the channel does. A lost payload schedules
    /// nothing; otherwise delivery fires after the channel delay.
    pub fn send(
        &mut self,
        node: NodeId,
        port: &str,
        payload: impl Into<Payload>,
    ) -> Result<SendOutcome, SimError> {
        send_from(
            &mut self.nodes,
            &mut self.scheduler,
            node,
            port,
            payload.into(),
        )
    }

    /// Processes every event strictly before `until`, then sets the clock to `until`.
    pub fn run(&mut self, until: f64) -> Result<RunSummary, SimError> {
        let now = self.scheduler.now();
        if until.is_nan() || until < now {
            return Err(SchedulerError::InThePast { at: until, now }.into());
        }
        info!(until, pending = self.scheduler.len(), "simulation started");

        let mut summary = RunSummary::default();
        while let Some((time, event)) = self.scheduler.pop_before(until) {
            summary.events_processed += 1;
            match event {
                Event::Deliver {
                    target,
                    port,
                    payload,
                } => {
                    self.deliver(target, &port, payload)?;
                    summary.deliveries += 1;
                }
                Event::Resume { process } => {
                    self.resume(process)?;
                    summary.resumptions += 1;
                }
            }
            debug!(time, "event processed");
        }

        self.scheduler.advance_to(until);
        summary.final_time = self.scheduler.now();
        info!(
            events = summary.events_processed,
            deliveries = summary.deliveries,
            final_time = summary.final_time,
            "simulation finished"
        );
        Ok(summary)
    }

    fn deliver(&mut self, target: NodeId, port: &str, payload: Payload) -> Result<(), SimError> {
        let now = self.scheduler.now();
        node_at(&mut self.nodes, target)?.log_received(now, port, payload.clone());
        debug!(node = %target, port, "payload delivered");

        if let Some(receiver) = self.receivers.get_mut(target.0).and_then(Option::as_mut) {
            let mut ctx = NodeContext {
                node: target,
                nodes: &mut self.nodes,
                scheduler: &mut self.scheduler,
                rng: &self.rng,
            };
            receiver.receive(&mut ctx, payload, port)?;
        }
        Ok(())
    }

    fn resume(&mut self, index: usize) -> Result<(), SimError> {
        let Some(slot) = self.processes.get_mut(index) else {
            return Ok(());
        };
        let mut ctx = NodeContext {
            node: slot.node,
            nodes: &mut self.nodes,
            scheduler: &mut self.scheduler,
            rng: &self.rng,
        };
        match slot.process.resume(&mut ctx)? {
            Poll::Wait(duration) => {
                self.scheduler
                    .schedule(duration, Event::Resume { process: index })?;
            }
            Poll::Done => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Channel;
    use crate::optics::Pulse;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn linked(length: f64) -> (Simulation, NodeId, NodeId) {
        let mut sim = Simulation::new(SimRng::seed_from_u64(0));
        let a = sim.add_node("alice");
        let b = sim.add_node("bob");
        let channel = Channel::classical("ab", length, sim.rng()).unwrap();
        sim.node_mut(a).unwrap().connect_nodes("out", "in", b, channel);
        (sim, a, b)
    }

    struct Ticker {
        remaining: u32,
        period: f64,
    }

    impl Process for Ticker {
        fn resume(&mut self, ctx: &mut NodeContext<'_>) -> Result<Poll, SimError> {
            if self.remaining == 0 {
                return Ok(Poll::Done);
            }
            self.remaining -= 1;
            let tick = format!("tick@{}", ctx.now());
            ctx.send("out", tick)?;
            Ok(Poll::Wait(self.period))
        }
    }

    #[test]
    fn unconnected_port_is_a_configuration_error() {
        let (mut sim, a, _) = linked(10.0);
        let err = sim.send(a, "nowhere", "x").unwrap_err();
        assert!(matches!(
            err,
            SimError::Configuration(ConfigurationError::PortNotConnected { .. })
        ));
        assert!(sim.node(a).unwrap().sent_log().is_empty());
    }

    #[test]
    fn delivery_fires_after_channel_delay() {
        let (mut sim, a, b) = linked(2e8);
        let outcome = sim.send(a, "out", "hello").unwrap();
        assert!(matches!(outcome, SendOutcome::Scheduled { arrival, .. } if arrival == 1.0));

        sim.run(0.5).unwrap();
        assert!(sim.node(b).unwrap().recv_log().is_empty());

        let summary = sim.run(2.0).unwrap();
        assert_eq!(summary.deliveries, 1);
        assert_eq!(summary.final_time, 2.0);
        let entry = &sim.node(b).unwrap().recv_log()[0];
        assert_eq!(entry.time, 1.0);
        assert_eq!(entry.port, "in");
        assert_eq!(entry.payload.as_classical(), Some("hello"));
    }

    #[test]
    fn process_emits_until_done() {
        let (mut sim, a, b) = linked(0.0);
        sim.spawn(
            a,
            Ticker {
                remaining: 3,
                period: 1.0,
            },
        )
        .unwrap();
        let summary = sim.run(10.0).unwrap();
        assert_eq!(summary.resumptions, 4);
        let times: Vec<f64> = sim.node(b).unwrap().recv_log().iter().map(|e| e.time).collect();
        assert_eq!(times, [0.0, 1.0, 2.0]);
    }

    #[test]
    fn receiver_sees_payload_and_can_reply() {
        struct Echo(Rc<RefCell<Vec<String>>>);
        impl Receiver for Echo {
            fn receive(
                &mut self,
                ctx: &mut NodeContext<'_>,
                payload: Payload,
                port: &str,
            ) -> Result<(), SimError> {
                let msg = payload.as_classical().unwrap_or_default().to_string();
                self.0.borrow_mut().push(format!("{port}:{msg}"));
                ctx.send("back", format!("ack {msg}"))?;
                Ok(())
            }
        }

        let (mut sim, a, b) = linked(2e8);
        let back = Channel::classical("ba", 2e8, sim.rng()).unwrap();
        sim.node_mut(b).unwrap().connect_nodes("back", "in", a, back);
        let seen = Rc::new(RefCell::new(Vec::new()));
        sim.set_receiver(b, Echo(seen.clone())).unwrap();

        sim.send(a, "out", "ping").unwrap();
        sim.run(5.0).unwrap();

        assert_eq!(*seen.borrow(), ["in:ping"]);
        let reply = &sim.node(a).unwrap().recv_log()[0];
        assert_eq!(reply.time, 2.0);
        assert_eq!(reply.payload.as_classical(), Some("ack ping"));
    }

    #[test]
    fn cancelled_delivery_is_dropped() {
        let (mut sim, a, b) = linked(2e8);
        let SendOutcome::Scheduled { token, .. } = sim.send(a, "out", "x").unwrap() else {
            panic!("classical channel lost a message");
        };
        token.cancel();
        let summary = sim.run(5.0).unwrap();
        assert_eq!(summary.deliveries, 0);
        assert!(sim.node(b).unwrap().recv_log().is_empty());
        assert_eq!(sim.node(a).unwrap().sent_log().len(), 1);
    }

    #[test]
    fn lost_pulse_is_logged_but_never_arrives() {
        let mut sim = Simulation::new(SimRng::seed_from_u64(1));
        let a = sim.add_node("alice");
        let b = sim.add_node("bob");
        let lossy = Channel::quantum("q", 1e5, 1.0, 0.0, sim.rng()).unwrap();
        sim.node_mut(a).unwrap().connect_nodes("q", "q", b, lossy);

        let outcome = sim.send(a, "q", Pulse::new(1550e-9, 1e-9, 1.0, 0.0)).unwrap();
        assert!(matches!(outcome, SendOutcome::Lost));
        sim.run(1.0).unwrap();
        assert_eq!(sim.node(a).unwrap().sent_log().len(), 1);
        assert!(sim.node(b).unwrap().recv_log().is_empty());
    }

    #[test]
    fn run_rejects_horizon_in_the_past() {
        let (mut sim, _, _) = linked(1.0);
        sim.run(3.0).unwrap();
        assert!(matches!(
            sim.run(1.0),
            Err(SimError::Scheduler(SchedulerError::InThePast { .. }))
        ));
    }
}
