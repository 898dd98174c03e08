use crate::network::channel::{Channel, Payload};
use crate::optics::Component;
use std::collections::BTreeMap;
use std::fmt;

/// Index of a node inside its [`Simulation`](crate::network::Simulation).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Far end of a local port.
#[derive(Clone, Debug)]
pub struct Connection {
    pub remote_node: NodeId,
    pub remote_port: String,
    pub channel: Channel,
}

/// One line of a node's send or receive log.
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub time: f64,
    pub port: String,
    pub payload: Payload,
}

/// A network endpoint: named ports, installed hardware, outgoing links and
/// append-only traffic logs.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    name: String,
    ports: BTreeMap<String, String>,
    components: BTreeMap<String, Component>,
    connections: BTreeMap<String, Connection>,
    sent_log: Vec<LogEntry>,
    recv_log: Vec<LogEntry>,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ports: BTreeMap::new(),
            components: BTreeMap::new(),
            connections: BTreeMap::new(),
            sent_log: Vec::new(),
            recv_log: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn assign_port(&mut self, port_id: impl Into<String>, port_name: impl Into<String>) {
        self.ports.insert(port_id.into(), port_name.into());
    }

    pub fn port_name(&self, port_id: &str) -> Option<&str> {
        self.ports.get(port_id).map(String::as_str)
    }

    pub fn ports(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ports.iter().map(|(id, name)| (id.as_str(), name.as_str()))
    }

    pub fn add_component(&mut self, name: impl Into<String>, component: impl Into<Component>) {
        self.components.insert(name.into(), component.into());
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.get_mut(name)
    }

    /// Links `local_port` to `remote_port` on `remote_node` through `channel`.
    /// Reconnecting a port replaces its previous link.
    pub fn connect_nodes(
        &mut self,
        local_port: impl Into<String>,
        remote_port: impl Into<String>,
        remote_node: NodeId,
        channel: Channel,
    ) {
        self.connections.insert(
            local_port.into(),
            Connection {
                remote_node,
                remote_port: remote_port.into(),
                channel,
            },
        );
    }

    pub fn connection(&self, port_id: &str) -> Option<&Connection> {
        self.connections.get(port_id)
    }

    pub(crate) fn connection_mut(&mut self, port_id: &str) -> Option<&mut Connection> {
        self.connections.get_mut(port_id)
    }

    pub fn sent_log(&self) -> &[LogEntry] {
        &self.sent_log
    }

    pub fn recv_log(&self) -> &[LogEntry] {
        &self.recv_log
    }

    pub(crate) fn log_sent(&mut self, time: f64, port: &str, payload: Payload) {
        self.sent_log.push(LogEntry {
            time,
            port: port.to_string(),
            payload,
        });
    }

    pub(crate) fn log_received(&mut self, time: f64, port: &str, payload: Payload) {
        self.recv_log.push(LogEntry {
            time,
            port: port.to_string(),
            payload,
        });
    }
}
