use qlink::QuantumState;
use qlink::errors::{ConfigurationError, SimError};
use qlink::network::{Channel, NodeContext, Payload, Receiver, SendOutcome, Simulation};
use qlink::optics::{Laser, Pulse};
use qlink::rng::SimRng;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Default)]
struct Arrivals(Rc<RefCell<Vec<(f64, String, Payload)>>>);

impl Receiver for Arrivals {
    fn receive(
        &mut self,
        ctx: &mut NodeContext<'_>,
        payload: Payload,
        port: &str,
    ) -> Result<(), SimError> {
        self.0
            .borrow_mut()
            .push((ctx.now(), port.to_string(), payload));
        Ok(())
    }
}

#[test]
fn pulse_arrives_after_exactly_length_over_speed() {
    let mut sim = Simulation::new(SimRng::seed_from_u64(2024));
    let alice = sim.add_node("alice");
    let bob = sim.add_node("bob");
    sim.node_mut(alice).unwrap().assign_port("qout", "quantum out");
    sim.node_mut(bob).unwrap().assign_port("qin", "quantum in");

    let length = 25_000.0;
    let channel = Channel::quantum("fibre", length, 0.0, 0.0, sim.rng()).unwrap();
    let sender = sim.node_mut(alice).unwrap();
    sender.connect_nodes("qout", "qin", bob, channel);

    let arrivals = Arrivals::default();
    sim.set_receiver(bob, arrivals.clone()).unwrap();

    let mut laser = Laser::new(1550e-9, 1.0);
    let pulse = laser
        .emit_pulse(70e-12, 1.25, Some(QuantumState::new(1)))
        .with_polarization(45.0)
        .with_timestamp(0.0);
    let outcome = sim.send(alice, "qout", pulse.clone()).unwrap();
    assert!(matches!(outcome, SendOutcome::Scheduled { .. }));

    sim.run(1e-3).unwrap();

    let seen = arrivals.0.borrow();
    assert_eq!(seen.len(), 1);
    let (time, port, payload) = &seen[0];
    assert_eq!(*time, length / 2e8);
    assert_eq!(port, "qin");

    let got = payload.as_pulse().unwrap();
    assert_eq!(got.id, pulse.id);
    assert_eq!(got.phase, pulse.phase);
    assert_eq!(got.polarization, pulse.polarization);
    assert_eq!(got.mean_photon_number, pulse.mean_photon_number);
    assert_eq!(
        got.quantum_state.as_ref().unwrap().density_matrix,
        pulse.quantum_state.as_ref().unwrap().density_matrix
    );

    let recv = sim.node(bob).unwrap().recv_log();
    assert_eq!(recv.len(), 1);
    assert_eq!(recv[0].time, length / 2e8);
    assert_eq!(sim.node(alice).unwrap().sent_log()[0].time, 0.0);
}

#[test]
fn same_instant_deliveries_keep_send_order() {
    let mut sim = Simulation::new(SimRng::seed_from_u64(3));
    let hub = sim.add_node("hub");
    let left = sim.add_node("left");
    let right = sim.add_node("right");
    let sink = sim.add_node("sink");

    for (node, port) in [(left, "a"), (right, "b"), (hub, "c")] {
        let ch = Channel::classical(format!("{port}-sink"), 2e8, sim.rng()).unwrap();
        sim.node_mut(node).unwrap().connect_nodes(port, port, sink, ch);
    }

    let arrivals = Arrivals::default();
    sim.set_receiver(sink, arrivals.clone()).unwrap();

    sim.send(right, "b", "second").unwrap();
    sim.send(left, "a", "first").unwrap();
    sim.send(hub, "c", "third").unwrap();
    sim.run(10.0).unwrap();

    let order: Vec<String> = arrivals
        .0
        .borrow()
        .iter()
        .map(|(t, port, _)| {
            assert_eq!(*t, 1.0);
            port.clone()
        })
        .collect();
    assert_eq!(order, ["b", "a", "c"]);
}

#[test]
fn sending_on_unconnected_port_fails_immediately() {
    let mut sim = Simulation::new(SimRng::seed_from_u64(0));
    let alice = sim.add_node("alice");
    sim.node_mut(alice).unwrap().assign_port("qout", "quantum out");

    let err = sim
        .send(alice, "qout", Pulse::new(1550e-9, 1e-9, 1.0, 0.0))
        .unwrap_err();
    match err {
        SimError::Configuration(ConfigurationError::PortNotConnected { node, port }) => {
            assert_eq!(node, "alice");
            assert_eq!(port, "qout");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn lossy_link_drops_silently_and_is_reproducible() {
    fn run(seed: u64) -> (usize, Vec<f64>) {
        let mut sim = Simulation::new(SimRng::seed_from_u64(seed));
        let alice = sim.add_node("alice");
        let bob = sim.add_node("bob");
        // 50 km at 0.2 dB/km: 10 dB, 90 % loss
        let ch = Channel::quantum("fibre", 50_000.0, 0.0002, 0.0, sim.rng()).unwrap();
        sim.node_mut(alice).unwrap().connect_nodes("q", "q", bob, ch);

        let mut lost = 0;
        for _ in 0..2000 {
            if let SendOutcome::Lost = sim
                .send(alice, "q", Pulse::new(1550e-9, 1e-9, 1.0, 0.0))
                .unwrap()
            {
                lost += 1;
            }
        }
        sim.run(1.0).unwrap();
        assert_eq!(sim.node(alice).unwrap().sent_log().len(), 2000);
        let arrivals = sim
            .node(bob)
            .unwrap()
            .recv_log()
            .iter()
            .map(|e| e.time)
            .collect();
        (lost, arrivals)
    }

    let (lost, arrivals) = run(77);
    assert_eq!(lost + arrivals.len(), 2000);
    // 0.9 ± 5σ with σ ≈ 0.0067
    let loss_rate = lost as f64 / 2000.0;
    assert!((loss_rate - 0.9).abs() < 0.034, "loss rate {loss_rate}");

    assert_eq!(run(77), (lost, arrivals));
}
