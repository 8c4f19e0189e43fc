//! Multi-node replication scenarios
//!
//! Servers are wired in a small mesh; every message a server publishes is
//! delivered to its neighbors, which apply it and forward what changed.
//! Delivery runs until the mesh is quiet.

use acctmesh_core::core_account::field::{FieldKind, FieldRegistry, FieldValue, SerializeFormat};
use acctmesh_core::core_account::notify::{AccountEvent, ChangeNotifier, PeerMessage};
use acctmesh_core::core_account::sync::{apply_remote, RemoteContext, RemoteOutcome};
use acctmesh_core::{AccountName, AccountStore, NewAccount, Timestamp};
use tokio::sync::broadcast;

struct Server {
    store: AccountStore,
    outbound: broadcast::Receiver<PeerMessage>,
    neighbors: Vec<usize>,
    linked: bool,
}

struct Mesh {
    servers: Vec<Server>,
}

impl Mesh {
    /// Servers connected in a line: 0 - 1 - 2 - ...
    fn line(count: usize, format: SerializeFormat) -> Self {
        let servers = (0..count)
            .map(|i| {
                let mut registry = FieldRegistry::new();
                registry.register("verified", FieldKind::Bool);
                registry.register("logins", FieldKind::Int { default: 0 });
                let store = AccountStore::with_registry(ChangeNotifier::new(4096), registry, format);
                let outbound = store.notifier().subscribe_outbound();
                let mut neighbors = Vec::new();
                if i > 0 {
                    neighbors.push(i - 1);
                }
                if i + 1 < count {
                    neighbors.push(i + 1);
                }
                Server { store, outbound, neighbors, linked: true }
            })
            .collect();
        Mesh { servers }
    }

    fn store(&self, i: usize) -> &AccountStore {
        &self.servers[i].store
    }

    /// Cut server `i` off from the mesh; messages it publishes meanwhile
    /// are lost, as on a real netsplit
    fn split(&mut self, i: usize) {
        self.servers[i].linked = false;
    }

    /// Reconnect server `i` and exchange a full burst with its neighbors
    fn rejoin(&mut self, i: usize) {
        self.servers[i].linked = true;
        self.pump();
        self.servers[i].store.resync().unwrap();
        for n in self.servers[i].neighbors.clone() {
            self.servers[n].store.resync().unwrap();
        }
        self.pump();
    }

    fn is_up(&self, from: usize, to: usize) -> bool {
        self.servers[from].linked && self.servers[to].linked
    }

    /// Deliver until no server has anything left to send
    fn pump(&mut self) -> usize {
        let mut delivered = 0;
        for _ in 0..64 {
            let mut batch = Vec::new();
            for (i, server) in self.servers.iter_mut().enumerate() {
                while let Ok(msg) = server.outbound.try_recv() {
                    batch.push((i, msg));
                }
            }
            if batch.is_empty() {
                return delivered;
            }
            for (from, msg) in batch {
                for to in self.servers[from].neighbors.clone() {
                    if self.is_up(from, to) {
                        apply_remote(&self.servers[to].store, msg.clone(), &RemoteContext::new()).unwrap();
                        delivered += 1;
                    }
                }
            }
        }
        panic!("mesh did not settle");
    }

    fn assert_converged(&self) {
        let reference = self.servers[0].store.get_db().unwrap();
        for server in &self.servers[1..] {
            assert_eq!(server.store.get_db().unwrap(), reference);
        }
    }
}

#[test]
fn test_creation_reaches_every_server() {
    let mut mesh = Mesh::line(4, SerializeFormat::Network);
    mesh.store(0)
        .add_account(NewAccount::new("Alice", Timestamp(10)).with_credentials("sha256", "s3cret pass", Timestamp(10)), true)
        .unwrap();
    mesh.pump();

    mesh.assert_converged();
    let record = mesh.store(3).get_account(&AccountName::new("alice"), false).unwrap();
    assert_eq!(record.password(), Some("s3cret pass"));
}

#[test]
fn test_field_edits_flow_both_ways() {
    let mut mesh = Mesh::line(3, SerializeFormat::Internal);
    let bob = AccountName::new("bob");
    mesh.store(1).add_account(NewAccount::new("bob", Timestamp(1)), true).unwrap();
    mesh.pump();

    mesh.store(0).set_field(&bob, "logins", FieldValue::Int(3), Timestamp(5), true).unwrap();
    mesh.store(2).set_field(&bob, "logins", FieldValue::Int(9), Timestamp(6), true).unwrap();
    mesh.store(2).set_field(&bob, "verified", FieldValue::Bool(true), Timestamp(6), true).unwrap();
    mesh.pump();

    mesh.assert_converged();
    let record = mesh.store(0).get_account(&bob, false).unwrap();
    assert_eq!(record.field("logins").unwrap().value, FieldValue::Int(9));
    assert_eq!(record.field("verified").unwrap().value, FieldValue::Bool(true));
}

#[test]
fn test_partition_with_conflicting_creations() {
    let mut mesh = Mesh::line(3, SerializeFormat::Network);
    mesh.split(2);

    // Both sides of the split register the same nick
    mesh.store(0).add_account(NewAccount::new("zed", Timestamp(300)), true).unwrap();
    mesh.store(2)
        .add_account(NewAccount::new("Zed", Timestamp(200)).with_connect_class("users", Timestamp(210)), true)
        .unwrap();
    mesh.pump();
    assert_eq!(
        mesh.store(1).get_account(&AccountName::new("zed"), false).unwrap().created_at(),
        Timestamp(300)
    );

    mesh.rejoin(2);

    mesh.assert_converged();
    let record = mesh.store(0).get_account(&AccountName::new("zed"), false).unwrap();
    assert_eq!(record.created_at(), Timestamp(200));
    assert_eq!(record.name().as_str(), "Zed");
    assert_eq!(record.connect_class(), Some("users"));
}

#[test]
fn test_removal_reaches_every_server() {
    let mut mesh = Mesh::line(3, SerializeFormat::Internal);
    let erin = mesh.store(0).add_account(NewAccount::new("erin", Timestamp(5)), true).unwrap();
    mesh.pump();
    mesh.assert_converged();

    mesh.store(0).remove_account(&erin, true).unwrap();
    mesh.pump();
    mesh.assert_converged();
    assert!(mesh.store(2).is_empty().unwrap());

    // A removal message for an incarnation nobody holds changes nothing
    let stale = PeerMessage::Removal { name: "erin".into(), created_at: Timestamp(5) };
    assert_eq!(
        apply_remote(mesh.store(1), stale, &RemoteContext::new()).unwrap(),
        RemoteOutcome::Ignored
    );
}

#[tokio::test]
async fn test_listeners_see_replacement_in_order() {
    let mut mesh = Mesh::line(2, SerializeFormat::Network);
    let mut events = mesh.store(1).notifier().subscribe();
    mesh.split(1);

    mesh.store(1).add_account(NewAccount::new("fay", Timestamp(90)), true).unwrap();
    mesh.store(0).add_account(NewAccount::new("fay", Timestamp(80)), true).unwrap();
    mesh.pump();
    mesh.rejoin(1);

    let first = events.recv().await.unwrap();
    assert!(matches!(first, AccountEvent::Modified { entry: Some(ref r), .. } if r.created_at() == Timestamp(90)));
    let second = events.recv().await.unwrap();
    assert!(second.is_removal());
    let third = events.recv().await.unwrap();
    assert!(matches!(third, AccountEvent::Modified { entry: Some(ref r), .. } if r.created_at() == Timestamp(80)));
    mesh.assert_converged();
}
