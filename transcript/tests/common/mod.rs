//! In-process cluster: every node is a [`Server`] whose outgoing lines go
//! through a real [`Router`], which hands them back to the destination
//! server on a fresh task after a short random delay.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use router::{Deliver, Router};
use synod::{Config, Control, Node, NodeId, Transport};
use transcript::{Error, NoOracle, Oracle, Server, Store};

pub const LEADER: &str = "127.0.0.1:7000";
pub const FOLLOWER_1: &str = "127.0.0.1:7001";
pub const FOLLOWER_2: &str = "127.0.0.1:7002";

/// Always answers with the same text.
pub struct FixedOracle(pub &'static str);

#[async_trait]
impl Oracle for FixedOracle {
    async fn answer(&self, _: &str) -> Result<String, Error> {
        Ok(self.0.to_string())
    }
}

/// Answers with the same text after a delay.
pub struct SlowOracle(pub Duration, pub &'static str);

#[async_trait]
impl Oracle for SlowOracle {
    async fn answer(&self, _: &str) -> Result<String, Error> {
        tokio::time::sleep(self.0).await;
        Ok(self.1.to_string())
    }
}

#[derive(Default)]
pub struct Nodes {
    servers: RwLock<HashMap<NodeId, Server>>,
    dead: RwLock<HashSet<NodeId>>,

    /// A node dies right after handling a line starting with its prefix
    traps: RwLock<HashMap<NodeId, String>>,
}

#[derive(Clone, Default)]
pub struct SimDeliver(Arc<Nodes>);

impl Deliver for SimDeliver {
    fn deliver(&self, dest: &NodeId, line: String) {
        if self.0.dead.read().contains(dest) {
            return
        }
        let server = match self.0.servers.read().get(dest) {
        | Some(server) => server.clone(),
        | None => return,
        };
        let nodes = self.0.clone();
        let dest = dest.clone();
        let delay = Duration::from_millis(rand::random::<u64>() % 3);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if nodes.dead.read().contains(&dest) {
                return
            }
            let control = server.handle_line(&line);
            let trapped = nodes.traps
                .read()
                .get(&dest)
                .map_or(false, |prefix| line.starts_with(prefix.as_str()));
            if control == Control::Terminate || trapped {
                nodes.dead.write().insert(dest);
            }
        });
    }
}

struct SimTransport {
    id: NodeId,
    router: Arc<Router<SimDeliver>>,
}

impl Transport for SimTransport {
    fn send(&self, dest: &NodeId, line: String) {
        self.router.route(&self.id, dest, line);
    }
}

pub struct Cluster {
    pub router: Arc<Router<SimDeliver>>,
    nodes: Arc<Nodes>,
}

impl Cluster {
    /// Starts the leader and two followers with the given answer backends.
    pub fn start(oracles: [Arc<dyn Oracle>; 3]) -> Self {
        let ids: Vec<NodeId> = [LEADER, FOLLOWER_1, FOLLOWER_2]
            .iter()
            .map(|id| NodeId::from(*id))
            .collect();
        let deliver = SimDeliver::default();
        let nodes = deliver.0.clone();
        let router = Arc::new(Router::new(ids.clone(), deliver));

        for (id, oracle) in ids.iter().zip(oracles) {
            let config = Config::new(id.clone(), ids.clone(), LEADER.into())
                .unwrap()
                .with_timeout(Duration::from_millis(100))
                .with_backoff(Duration::from_millis(20))
                .with_max_attempts(5);
            let transport = SimTransport { id: id.clone(), router: router.clone() };
            let node: Node<Store> = Node::new(config, Arc::new(transport));
            nodes.servers.write().insert(id.clone(), Server::new(node, oracle));
        }
        Cluster { router, nodes }
    }

    pub fn answering(leader: &'static str, follower_1: &'static str, follower_2: &'static str) -> Self {
        Cluster::start([fixed(leader), fixed(follower_1), fixed(follower_2)])
    }

    pub fn server(&self, id: &str) -> Server {
        self.nodes.servers.read()[&NodeId::from(id)].clone()
    }

    pub fn is_dead(&self, id: &str) -> bool {
        self.nodes.dead.read().contains(&NodeId::from(id))
    }

    /// Kills `id` as soon as it has handled a line starting with `prefix`.
    pub fn kill_after(&self, id: &str, prefix: &str) {
        self.nodes.traps.write().insert(NodeId::from(id), prefix.to_string());
    }

    pub async fn operator(&self, line: &str) {
        let operator = line.parse().unwrap();
        self.router.execute(operator).await.unwrap();
    }

    pub fn answers(&self, id: &str, context: &str) -> Option<usize> {
        self.server(id)
            .node()
            .read(|store| store.context(context).map(|entry| entry.answers()))
    }

    pub fn candidates(&self, context: &str) -> usize {
        self.server(LEADER)
            .node()
            .read(|store| store.candidates(context).map_or(0, |candidates| candidates.len()))
    }
}

pub fn fixed(text: &'static str) -> Arc<dyn Oracle> {
    Arc::new(FixedOracle(text))
}

pub fn slow(delay: Duration, text: &'static str) -> Arc<dyn Oracle> {
    Arc::new(SlowOracle(delay, text))
}

pub fn no_oracle() -> Arc<dyn Oracle> {
    Arc::new(NoOracle)
}

pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..150 {
        if condition() {
            return true
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
