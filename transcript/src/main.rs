use std::sync::Arc;

use structopt::StructOpt;

use synod::{Config, Node, NodeId, RouterTransport};
use transcript::{CommandOracle, NoOracle, Oracle, Server, Store};

#[derive(StructOpt)]
#[structopt(name = "transcript-node")]
struct Opt {
    /// Address to listen on, which is also this node's ID
    #[structopt(short = "i", long = "id")]
    id: String,

    /// Every cluster member, including this node
    #[structopt(short = "m", long = "member", required = true)]
    members: Vec<String>,

    /// The member acting as proposer
    #[structopt(short = "l", long = "leader")]
    leader: String,

    /// Address of the router all outgoing messages go through
    #[structopt(short = "r", long = "router", default_value = "127.0.0.1:7005")]
    router: String,

    /// Timeout for each prepare or accept phase (in milliseconds)
    #[structopt(short = "t", long = "timeout", default_value = "1000")]
    timeout: u64,

    /// Attempts before a proposal gives up
    #[structopt(short = "a", long = "attempts", default_value = "10")]
    attempts: usize,

    /// Program that answers a prompt read from stdin
    #[structopt(long = "oracle")]
    oracle: Option<String>,

    /// Argument passed to the oracle program (repeatable)
    #[structopt(long = "oracle-arg")]
    oracle_args: Vec<String>,

    /// Seconds to wait for the oracle program
    #[structopt(long = "oracle-timeout", default_value = "30")]
    oracle_timeout: u64,

    /// Logging verbosity (-v, -vv, -vvv)
    #[structopt(short = "v", parse(from_occurrences))]
    verbose: u8,
}

async fn run(opt: Opt) -> Result<(), transcript::Error> {
    synod::logger::init(opt.verbose)?;

    let id: NodeId = opt.id.parse()?;
    let members = opt.members
        .iter()
        .map(|member| member.parse())
        .collect::<Result<Vec<NodeId>, _>>()?;
    let leader: NodeId = opt.leader.parse()?;

    let config = Config::new(id.clone(), members, leader)?
        .with_timeout(std::time::Duration::from_millis(opt.timeout))
        .with_max_attempts(opt.attempts);

    let transport = Arc::new(RouterTransport::new(id.clone(), opt.router));
    let node: Node<Store> = Node::new(config, transport);

    let oracle: Arc<dyn Oracle> = match opt.oracle {
    | Some(program) => Arc::new(CommandOracle::new(
        program,
        opt.oracle_args,
        std::time::Duration::from_secs(opt.oracle_timeout),
    )),
    | None => Arc::new(NoOracle),
    };

    let listener = tokio::net::TcpListener::bind(id.as_str()).await?;
    println!("Server {} is listening{}", id, if node.is_leader() { " as leader" } else { "" });
    Server::new(node, oracle).run(listener).await
}

#[tokio::main]
async fn main() {
    if let Err(error) = run(Opt::from_args()).await {
        eprintln!("[ERROR]: {}", error);
        std::process::exit(2);
    }
}
