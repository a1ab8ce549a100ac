#[macro_use]
extern crate log;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use structopt::StructOpt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;

use router::{Error, Execution, Operator, Router, TcpDeliver, USAGE};
use synod::NodeId;

#[derive(StructOpt)]
#[structopt(name = "router")]
struct Opt {
    /// Address the router listens on
    #[structopt(short = "i", long = "id", default_value = "127.0.0.1:7005")]
    id: String,

    /// Addresses of every node in the cluster
    #[structopt(short = "m", long = "member", required = true)]
    members: Vec<String>,

    /// JSON list of operator commands to run before the prompt
    #[structopt(short = "s", long = "script")]
    script: Option<PathBuf>,

    #[structopt(short = "v", parse(from_occurrences))]
    verbose: u8,
}

async fn run() -> Result<(), Error> {
    let opt = Opt::from_args();
    synod::logger::init(opt.verbose)?;

    let members = opt.members
        .iter()
        .map(|member| member.parse::<NodeId>())
        .collect::<Result<Vec<_>, _>>()?;
    let router = Arc::new(Router::new(members, TcpDeliver));

    let listener = TcpListener::bind(&opt.id).await?;
    println!("Router is listening on {}", opt.id);

    let serving = router.clone();
    tokio::spawn(async move {
        let result = synod::socket::serve(listener, move |line| {
            let router = serving.clone();
            async move { router.handle_line(&line).await }
        }).await;
        if let Err(error) = result {
            error!("router socket failed: {}", error);
        }
    });

    if let Some(path) = opt.script {
        for operator in Execution::load(path)?.0 {
            println!("Executing command {}", operator);
            show(router.execute(operator).await);
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let line = match lines.next_line().await? {
        | Some(line) => line,
        | None => return Ok(()),
        };
        if line.trim().is_empty() {
            continue
        }
        match line.parse::<Operator>() {
        | Ok(operator) => show(router.execute(operator).await),
        | Err(error) => println!("[ERROR]: {}\n{}", error, USAGE),
        }
    }
}

fn show(result: Result<Option<String>, Error>) {
    match result {
    | Ok(Some(output)) => println!("{}", output),
    | Ok(None) => (),
    | Err(error) => println!("[ERROR]: {}", error),
    }
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("[ERROR]: {}", error);
        std::process::exit(2);
    }
}
