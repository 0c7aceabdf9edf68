use std::time::Instant;

use bitcaskd::net::Client;
use clap::{Parser, ValueEnum};
use rand::Rng;

#[derive(Parser, Debug)]
#[command(name = "press")]
struct Args {
    address: String,
    port: u16,
    op: Op,

    /// Number of concurrent connections.
    #[arg(long, default_value_t = 100)]
    users: usize,

    /// Number of requests issued per connection.
    #[arg(long, default_value_t = 100)]
    requests: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Op {
    Set,
    Get,
    Del,
}

/// A random alphanumeric string, matching the shape of the source's
/// `Debugger::genString` synthetic key/value generator.
fn gen_string() -> String {
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(4..16);
    (0..len)
        .map(|_| rng.sample(rand::distributions::Alphanumeric) as char)
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let start = Instant::now();
    let mut tasks = Vec::with_capacity(args.users);
    for _ in 0..args.users {
        let address = args.address.clone();
        let port = args.port;
        let op = args.op;
        let requests = args.requests;
        tasks.push(tokio::spawn(async move {
            let mut client = Client::connect(&address, port).await?;
            for _ in 0..requests {
                let key = gen_string();
                let request = match op {
                    Op::Set => format!("set {key} {}", gen_string()),
                    Op::Get => format!("get {key}"),
                    Op::Del => format!("del {key}"),
                };
                client.send(&request).await?;
            }
            Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
        }));
    }

    for task in tasks {
        task.await??;
    }

    let elapsed = start.elapsed();
    let total = args.users * args.requests;
    println!("total: {total} requests in {elapsed:?}");
    println!(
        "avg: {:.3}ms per request",
        elapsed.as_secs_f64() * 1000.0 / total as f64
    );

    Ok(())
}
