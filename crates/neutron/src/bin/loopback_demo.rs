//! # Loopback Demo
//!
//! One server and N clients in one process. Every side runs the same
//! declarations, the clients chat through the server, and each client asks
//! the server for its own greeting.
//!
//! ## Usage
//!
//! ```bash
//! loopback_demo --clients 3 --seed 42 --config neutron.toml
//! ```

use std::sync::Arc;
use std::time::Duration;

use neutron::networking::{
    ClientId, EndpointResult, LoopbackNetwork, RemoteEvent, RemoteFunction, Remotes,
};
use neutron::{Callback, Direction, Neutron, NeutronBuilder, NeutronConfig};
use serde::{Deserialize, Serialize};

/// A chat line relayed by the server.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ChatLine {
    from: Option<u32>,
    text: String,
}

// Shared declarations: server and clients must reach these in the same order.

fn chat_event(
    remotes: &Remotes,
) -> impl std::future::Future<Output = EndpointResult<RemoteEvent<ChatLine>>> + Send + 'static {
    remotes.event(Direction::Bidirectional)
}

fn greet_function(
    remotes: &Remotes,
) -> impl std::future::Future<Output = EndpointResult<RemoteFunction<String, String>>> + Send + 'static
{
    remotes.function(Direction::ClientToServer)
}

struct Options {
    clients: u32,
    seed: Option<u64>,
    config: Option<String>,
}

fn parse_args() -> Options {
    // Simple parsing, no external deps
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        clients: 3,
        seed: None,
        config: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" | "-c" => {
                if i + 1 < args.len() {
                    options.clients = args[i + 1].parse().unwrap_or(3);
                    i += 1;
                }
            }
            "--seed" | "-s" => {
                if i + 1 < args.len() {
                    options.seed = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    options.config = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: loopback_demo [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --clients <N>      Clients to connect (default: 3)");
                println!("  -s, --seed <SEED>      Naming seed (default: random)");
                println!("      --config <PATH>    TOML configuration file");
                println!("  -h, --help             Show this help");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
            }
        }
        i += 1;
    }
    options
}

async fn run_server(app: &Neutron, network: &LoopbackNetwork, seed: Option<u64>) -> EndpointResult<()> {
    let remotes = match seed {
        Some(seed) => Remotes::server(network.server_host(), seed, &app.config().namer),
        None => app.server_remotes(network.server_host()),
    };

    let chat = chat_event(&remotes).await?;
    let greet = greet_function(&remotes).await?;

    {
        let relay = chat.clone();
        chat.on_server_event(move |client: ClientId, mut line: ChatLine| {
            println!("   [server] {client}: {}", line.text);
            line.from = Some(client.0);
            if let Err(e) = relay.fire_except(client, &line) {
                eprintln!("   [server] relay failed: {e}");
            }
        })?;
    }
    greet.handle_server(|client: ClientId, name: String| async move {
        format!("welcome, {name} ({client})")
    })?;

    network.presence().joined().register(
        Callback::from_fn(|client: ClientId| println!("   [server] {client} joined")),
        "demo",
    );

    println!("   ✓ Server endpoints:");
    for endpoint in remotes.endpoints() {
        println!("       {:<40} -> {:?}", endpoint.name, endpoint.wire_name);
    }
    Ok(())
}

async fn run_client(app: &Neutron, network: &LoopbackNetwork, index: u32) -> EndpointResult<()> {
    let host = network.connect_client();
    let me = host.client_id();
    let remotes = app.client_remotes(host).await;

    let chat = chat_event(&remotes).await?;
    let greet = greet_function(&remotes).await?;

    chat.on_client_event(move |line: ChatLine| {
        if let (Some(me), Some(from)) = (me, line.from) {
            println!("   [client#{}] heard client#{from}: {}", me.0, line.text);
        }
    })?;

    let reply = greet.invoke_server(&format!("player{index}")).await?;
    println!("   [client#{index}] {reply}");

    chat.fire_server(&ChatLine {
        from: None,
        text: format!("hello from player{index}"),
    })?;
    Ok(())
}

fn main() {
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         NEUTRON LOOPBACK DEMO                                    ║");
    println!("║         ONE SERVER, N CLIENTS, SAME DECLARATIONS                 ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let options = parse_args();
    let config = match &options.config {
        Some(path) => match NeutronConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("   ✗ FATAL: {e}");
                std::process::exit(1);
            }
        },
        None => NeutronConfig::default(),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("   ✗ FATAL: failed to build runtime: {e}");
            std::process::exit(1);
        }
    };

    let outcome: Result<(), String> = runtime.block_on(async move {
        let app = NeutronBuilder::new()
            .config(config)
            .build()
            .map_err(|e| e.to_string())?;
        let network = app.loopback();

        let ticks = Arc::new(std::sync::atomic::AtomicU64::new(0));
        {
            let ticks = Arc::clone(&ticks);
            app.on_tick().register(
                Callback::from_fn(move |_delta: Duration| {
                    ticks.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }),
                "demo",
            );
        }

        println!("🌐 Starting server ...");
        run_server(&app, &network, options.seed)
            .await
            .map_err(|e| e.to_string())?;
        app.start();

        println!();
        println!("👥 Connecting {} clients ...", options.clients);
        for index in 1..=options.clients {
            run_client(&app, &network, index)
                .await
                .map_err(|e| e.to_string())?;
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        println!();
        println!("   ✓ Clients connected: {}", network.clients().len());
        println!(
            "   ✓ Ticks fired: {}",
            ticks.load(std::sync::atomic::Ordering::Relaxed)
        );
        Ok(())
    });

    if let Err(e) = outcome {
        eprintln!("   ✗ FATAL: {e}");
        std::process::exit(1);
    }
}
