use analogue_cluster::aggregator::{AggregationService, AggregatorConsumer};
use analogue_cluster::array::BincodeStore;
use analogue_cluster::config::{
    AggregatorProperties, ControllerKind, MasterProperties, RequestsFile, WorkerProperties,
};
use analogue_cluster::controller::{BruteForceController, NdrankController};
use analogue_cluster::master::Master;
use analogue_cluster::queue::{HttpBroker, InMemoryBroker, QueueClient, broker_router};
use analogue_cluster::registry::ComponentRegistry;
use analogue_cluster::rpc::{DEFAULT_MAX_WORKERS, RpcServer, SearchController};
use analogue_cluster::transfer::FileProtocol;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "analogue-cluster", about = "Distributed search of weather analogues")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serves searches over the local partition.
    Worker {
        #[arg(short = 'p', long = "properties")]
        properties: PathBuf,
        /// Delete received input files once a request is answered.
        #[arg(short = 'd', long = "delete-input", default_value_t = true, action = clap::ArgAction::Set)]
        delete_input_files: bool,
    },
    /// Merges first-phase results of ndrank workers.
    Aggregator {
        #[arg(short = 'p', long = "properties")]
        properties: PathBuf,
    },
    /// Runs a requests file against the workers.
    Master {
        #[arg(short = 'p', long = "properties")]
        properties: PathBuf,
        #[arg(short = 'r', long = "requests")]
        requests: PathBuf,
    },
    /// Serves the message broker over HTTP.
    Broker {
        #[arg(long = "bind", default_value = "127.0.0.1:9092")]
        bind: SocketAddr,
    },
}

fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match Cli::parse().command {
        Command::Worker {
            properties,
            delete_input_files,
        } => run_worker(properties, delete_input_files).await,
        Command::Aggregator { properties } => run_aggregator(properties).await,
        Command::Master {
            properties,
            requests,
        } => run_master(properties, requests).await,
        Command::Broker { bind } => run_broker(bind).await,
    }
}

async fn run_worker(path: PathBuf, delete_input_files: bool) -> anyhow::Result<()> {
    // 1. Properties:
    let properties = WorkerProperties::load(&path)?;
    init_tracing(properties.debug_ts_log);
    tracing::info!("Starting worker {}", properties.node_id);

    // 2. Components:
    let registry = ComponentRegistry::with_defaults(
        Arc::new(BincodeStore),
        properties.correlation_functions.clone(),
    );
    let full_resolution_service = registry.service(&properties.service, &properties.repository)?;
    let low_resolution_service = match (
        &properties.low_resolution_service,
        &properties.low_resolution_repository,
    ) {
        (Some(tag), Some(repository)) => Some(registry.service(tag, repository)?),
        _ => None,
    };

    // 3. File transfer:
    std::fs::create_dir_all(&properties.temporary_folder)?;
    let ports = &properties.network_config.available_ports;
    let file_protocol = FileProtocol::new(
        &properties.network_config.ip,
        ports.from,
        ports.to,
        &properties.temporary_folder,
    )?;

    // 4. Controller:
    let controller: Arc<dyn SearchController> = match properties.controller {
        ControllerKind::BruteForce => BruteForceController::new(
            file_protocol,
            full_resolution_service,
            registry,
            delete_input_files,
        ),
        ControllerKind::Ndrank => {
            let (host, port) = properties.broker_address()?;
            let queue = Arc::new(QueueClient::new(
                HttpBroker::new(&host, port),
                &properties.node_id,
            ));
            NdrankController::new(
                file_protocol,
                full_resolution_service,
                low_resolution_service,
                queue,
                registry,
                &properties.temporary_folder,
                delete_input_files,
            )
        }
    };

    // 5. RPC server:
    let address = properties.network_config.rpc_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let server = RpcServer::new(controller, DEFAULT_MAX_WORKERS);
    tracing::info!("Worker listening on {}", address);
    tracing::info!("Press Ctrl+C to shutdown");

    tokio::select! {
        served = server.serve(listener) => served?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down worker"),
    }
    Ok(())
}

async fn run_aggregator(path: PathBuf) -> anyhow::Result<()> {
    init_tracing(false);

    // 1. Properties:
    let properties = AggregatorProperties::load(&path)?;

    // 2. Consumer:
    let broker = HttpBroker::new(&properties.kafka_ip, properties.kafka_port);
    let service = AggregationService::new(&properties.node_ids);
    let consumer = AggregatorConsumer::new(service, broker, &properties.group_id);

    let running = consumer.clone();
    let handle = tokio::spawn(async move {
        running.start().await;
    });

    // 3. Wait for shutdown:
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down aggregator");
    consumer.stop();
    handle.await?;
    Ok(())
}

async fn run_master(properties: PathBuf, requests: PathBuf) -> anyhow::Result<()> {
    init_tracing(true);
    tracing::debug!("Using properties file: {}", properties.display());
    tracing::debug!("Using requests file: {}", requests.display());

    let properties = MasterProperties::load(&properties)?;
    let requests = RequestsFile::load(&requests)?;

    let master = Master::new(&properties)?;
    let log = master.run(&requests).await?;
    tracing::info!("Run log written to {}", log.display());
    Ok(())
}

async fn run_broker(bind: SocketAddr) -> anyhow::Result<()> {
    init_tracing(false);

    let broker = InMemoryBroker::new();
    let app = broker_router(broker);

    tracing::info!("Broker listening on {}", bind);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
