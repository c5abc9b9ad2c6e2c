use anyhow::Context;
use clap::Parser;
use imgate::config::Config;
use imgate::proxy::GatewayProxy;
use pingora::server::configuration::Opt;
use pingora::server::Server;
use std::path::PathBuf;

/// Imgate - on-demand image transcoding gateway built with Cloudflare's Pingora
#[derive(Parser, Debug)]
#[command(name = "imgate")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Daemon mode
    #[arg(short = 'd', long)]
    daemon: bool,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    Ok(config)
}

fn main() {
    if let Err(e) = imgate::logging::init_subscriber() {
        eprintln!("Failed to initialize logging subsystem: {}", e);
        std::process::exit(1);
    }

    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {:#}", e);
        std::process::exit(1);
    });

    tracing::info!(
        config_file = %args
            .config
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<defaults>".to_string()),
        server_address = %config.server.address,
        server_port = config.server.port,
        max_file_size = config.fetch.max_file_size,
        output_formats = ?config.transcode.allowed_output_formats,
        "Configuration loaded successfully"
    );

    if args.test {
        println!("Configuration OK");
        return;
    }

    let opt = Opt {
        daemon: args.daemon,
        ..Default::default()
    };

    let mut server = Server::new(Some(opt)).unwrap_or_else(|e| {
        eprintln!("Failed to create Pingora server: {}", e);
        std::process::exit(1);
    });
    server.bootstrap();

    let proxy = GatewayProxy::new(&config).unwrap_or_else(|e| {
        eprintln!("Failed to create gateway: {}", e);
        std::process::exit(1);
    });

    let mut proxy_service = pingora_proxy::http_proxy_service(&server.configuration, proxy);

    let listen_addr = config.server.listen_addr();
    proxy_service.add_tcp(&listen_addr);

    tracing::info!(
        address = %listen_addr,
        "Starting Imgate gateway"
    );

    server.add_service(proxy_service);

    // Blocks until shutdown
    server.run_forever();
}
