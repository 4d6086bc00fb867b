use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dnsprove::config::{ProverConfig, TransportKind};
use dnsprove::dns::{Name, enums::DNSResourceType};
use dnsprove::{ChainResolver, LookupResult, ResolveOptions};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Fetch DNS records together with the DNSSEC proofs that authenticate them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file; defaults come from DNSPROVE_* variables otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// DNS-over-HTTPS endpoint
    #[arg(long, global = true)]
    doh_url: Option<String>,

    /// Query a resolver over UDP instead of DoH
    #[arg(long, global = true)]
    udp: Option<SocketAddr>,

    /// Per-query timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Also trust the dummy anchor of oracle test deployments
    #[arg(long, global = true)]
    dummy_anchor: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a record set and build its proof chain
    Lookup {
        /// Record type, e.g. TXT or TYPE65280
        rtype: DNSResourceType,

        /// Domain name
        name: Name,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Give up after this many seconds
        #[arg(long)]
        deadline: Option<u64>,
    },
}

fn load_config(args: &Args) -> Result<ProverConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ProverConfig::from_toml_file(path)?,
        None => ProverConfig::from_env()?,
    };
    if let Some(url) = &args.doh_url {
        config.transport = TransportKind::Doh;
        config.doh_url = url.clone();
    }
    if let Some(server) = args.udp {
        config.transport = TransportKind::Udp;
        config.udp_server = server;
    }
    if let Some(secs) = args.timeout {
        config.query_timeout = Duration::from_secs(secs);
    }
    if args.dummy_anchor {
        config.include_dummy_anchor = true;
    }
    config.validate()?;
    Ok(config)
}

fn print_text(result: &LookupResult) {
    if result.is_inconclusive() {
        println!("No answer and no denial in response");
        return;
    }
    println!(
        "{} ({} proofs)",
        if result.found { "FOUND" } else { "NONEXISTENT (NSEC)" },
        result.proofs.len()
    );
    for (rrset, proof) in result.results.iter().zip(&result.proofs) {
        println!(";; {} {} hash={}", rrset.name, rrset.rtype, proof.hash());
        for record in &rrset.records {
            println!("{}\t{}\t{}\t{}", rrset.name, rrset.ttl, rrset.rtype, record);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let resolver = ChainResolver::new(config.build_transport()?, config.trust_anchors()?);

    match args.command {
        Command::Lookup {
            rtype,
            name,
            json,
            deadline,
        } => {
            let options = match deadline {
                Some(secs) => ResolveOptions::with_timeout(Duration::from_secs(secs)),
                None => ResolveOptions::default(),
            };
            let result = match resolver.resolve_with(rtype, &name, &options).await {
                Ok(result) => result,
                Err(e) => {
                    error!(%name, %rtype, error = %e, "Lookup failed");
                    return Err(e.into());
                }
            };
            info!(
                %name,
                %rtype,
                found = result.found,
                nsec = result.nsec,
                proofs = result.proofs.len(),
                "Lookup complete"
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_text(&result);
            }
        }
    }

    Ok(())
}
