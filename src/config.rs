//! Startup configuration
//!
//! Every setting can be given as a flag or through its environment variable.

use anyhow::{Context, Result};
use clap::Parser;
use relay64_extract::is_ipv6_literal;
use relay64_store::{FileAddressPersistence, Mapping};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// IPv4 to IPv6 TCP relay with a dynamic destination address
#[derive(Parser, Debug)]
#[command(name = "relay64")]
#[command(version = env!("GIT_TAG"))]
#[command(long_version = concat!(env!("GIT_TAG"), "\nCommit: ", env!("GIT_HASH"), "\nBuilt: ", env!("BUILD_TIME")))]
#[command(long_about = r#"
Accepts IPv4 connections on the source ports and relays each of them to the
matching destination port on a single IPv6 host. The host address is updated
through an authenticated webhook and persisted across restarts.

EXAMPLES:
  # Relay 8080 -> 80 and 7070 -> 443
  WEBHOOK_TOKEN=secret SRC_PORTS=8080,7070 DEST_PORTS=80,443 relay64

  # Push a new destination address
  curl -X POST -H "Authorization: Bearer secret" \
    --data "2001:db8::42" http://localhost:8081/update
"#)]
pub struct Args {
    /// Secret expected in `Authorization: Bearer <token>` on /update
    #[arg(long, env = "WEBHOOK_TOKEN", hide_env_values = true)]
    pub webhook_token: String,

    /// Comma separated inbound (IPv4) ports
    #[arg(long, env = "SRC_PORTS", default_value = "8080")]
    pub src_ports: String,

    /// Comma separated destination (IPv6) ports, paired with --src-ports by position
    #[arg(long, env = "DEST_PORTS", default_value = "8080")]
    pub dest_ports: String,

    /// Address the tunnel listeners bind to
    #[arg(long, env = "SRC_LISTEN_ADDR", default_value = "0.0.0.0")]
    pub src_listen_addr: IpAddr,

    /// Address the webhook server binds to
    #[arg(long, env = "WEBHOOK_LISTEN_ADDR", default_value = "0.0.0.0")]
    pub webhook_listen_addr: IpAddr,

    /// Port the webhook server binds to
    #[arg(long, env = "WEBHOOK_LISTEN_PORT", default_value = "8081")]
    pub webhook_listen_port: u16,

    /// Directory holding the persisted destination address
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Destination address used until one is persisted or pushed
    #[arg(long, env = "DEFAULT_IPV6_ADDRESS", default_value = "2001:db8::1")]
    pub default_address: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub webhook_token: String,
    pub mappings: Vec<Mapping>,
    pub tunnel_listen_addr: IpAddr,
    pub webhook_bind_addr: SocketAddr,
    pub address_file: PathBuf,
    pub default_address: String,
}

impl RelayConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        if args.webhook_token.is_empty() {
            anyhow::bail!("WEBHOOK_TOKEN environment variable not set");
        }

        let mappings = Mapping::pair_lists(&args.src_ports, &args.dest_ports)
            .context("Invalid SRC_PORTS/DEST_PORTS")?;

        if !is_ipv6_literal(&args.default_address) {
            anyhow::bail!(
                "DEFAULT_IPV6_ADDRESS {:?} is not an IPv6 address",
                args.default_address
            );
        }

        Ok(Self {
            webhook_token: args.webhook_token.clone(),
            mappings,
            tunnel_listen_addr: args.src_listen_addr,
            webhook_bind_addr: SocketAddr::new(args.webhook_listen_addr, args.webhook_listen_port),
            address_file: args.data_dir.join(FileAddressPersistence::FILE_NAME),
            default_address: args.default_address.clone(),
        })
    }
}
