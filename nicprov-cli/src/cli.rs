//! Command-line argument parsing.

use clap::Parser;

/// nicprov - attach and configure a domain's network interfaces
#[derive(Parser, Debug)]
#[command(name = "nicprov")]
#[command(about = "Attach network interfaces to a domain, boot it, and configure guest networking")]
#[command(version)]
pub struct Args {
    /// Path to the machine description (optional, defaults used if not found)
    #[arg(short, long, env = "NICPROV_CONFIG")]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// UUID of the domain to provision
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Use the in-memory mock hypervisor
    #[arg(long)]
    pub dev: bool,

    /// Libvirt connection URI
    #[arg(long, env = "LIBVIRT_DEFAULT_URI")]
    pub libvirt_uri: Option<String>,

    /// Fallback network for interfaces without a more specific match
    #[arg(long)]
    pub management_network: Option<String>,

    /// Where to write the guest Netplan configuration
    #[arg(long)]
    pub netplan_out: Option<String>,
}
