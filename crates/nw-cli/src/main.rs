//! Netwarden CLI
//!
//! Loads rule lists and matches single requests or DNS queries against them.
//! Results are printed as JSON.

use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use env_logger::{Builder, Env, Target};
use serde::Serialize;

use nw_core::{CosmeticOption, HostRule, NetworkRule, Request, RequestType, RrType, Rule};
use nw_engine::{DnsEngine, DnsRequest, Engine};
use nw_filterlist::{FileConfig, FileRuleList, RuleList, RuleStorage};

#[derive(Parser)]
#[command(name = "nw-cli")]
#[command(about = "Netwarden rule matching tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ListArgs {
    /// Rule list files; list IDs are assigned 1..N in order
    #[arg(short, long)]
    list: Vec<PathBuf>,

    /// JSON array of `{"id", "path", "ignore_cosmetic"}` list configs
    #[arg(short, long, conflicts_with = "list")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Match a URL request
    Match {
        #[command(flatten)]
        lists: ListArgs,

        /// Request URL
        #[arg(short, long)]
        url: String,

        /// URL of the page that made the request
        #[arg(short, long, default_value = "")]
        source_url: String,

        /// Request type (script, image, document, ...)
        #[arg(short = 't', long, default_value = "other")]
        request_type: String,
    },

    /// Match a DNS query
    Dns {
        #[command(flatten)]
        lists: ListArgs,

        /// Queried hostname
        #[arg(long)]
        host: String,

        #[arg(long)]
        client_ip: Option<IpAddr>,

        #[arg(long, default_value = "")]
        client_name: String,

        /// Client tags for $ctag rules
        #[arg(long)]
        ctag: Vec<String>,

        /// Record type (A, AAAA, ...)
        #[arg(long, default_value = "A")]
        dns_type: String,
    },

    /// Build both engines and print rule statistics
    Stats {
        #[command(flatten)]
        lists: ListArgs,
    },
}

// =============================================================================
// Output
// =============================================================================

#[derive(Serialize)]
struct RuleOutput {
    text: String,
    list_id: u32,
}

impl From<&Arc<NetworkRule>> for RuleOutput {
    fn from(rule: &Arc<NetworkRule>) -> Self {
        Self {
            text: rule.text().to_string(),
            list_id: rule.list_id(),
        }
    }
}

#[derive(Serialize)]
struct HostRuleOutput {
    text: String,
    list_id: u32,
    ip: IpAddr,
}

impl From<&Arc<HostRule>> for HostRuleOutput {
    fn from(rule: &Arc<HostRule>) -> Self {
        Self {
            text: rule.text().to_string(),
            list_id: rule.list_id(),
            ip: rule.ip(),
        }
    }
}

#[derive(Serialize)]
struct CosmeticOutput {
    generic_css: bool,
    css: bool,
    js: bool,
}

#[derive(Serialize)]
struct MatchOutput {
    url: String,
    verdict: &'static str,
    rule: Option<RuleOutput>,
    basic_rule: Option<RuleOutput>,
    document_rule: Option<RuleOutput>,
    cosmetic: CosmeticOutput,
}

#[derive(Serialize)]
struct DnsOutput {
    hostname: String,
    matched: bool,
    network_rule: Option<RuleOutput>,
    host_rules_v4: Vec<HostRuleOutput>,
    host_rules_v6: Vec<HostRuleOutput>,
    network_rules: Vec<RuleOutput>,
}

#[derive(Serialize)]
struct StatsOutput {
    lists: usize,
    network_rules: usize,
    host_rules: usize,
    cosmetic_rules: usize,
    network_engine_rules: usize,
    tables: Vec<TableOutput>,
    dns_engine_rules: usize,
    build_ms: f64,
}

#[derive(Serialize)]
struct TableOutput {
    name: &'static str,
    rules: usize,
}

// =============================================================================
// Commands
// =============================================================================

fn main() {
    Builder::from_env(Env::default().default_filter_or("warn"))
        .target(Target::Stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Match {
            lists,
            url,
            source_url,
            request_type,
        } => cmd_match(&lists, &url, &source_url, &request_type),
        Commands::Dns {
            lists,
            host,
            client_ip,
            client_name,
            ctag,
            dns_type,
        } => cmd_dns(&lists, host, client_ip, client_name, ctag, &dns_type),
        Commands::Stats { lists } => cmd_stats(&lists),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_storage(args: &ListArgs) -> Result<Arc<RuleStorage>, String> {
    let configs: Vec<FileConfig> = match &args.config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
            serde_json::from_str(&content)
                .map_err(|e| format!("Invalid list config '{}': {}", path.display(), e))?
        }
        None => args
            .list
            .iter()
            .zip(1..)
            .map(|(path, id)| FileConfig {
                id,
                path: path.clone(),
                ignore_cosmetic: false,
            })
            .collect(),
    };

    if configs.is_empty() {
        return Err("No rule lists specified".to_string());
    }

    let mut lists: Vec<Box<dyn RuleList>> = Vec::with_capacity(configs.len());
    for config in configs {
        let path = config.path.display().to_string();
        let list = FileRuleList::new(config)
            .map_err(|e| format!("Failed to open '{}': {}", path, e))?;
        lists.push(Box::new(list));
    }

    let storage = RuleStorage::new(lists).map_err(|e| e.to_string())?;
    log::info!("Loaded {} rule lists", storage.list_count());
    Ok(Arc::new(storage))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn cmd_match(
    lists: &ListArgs,
    url: &str,
    source_url: &str,
    request_type: &str,
) -> Result<(), String> {
    let request_type = RequestType::from_modifier(request_type)
        .ok_or_else(|| format!("Unknown request type '{}'", request_type))?;

    let storage = load_storage(lists)?;
    let engine = Engine::new(storage).map_err(|e| e.to_string())?;

    let req = Request::new(url, source_url, request_type);
    let result = engine.match_request(&req);
    let rule = result.basic_result();

    let verdict = match rule {
        Some(r) if r.is_allowlist() => "allow",
        Some(_) => "block",
        None => "none",
    };
    let cosmetic = result.cosmetic_option();

    print_json(&MatchOutput {
        url: url.to_string(),
        verdict,
        rule: rule.map(RuleOutput::from),
        basic_rule: result.basic_rule.as_ref().map(RuleOutput::from),
        document_rule: result.document_rule.as_ref().map(RuleOutput::from),
        cosmetic: CosmeticOutput {
            generic_css: cosmetic.contains(CosmeticOption::GENERIC_CSS),
            css: cosmetic.contains(CosmeticOption::CSS),
            js: cosmetic.contains(CosmeticOption::JS),
        },
    })
}

fn cmd_dns(
    lists: &ListArgs,
    host: String,
    client_ip: Option<IpAddr>,
    client_name: String,
    mut ctags: Vec<String>,
    dns_type: &str,
) -> Result<(), String> {
    let dns_type =
        RrType::from_name(dns_type).ok_or_else(|| format!("Unknown DNS type '{}'", dns_type))?;

    let storage = load_storage(lists)?;
    let engine = DnsEngine::new(storage).map_err(|e| e.to_string())?;

    ctags.sort();
    let req = DnsRequest {
        client_ip,
        client_name,
        hostname: host,
        sorted_client_tags: ctags,
        dns_type,
        answer: false,
    };
    let (res, matched) = engine.match_request(&req);

    print_json(&DnsOutput {
        hostname: req.hostname,
        matched,
        network_rule: res.network_rule.as_ref().map(RuleOutput::from),
        host_rules_v4: res.host_rules_v4.iter().map(HostRuleOutput::from).collect(),
        host_rules_v6: res.host_rules_v6.iter().map(HostRuleOutput::from).collect(),
        network_rules: res.network_rules.iter().map(RuleOutput::from).collect(),
    })
}

fn cmd_stats(lists: &ListArgs) -> Result<(), String> {
    let storage = load_storage(lists)?;

    let (mut network_rules, mut host_rules, mut cosmetic_rules) = (0, 0, 0);
    let mut scanner = storage.scan().map_err(|e| e.to_string())?;
    for (rule, _) in scanner.by_ref() {
        match rule {
            Rule::Network(_) => network_rules += 1,
            Rule::Host(_) => host_rules += 1,
            Rule::Cosmetic(_) => cosmetic_rules += 1,
        }
    }
    if let Some(e) = scanner.take_error() {
        return Err(e.to_string());
    }

    let start = Instant::now();
    let engine = Engine::new(Arc::clone(&storage)).map_err(|e| e.to_string())?;
    let dns_engine = DnsEngine::new(Arc::clone(&storage)).map_err(|e| e.to_string())?;
    let build_ms = start.elapsed().as_secs_f64() * 1000.0;

    let network_engine = engine.network_engine();
    print_json(&StatsOutput {
        lists: storage.list_count(),
        network_rules,
        host_rules,
        cosmetic_rules,
        network_engine_rules: network_engine.rules_count(),
        tables: network_engine
            .table_stats()
            .into_iter()
            .map(|(name, rules)| TableOutput { name, rules })
            .collect(),
        dns_engine_rules: dns_engine.rules_count(),
        build_ms,
    })
}
