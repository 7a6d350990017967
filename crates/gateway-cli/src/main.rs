//! Demo harness for the zero-trust tool-call gateway.
//!
//! Loads a policy (a built-in demo policy, or a JSON document passed with
//! `--policy`), builds an [`Enforcer`] over a couple of toy tools, and
//! prints either the tool's (possibly redacted) result or the structured
//! denial.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use gateway_core::{GatewayError, Invocation};
use gateway_policy::{Enforcer, FnTool, Policy, TracingAuditSink};
use serde_json::{json, Map, Value};

#[derive(Parser, Debug)]
#[command(name = "gateway-cli", about = "Demo harness for the zero-trust tool-call gateway")]
struct Cli {
    /// JSON policy document. Falls back to a small built-in demo policy.
    #[arg(short, long)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Invoke the built-in `hello` tool.
    Hello {
        /// Name to greet.
        name: String,
        /// Roles claimed by the caller, for RBAC-gated allow rules.
        #[arg(long)]
        role: Vec<String>,
    },
    /// Invoke the built-in `search` tool (an attack-detection target).
    Search {
        /// Search query; flagged if it looks like a SQL-injection attempt.
        query: String,
    },
    /// Print the effective policy as JSON.
    ShowPolicy,
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}

/// The demo policy used when `--policy` is not given: `hello` is open to
/// anyone with the `support` role; `search` is allowed but attack-scanned.
fn demo_policy() -> Policy {
    serde_json::from_value(json!({
        "policy_id": "demo",
        "version": "1",
        "default": "deny",
        "allow_rules": [
            {
                "tool": "hello",
                "roles": ["support", "admin"],
                "constraints": {
                    "name": {"type": "string", "required": true, "pattern": "^[A-Za-z ]+$"}
                }
            },
            {
                "tool": "search",
                "constraints": {
                    "query": {"type": "string", "required": true}
                }
            }
        ],
        "detect_attacks": {
            "enabled": true,
            "on_detect": "deny",
            "fields": ["query"]
        },
        "redact": {
            "enabled": true,
            "pii_emails": true
        }
    }))
    .expect("built-in demo policy is well-formed")
}

fn load_policy(path: Option<&PathBuf>) -> Policy {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("failed to read policy file {}: {e}", path.display());
                std::process::exit(2);
            });
            serde_json::from_str(&text).unwrap_or_else(|e| {
                eprintln!("failed to parse policy file {}: {e}", path.display());
                std::process::exit(2);
            })
        }
        None => demo_policy(),
    }
}

fn hello_tool() -> FnTool<impl Fn(&Map<String, Value>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>> {
    FnTool::named("hello", |args| {
        let name = args.get("name").and_then(Value::as_str).unwrap_or("stranger");
        Ok(json!({"msg": format!("hi {name}")}))
    })
}

fn search_tool() -> FnTool<impl Fn(&Map<String, Value>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>> {
    FnTool::named("search", |args| {
        let query = args.get("query").and_then(Value::as_str).unwrap_or("");
        Ok(json!({"query": query, "results": []}))
    })
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let policy = load_policy(cli.policy.as_ref());

    if matches!(cli.cmd, Command::ShowPolicy) {
        println!("{}", serde_json::to_string_pretty(&policy).expect("policy serializes"));
        return ExitCode::SUCCESS;
    }

    let enforcer = Enforcer::new(policy, TracingAuditSink);

    let outcome = match cli.cmd {
        Command::Hello { name, role } => {
            let mut args = Map::new();
            args.insert("name".to_string(), json!(name));
            enforcer.enforce(Invocation::new("hello").with_arguments(args).with_roles(role), &hello_tool())
        }
        Command::Search { query } => {
            let mut args = Map::new();
            args.insert("query".to_string(), json!(query));
            enforcer.enforce(Invocation::new("search").with_arguments(args), &search_tool())
        }
        Command::ShowPolicy => unreachable!("handled above"),
    };

    match outcome {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result).expect("result serializes"));
            ExitCode::SUCCESS
        }
        Err(GatewayError::Denied(decision)) => {
            eprintln!("denied: {}", decision.reason);
            if let Some(remediation) = &decision.remediation {
                eprintln!("remediation: {remediation}");
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
