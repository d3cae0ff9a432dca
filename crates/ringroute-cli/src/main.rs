//! # ringroute CLI Entry Point
//!
//! Main binary for the ringroute request router. Provides a command-line
//! interface for starting the router, starting backend application servers,
//! and sending balance calls.
//!
//! ## Usage
//!
//! ```bash
//! # Start two backends
//! ringroute backend -b 127.0.0.1:9001
//! ringroute backend -b 127.0.0.1:9002
//!
//! # Start the router on port 8080
//! ringroute router -c etc/router.json -p 8080
//!
//! # Send one balance call (outputs raw JSON)
//! ringroute call http://127.0.0.1:8080
//! ```
//!
//! ## URL Format
//!
//! Router URLs must include the `http://` or `https://` prefix:
//! - ✅ `http://127.0.0.1:8080`
//! - ❌ `127.0.0.1:8080`

use anyhow::Result;
use argh::FromArgs;
use std::net::SocketAddr;

/// Validates that a URL string starts with http:// or https://
///
/// # Arguments
///
/// * `url` - The URL string to validate
/// * `description` - Human-readable description of what the URL is for (e.g., "router address")
///
/// # Returns
///
/// `Ok(())` if the URL is valid, `Err` otherwise
///
/// # Errors
///
/// Returns an error if the URL doesn't start with http:// or https://
fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Invalid {}: '{}' must start with http:// or https://",
            description,
            url
        ))
    }
}

/// Parses a port candidate into an integer in 0-65535.
///
/// Only the first whitespace-separated token is considered, so a line read
/// from stdin can carry trailing garbage without failing validation.
///
/// # Returns
///
/// `Some(port)` when the token is a valid port number, `None` otherwise.
fn parse_port(input: &str) -> Option<u16> {
    let token = input.split_whitespace().next()?;
    token.parse().ok()
}

/// Resolves the router's listening port from the `--port` argument.
///
/// A missing or invalid argument drops into an interactive prompt loop on
/// stdin: the process asks again until it receives an integer in 0-65535
/// instead of exiting.
///
/// # Errors
///
/// Returns an error when stdin is closed before a valid port number was
/// entered, or when reading from stdin fails.
fn resolve_port(arg: Option<&str>) -> Result<u16> {
    if let Some(raw) = arg {
        if let Some(port) = parse_port(raw) {
            return Ok(port);
        }
        tracing::warn!("Invalid port argument: {}", raw);
    }

    let mut line = String::new();
    loop {
        tracing::info!("Please give one valid port number");
        line.clear();
        if std::io::stdin().read_line(&mut line)? == 0 {
            anyhow::bail!("stdin closed before a valid port number was given");
        }
        if let Some(port) = parse_port(&line) {
            return Ok(port);
        }
    }
}

/// Main CLI structure parsed from command-line arguments.
///
/// Uses `argh` for declarative argument parsing. The top-level command
/// dispatches to one of the three subcommands: router, backend, or call.
#[derive(FromArgs)]
/// ringroute - consistent-hash request router
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
///
/// Each variant represents a distinct operational mode:
///
/// - **Router**: Start the consistent-hash request router
/// - **Backend**: Start a backend application server
/// - **Call**: Send a single balance call (unix-friendly JSON output)
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Router(RouterArgs),
    Backend(BackendArgs),
    Call(CallArgs),
}

/// Arguments for starting the ringroute router.
///
/// The router loads its backend fleet from a JSON configuration file, builds
/// the hash ring and the connection pool once, and then serves `balance`
/// calls over JSON-RPC on the resolved port.
///
/// # Example
///
/// ```bash
/// ringroute router -c etc/router.json -p 8080
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "router")]
/// start the request router
struct RouterArgs {
    /// path to the backend configuration file
    ///
    /// A JSON document with a `backends` array of `{address, port}` objects.
    /// The file is read once at startup; an unreadable file or an empty
    /// backend list is a fatal error.
    #[argh(option, short = 'c', default = "\"etc/router.json\".into()")]
    config: String,

    /// host to bind the router's HTTP server to
    ///
    /// Defaults to "0.0.0.0" for accessibility from other machines.
    #[argh(option, default = "\"0.0.0.0\".into()")]
    host: String,

    /// port to listen on
    ///
    /// When absent or not a valid integer in 0-65535, the router prompts on
    /// stdin until it gets one.
    #[argh(option, short = 'p')]
    port: Option<String>,
}

/// Arguments for starting a backend application server.
///
/// Backends answer the `handle_request` calls the router forwards to them.
/// The bind address doubles as the backend's identity, so it should match
/// an `{address, port}` entry in the router's configuration file.
///
/// # Example
///
/// ```bash
/// ringroute backend -b 127.0.0.1:9001
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "backend")]
/// start a backend application server
struct BackendArgs {
    /// address to bind the backend's HTTP server to
    ///
    /// Defaults to "0.0.0.0:9001". The same string is reported back in every
    /// response as the serving backend's identity.
    #[argh(option, short = 'b', default = "\"0.0.0.0:9001\".into()")]
    bind: String,
}

/// Arguments for sending a single balance call.
///
/// The `call` command builds one request with a fresh UUID, sends it to the
/// router, and outputs the response as raw JSON to stdout. This makes it
/// suitable for scripting and integration with other tools (e.g., `jq`).
///
/// # Output Format
///
/// Outputs raw JSON (no pretty-printing) to stdout. Errors are reported
/// to stderr with non-zero exit code. A response with `forwarded: false`
/// is still a successful call; it means the router exhausted its failover
/// attempts.
///
/// # Examples
///
/// ```bash
/// # One balance call against a local router
/// ringroute call http://127.0.0.1:8080
///
/// # Pipe output to jq for processing
/// ringroute call http://127.0.0.1:8080 | jq '.msg'
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// send one balance call to a router
struct CallArgs {
    /// address of the router to call
    ///
    /// Must include the http:// or https:// prefix (e.g., http://127.0.0.1:8080).
    #[argh(positional)]
    router_url: String,

    /// client address stamped into the request
    ///
    /// Together with the generated request id this decides which backend the
    /// router picks. Defaults to "127.0.0.1".
    #[argh(option, default = "\"127.0.0.1\".into()")]
    address: String,

    /// request timeout in seconds
    ///
    /// Covers the whole balance call including the router's own failover
    /// attempts. Defaults to 60 seconds.
    #[argh(option, short = 't', long = "timeout", default = "60")]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Initialize tracing only for non-call commands
    // - call: keep output clean for unix tool usage (piping to jq, etc.)
    if !matches!(cli.command, Commands::Call(_)) {
        // Set default log level to INFO, but allow RUST_LOG env var to override
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .init();
    }

    match cli.command {
        Commands::Router(args) => {
            tracing::info!("Starting ringroute router");
            tracing::info!("Backend configuration: {}", args.config);

            let registry = ringroute_router::RouterConfig::load(&args.config)?.into_registry()?;
            tracing::info!("Configured backends: {:?}", registry.identities());

            let port = resolve_port(args.port.as_deref())?;

            let balancer = ringroute_router::Balancer::new(&registry)?;
            let server = ringroute_router::HttpServer::new(std::sync::Arc::new(balancer));

            let bind = format!("{}:{}", args.host, port);
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid bind address {}: {}", bind, e))?;
            server.run(addr).await?;

            Ok(())
        }
        Commands::Backend(args) => {
            tracing::info!("Starting ringroute backend");
            tracing::info!("Binding to: {}", args.bind);

            let addr: SocketAddr = args
                .bind
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid bind address {}: {}", args.bind, e))?;

            let app = std::sync::Arc::new(ringroute_backend::AppServer::new(args.bind));
            let server = ringroute_backend::HttpServer::new(app);
            server.run(addr).await?;

            Ok(())
        }
        Commands::Call(args) => run_call(args).await,
    }
}

/// Executes the `call` subcommand.
///
/// This function:
/// 1. Creates a client bound to the router
/// 2. Sends one balance call with a fresh request id
/// 3. Outputs the raw JSON response to stdout
///
/// No tracing/logging is initialized for this command to keep output clean
/// for unix tool usage (piping to jq, etc.).
///
/// # Errors
///
/// Returns an error if:
/// - The router URL is missing its http:// or https:// prefix
/// - The connection to the router fails
/// - The router's response cannot be decoded
async fn run_call(args: CallArgs) -> Result<()> {
    validate_http_url(&args.router_url, "router address")?;

    let client = ringroute_client::RouterClient::new(args.router_url)
        .with_address(args.address)
        .with_timeout(std::time::Duration::from_secs(args.timeout_secs));

    let response = client.balance().await?;

    // Output raw JSON to stdout
    println!("{}", serde_json::to_string(&response)?);

    Ok(())
}

/// CLI argument parsing tests.
///
/// Tests verify that `argh` correctly parses all subcommands and their
/// arguments, and that port validation accepts exactly the integers a TCP
/// port can take. Each parse test simulates command-line invocation and
/// validates the resulting structure.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_router_defaults() {
        let args: Cli = Cli::from_args(&["ringroute"], &["router"]).unwrap();
        match args.command {
            Commands::Router(RouterArgs { config, host, port }) => {
                assert_eq!(config, "etc/router.json"); // default
                assert_eq!(host, "0.0.0.0"); // default
                assert!(port.is_none());
            }
            _ => panic!("Expected Router command"),
        }
    }

    #[test]
    fn test_cli_parse_router_with_port() {
        let args: Cli = Cli::from_args(
            &["ringroute"],
            &["router", "-c", "custom.json", "-p", "8080"],
        )
        .unwrap();
        match args.command {
            Commands::Router(RouterArgs { config, host, port }) => {
                assert_eq!(config, "custom.json");
                assert_eq!(host, "0.0.0.0"); // default
                assert_eq!(port, Some("8080".to_string()));
            }
            _ => panic!("Expected Router command"),
        }
    }

    #[test]
    fn test_cli_parse_router_custom_host() {
        let args: Cli = Cli::from_args(
            &["ringroute"],
            &["router", "--host", "127.0.0.1", "--port", "9000"],
        )
        .unwrap();
        match args.command {
            Commands::Router(RouterArgs { host, port, .. }) => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, Some("9000".to_string()));
            }
            _ => panic!("Expected Router command"),
        }
    }

    #[test]
    fn test_cli_parse_backend_defaults() {
        let args: Cli = Cli::from_args(&["ringroute"], &["backend"]).unwrap();
        match args.command {
            Commands::Backend(BackendArgs { bind }) => {
                assert_eq!(bind, "0.0.0.0:9001"); // default
            }
            _ => panic!("Expected Backend command"),
        }
    }

    #[test]
    fn test_cli_parse_backend_custom_bind() {
        let args: Cli = Cli::from_args(&["ringroute"], &["backend", "-b", "127.0.0.1:9005"]).unwrap();
        match args.command {
            Commands::Backend(BackendArgs { bind }) => {
                assert_eq!(bind, "127.0.0.1:9005");
            }
            _ => panic!("Expected Backend command"),
        }
    }

    #[test]
    fn test_cli_parse_call() {
        let args: Cli = Cli::from_args(&["ringroute"], &["call", "http://127.0.0.1:8080"]).unwrap();
        match args.command {
            Commands::Call(CallArgs {
                router_url,
                address,
                timeout_secs,
            }) => {
                assert_eq!(router_url, "http://127.0.0.1:8080");
                assert_eq!(address, "127.0.0.1"); // default
                assert_eq!(timeout_secs, 60); // default
            }
            _ => panic!("Expected Call command"),
        }
    }

    #[test]
    fn test_cli_parse_call_with_flags() {
        let args: Cli = Cli::from_args(
            &["ringroute"],
            &[
                "call",
                "http://127.0.0.1:8080",
                "--address",
                "10.0.0.7",
                "--timeout",
                "5",
            ],
        )
        .unwrap();
        match args.command {
            Commands::Call(CallArgs {
                router_url,
                address,
                timeout_secs,
            }) => {
                assert_eq!(router_url, "http://127.0.0.1:8080");
                assert_eq!(address, "10.0.0.7");
                assert_eq!(timeout_secs, 5);
            }
            _ => panic!("Expected Call command"),
        }
    }

    #[test]
    fn test_validate_http_url_accepts_both_schemes() {
        assert!(validate_http_url("http://127.0.0.1:8080", "router address").is_ok());
        assert!(validate_http_url("https://example.com:8080", "router address").is_ok());
    }

    #[test]
    fn test_validate_http_url_rejects_bare_host() {
        assert!(validate_http_url("127.0.0.1:8080", "router address").is_err());
    }

    #[test]
    fn test_parse_port_accepts_full_range() {
        assert_eq!(parse_port("0"), Some(0));
        assert_eq!(parse_port("8080"), Some(8080));
        assert_eq!(parse_port("65535"), Some(65535));
    }

    #[test]
    fn test_parse_port_rejects_out_of_range() {
        assert_eq!(parse_port("65536"), None);
        assert_eq!(parse_port("-1"), None);
    }

    #[test]
    fn test_parse_port_rejects_garbage() {
        assert_eq!(parse_port("abc"), None);
        assert_eq!(parse_port(""), None);
        assert_eq!(parse_port("   "), None);
    }

    #[test]
    fn test_parse_port_takes_first_token() {
        assert_eq!(parse_port("8080 whatever follows"), Some(8080));
        assert_eq!(parse_port("  9001\n"), Some(9001));
    }

    #[test]
    fn test_resolve_port_uses_valid_argument() {
        // A valid argument never touches stdin.
        assert_eq!(resolve_port(Some("9100")).unwrap(), 9100);
    }
}
