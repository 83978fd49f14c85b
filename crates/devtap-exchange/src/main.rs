//! devtap demo: a small in-memory GraphQL client instrumented by the
//! devtools exchange.
//!
//! Start an inspector listening on `ws://localhost:7700` (or point
//! `--endpoint` somewhere else), then run this binary.  Every few hundred
//! milliseconds it issues one of a handful of sample queries and mutations;
//! each operation and result is reported to the inspector, which can also
//! send its own queries back for execution.
//!
//! # Usage
//!
//! ```text
//! devtap-demo [OPTIONS]
//!
//! Options:
//!   --config <PATH>        TOML config file
//!   --endpoint <URL>       Inspector WebSocket URL
//!   --interval-ms <MS>     Delay between sample operations [default: 1000]
//!   --disabled             Run without instrumentation
//! ```
//!
//! Instrumentation follows the usual config precedence, so in release builds
//! it stays off unless a config file or `DEVTAP_DISABLED=0` turns it on.
//!
//! Ctrl+C sends `disconnect` to the inspector and exits.
//!
//! # Architecture overview
//!
//! ```text
//! main()
//!  └─ load_config()            -- defaults < TOML < DEVTAP_* < CLI flags
//!  └─ devtools_exchange()      -- picks the native socket messenger
//!  └─ MemoryClient::start()    -- devtools tap → fetch stage
//!  └─ sample traffic loop      -- until Ctrl+C
//! ```

#[cfg(not(target_arch = "wasm32"))]
mod app {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Context;
    use clap::Parser;
    use futures_util::StreamExt;
    use serde_json::json;
    use tracing::{info, warn};
    use tracing_subscriber::EnvFilter;

    use devtap_core::{CombinedError, Operation, OperationKind, OperationResult};
    use devtap_exchange::infrastructure::memory_client::{MemoryClient, Responder};
    use devtap_exchange::{devtools_exchange, load_config, Client, ExchangeConfig};

    const CLIENT_URL: &str = "http://localhost:4000/graphql";

    /// Sample traffic: (kind, query, issuing component).
    const SAMPLES: &[(OperationKind, &str, &str)] = &[
        (OperationKind::Query, "query Todos { todos { id text done } }", "TodoList"),
        (
            OperationKind::Mutation,
            "mutation AddTodo { addTodo(text: \"write docs\") { id } }",
            "NewTodoForm",
        ),
        (OperationKind::Query, "query Me { me { id name } }", "Header"),
        (OperationKind::Query, "query Broken { doesNotExist }", "Debug"),
    ];

    /// devtap demo client.
    #[derive(Debug, Parser)]
    #[command(
        name = "devtap-demo",
        about = "Runs an in-memory GraphQL client instrumented by the devtools exchange",
        version
    )]
    pub struct Cli {
        /// TOML config file.  Defaults and `DEVTAP_*` variables apply when absent.
        #[arg(long)]
        pub config: Option<PathBuf>,

        /// Inspector WebSocket URL (overrides config and environment).
        #[arg(long)]
        pub endpoint: Option<String>,

        /// Delay between sample operations, in milliseconds.
        #[arg(long, default_value_t = 1000, env = "DEVTAP_DEMO_INTERVAL_MS")]
        pub interval_ms: u64,

        /// Run with instrumentation turned off.
        #[arg(long)]
        pub disabled: bool,
    }

    impl Cli {
        /// Resolves the effective exchange configuration.
        pub fn exchange_config(&self) -> anyhow::Result<ExchangeConfig> {
            let config = load_config(self.config.as_deref()).with_context(|| {
                format!(
                    "could not load config from {}",
                    self.config
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default()
                )
            })?;
            Ok(self.apply_flags(config))
        }

        /// Layers the command-line flags over `config`.  Flags that were not
        /// given leave the loaded values alone.
        pub fn apply_flags(&self, mut config: ExchangeConfig) -> ExchangeConfig {
            if let Some(endpoint) = &self.endpoint {
                config.endpoint = endpoint.clone();
            }
            if self.disabled {
                config.enabled = false;
            }
            config
        }
    }

    /// Canned server behaviour for the sample client.
    fn responder() -> Responder {
        Arc::new(|op: &Operation| {
            if op.query.contains("doesNotExist") {
                return OperationResult::failure(
                    op.clone(),
                    CombinedError::graphql(vec![json!({
                        "message": "Cannot query field \"doesNotExist\" on type \"Query\".",
                        "locations": [{ "line": 1, "column": 16 }]
                    })]),
                );
            }
            let data = match op.kind {
                OperationKind::Mutation => json!({ "addTodo": { "id": "3" } }),
                _ if op.query.contains("me") => json!({ "me": { "id": "1", "name": "Ada" } }),
                _ => json!({
                    "todos": [
                        { "id": "1", "text": "try the inspector", "done": true },
                        { "id": "2", "text": "send a query back", "done": false }
                    ]
                }),
            };
            OperationResult::success(op.clone(), data)
        })
    }

    pub async fn run(cli: Cli) -> anyhow::Result<()> {
        let config = cli.exchange_config()?;
        info!(
            "devtap demo starting: instrumentation={}, endpoint={}",
            config.enabled, config.endpoint
        );

        let client = MemoryClient::new(CLIENT_URL, responder());
        let exchange = devtools_exchange(&config);
        let handle = exchange.handle();
        client.start(exchange.install(Arc::clone(&client), client.fetch_exchange()));

        let mut ticker = tokio::time::interval(Duration::from_millis(cli.interval_ms.max(1)));
        let mut samples = SAMPLES.iter().cycle();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(&(kind, query, source)) = samples.next() else {
                        break;
                    };
                    let mut results = client.issue(kind, query, source);
                    tokio::spawn(async move {
                        if let Some(result) = results.next().await {
                            match &result.error {
                                Some(e) => warn!("{} failed: {e}", result.operation.key),
                                None => info!("{} settled", result.operation.key),
                            }
                        }
                    });
                }
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        tracing::error!("failed to listen for Ctrl+C signal: {e}");
                    }
                    info!("received Ctrl+C; disconnecting from {}", client.url());
                    break;
                }
            }
        }

        handle.disconnect();
        // Give the socket writer a moment to flush the disconnect frame.
        tokio::time::sleep(Duration::from_millis(100)).await;
        info!("devtap demo stopped");
        Ok(())
    }

    pub fn init_logging() {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    app::init_logging();
    app::run(app::Cli::parse()).await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
