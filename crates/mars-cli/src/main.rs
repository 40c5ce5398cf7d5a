// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mars`: the MARS client CLI `client` subcommand. Reads a JSON
//! request file, shuffles a configured list of worker URLs, and executes
//! the request through [`mars_client::Cluster`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mars_client::{Cluster, RequestType, RetryPolicy};
use mars_config::Config;
use mars_core::Request;

#[derive(Parser)]
#[command(name = "mars", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// A MARS client is spawned to execute a request. The request should
    /// be passed as a JSON file.
    Client {
        /// JSON file holding the request to execute.
        #[arg(default_value = "req")]
        request_file: PathBuf,

        /// Target file to store the result.
        #[arg(short = 't', long, default_value = "data.grib")]
        target: PathBuf,

        /// User id of the request.
        #[arg(short = 'u', long, default_value = "anonymous")]
        uid: String,

        /// File which contains the list of URLs of the servers, one per
        /// line.
        #[arg(short = 's', long, default_value = "./server.list")]
        server_list: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new().context("failed to build tokio runtime")?;

    match cli.command {
        Command::Client { request_file, target, uid, server_list } => runtime.block_on(run_client(request_file, target, uid, server_list)),
    }
}

async fn run_client(request_file: PathBuf, target: PathBuf, uid: String, server_list: PathBuf) -> Result<()> {
    let contents = std::fs::read_to_string(&request_file).with_context(|| format!("failed to read request file {}", request_file.display()))?;
    let request: Request = serde_json::from_str(&contents).with_context(|| format!("failed to parse request file {}", request_file.display()))?;

    let urls = if server_list.exists() {
        std::fs::read_to_string(&server_list)
            .with_context(|| format!("failed to read server list {}", server_list.display()))?
            .lines()
            .map(str::to_string)
            .filter(|line| !line.trim().is_empty())
            .collect()
    } else {
        vec!["http://localhost:9000".to_string()]
    };

    let mut environ = HashMap::new();
    environ.insert("uid".to_string(), uid);

    let config = Config::load().context("failed to load configuration")?;
    let http = reqwest::Client::new();
    let cluster = Cluster::new(http, urls, config, RequestType::File, RetryPolicy::default(), Duration::from_secs(60));

    let result = cluster.execute(&request, &environ, &target).await;
    tracing::info!("{}", result.message);
    println!("{}", result.message);

    if result.is_error() {
        anyhow::bail!("request failed: {}", result.message);
    }
    Ok(())
}
