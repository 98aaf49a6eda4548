// Copyright 2026 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod completion;
mod config;
mod conversation;
mod knowledge;
mod logging;
mod orchestrator;
mod session;
mod storage;
mod transcript;
mod web;

use cli::{Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let cli = Cli::parse();

    // The server also keeps a rotated JSON log next to the data
    match cli.command {
        Commands::Serve { .. } => logging::init_server_logging(&storage::get_log_dir()?)?,
        _ => logging::init_cli_logging(),
    }

    // Load configuration
    let mut config = Config::load()?;
    if let Some(data) = cli.data {
        config.storage.data_path = data;
    }

    // Execute the command
    if let Err(e) = commands::execute(&config, cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
