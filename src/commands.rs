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

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};

use crate::cli::{ChatTarget, Commands, VideoCommand};
use crate::completion::{CompletionClient, EndpointSettings};
use crate::config::Config;
use crate::knowledge::formatting::{
    format_history, format_notice, format_video_details, format_video_list,
};
use crate::orchestrator::Orchestrator;
use crate::session::Session;
use crate::transcript::YoutubeTranscriptSource;
use crate::web::{self, AppState, SessionRegistry};

pub async fn execute(config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Serve { port, no_browser } => serve(config, port, no_browser).await,
        Commands::Video { command } => video(config, command).await,
        Commands::Ask { question, target } => ask(config, &question, target).await,
        Commands::Chat { target } => chat(config, target).await,
        Commands::Config => show_config(config),
    }
}

fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let source = YoutubeTranscriptSource::new(&config.transcript)?;
    let client = CompletionClient::new()?;
    Ok(Orchestrator::new(Arc::new(source), client)
        .with_summaries(config.completion.summarize_on_add))
}

fn open_session(config: &Config) -> Session {
    Session::open(
        config.storage.data_path.clone(),
        EndpointSettings::from(&config.completion),
    )
}

fn print_notices(session: &mut Session) {
    for notice in session.take_notices() {
        println!("{}", format_notice(&notice));
    }
}

/// 1-based position from the command line to a list index
fn position(number: usize, len: usize) -> Result<usize> {
    match number.checked_sub(1) {
        Some(index) if index < len => Ok(index),
        _ => anyhow::bail!("No video at position {} ({} stored)", number, len),
    }
}

async fn serve(config: &Config, port: Option<u16>, no_browser: bool) -> Result<()> {
    let mut server = config.server.clone();
    if let Some(port) = port {
        server.port = port;
    }
    if no_browser {
        server.open_browser = false;
    }

    let state = AppState {
        sessions: Arc::new(SessionRegistry::new(
            config.storage.data_path.clone(),
            EndpointSettings::from(&config.completion),
        )),
        orchestrator: Arc::new(build_orchestrator(config)?),
    };

    web::run(&server, state).await
}

async fn video(config: &Config, command: VideoCommand) -> Result<()> {
    let mut session = open_session(config);
    print_notices(&mut session);

    match command {
        VideoCommand::Add { url, no_summary } => {
            let orchestrator = build_orchestrator(config)?
                .with_summaries(config.completion.summarize_on_add && !no_summary);
            let result = orchestrator.add_video(&mut session, &url).await;
            print_notices(&mut session);
            if result.is_err() {
                anyhow::bail!("Video was not added");
            }
        }
        VideoCommand::List { format } => match format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(session.videos())?),
            _ => print!("{}", format_video_list(session.videos())),
        },
        VideoCommand::Show { number } => {
            let index = position(number, session.videos().len())?;
            print!("{}", format_video_details(number, &session.videos()[index]));
        }
        VideoCommand::Remove { number, yes } => {
            let index = position(number, session.videos().len())?;
            if !yes {
                let title = session.videos()[index].title.clone();
                if !confirm(&format!("Delete '{}'?", title)).await? {
                    println!("Cancelled");
                    return Ok(());
                }
            }
            let orchestrator = build_orchestrator(config)?;
            orchestrator.delete_video(&mut session, index);
            print_notices(&mut session);
        }
    }

    Ok(())
}

async fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut line = String::new();
    BufReader::new(stdin()).read_line(&mut line).await?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

/// Session for ask/chat with the target's overrides applied
fn target_session(config: &Config, target: &ChatTarget) -> Result<Session> {
    let mut session = open_session(config);
    session.update_settings(target.endpoint.clone(), target.model.clone());

    if let Some(number) = target.video {
        let index = position(number, session.videos().len())?;
        session.select_video(index);
    }

    Ok(session)
}

async fn answer(orchestrator: &Orchestrator, session: &mut Session, question: &str) -> bool {
    print!("{} ", "AI Assistant:".blue().bold());
    let _ = std::io::stdout().flush();

    let result = orchestrator
        .ask(session, question, |fragment| {
            print!("{}", fragment);
            let _ = std::io::stdout().flush();
        })
        .await;

    match result {
        Ok(_) => {
            println!();
            true
        }
        Err(_) => {
            println!();
            print_notices(session);
            false
        }
    }
}

async fn ask(config: &Config, question: &str, target: ChatTarget) -> Result<()> {
    let mut session = target_session(config, &target)?;
    print_notices(&mut session);

    let orchestrator = build_orchestrator(config)?.with_streaming(!target.no_stream);
    if !answer(&orchestrator, &mut session, question).await {
        anyhow::bail!("Question was not answered");
    }
    Ok(())
}

async fn chat(config: &Config, target: ChatTarget) -> Result<()> {
    let mut session = target_session(config, &target)?;
    print_notices(&mut session);

    let Some(video) = session.selected_video() else {
        anyhow::bail!("No videos stored. Add one with `tubechat video add <url>`");
    };
    println!("{} {}", "Chatting about:".bold(), video.title);
    if !session.settings().is_configured() {
        println!("{}", "No endpoint configured, answers quote the transcript".yellow());
    }
    println!("{}", "Commands: /history, /clear, /quit".bright_black());

    let orchestrator = build_orchestrator(config)?.with_streaming(!target.no_stream);
    let mut reader = BufReader::new(stdin());

    loop {
        print!("{} ", ">".green().bold());
        std::io::stdout().flush()?;

        let mut line = String::new();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .context("Failed to read from stdin")?;
        if bytes_read == 0 {
            println!();
            break;
        }

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" if session.conversation().is_empty() => println!("Nothing to clear"),
            "/clear" => {
                session.clear_conversation();
                println!("Conversation cleared");
            }
            "/history" => print!("{}", format_history(session.conversation().turns())),
            question => {
                answer(&orchestrator, &mut session, question).await;
            }
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    let path = crate::storage::get_system_config_path()?;
    println!("{} {}", "Config file:".bold(), path.display());
    println!();
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
