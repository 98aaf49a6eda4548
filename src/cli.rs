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

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tubechat")]
#[command(version, author = "Muvon Un Limited <opensource@muvon.io>")]
#[command(about = "Chat with YouTube videos through their transcripts", long_about = None)]
pub struct Cli {
    /// Knowledge document to use instead of the configured one
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the web UI
    Serve {
        /// First port to try
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not open a browser window
        #[arg(long)]
        no_browser: bool,
    },
    /// Manage the videos in the knowledge base
    Video {
        #[command(subcommand)]
        command: VideoCommand,
    },
    /// Ask one question about a stored video
    Ask {
        /// The question
        question: String,

        #[command(flatten)]
        target: ChatTarget,
    },
    /// Interactive chat about a stored video
    Chat {
        #[command(flatten)]
        target: ChatTarget,
    },
    /// Show the configuration file location and effective values
    Config,
}

#[derive(Subcommand, Debug)]
pub enum VideoCommand {
    /// Fetch a video's transcript and store it
    Add {
        /// YouTube URL (watch, shorts or youtu.be)
        url: String,

        /// Skip the summary request
        #[arg(long)]
        no_summary: bool,
    },
    /// List stored videos
    List {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Show one video
    Show {
        /// Position in the list, starting at 1
        number: usize,
    },
    /// Delete one video
    Remove {
        /// Position in the list, starting at 1
        number: usize,

        /// Confirm deletion without prompting
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Which video to talk about and where to send questions
#[derive(Args, Debug)]
pub struct ChatTarget {
    /// Position of the video, starting at 1 (defaults to the first)
    #[arg(short, long)]
    pub video: Option<usize>,

    /// Chat-completion endpoint; empty answers from the transcript
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Model name sent with each request
    #[arg(short, long)]
    pub model: Option<String>,

    /// Wait for the whole answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,
}
