//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use lumo_core::config::{self, Config};
use lumo_core::core::interrupt;
use lumo_core::logging;
use lumo_types::{ConversationId, MessageId};

mod commands;

#[derive(Parser)]
#[command(name = "lumo")]
#[command(version)]
#[command(about = "Terminal client for a streaming chat backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend base URL (overrides config)
    #[arg(long, global = true, env = "LUMO_BASE_URL", value_name = "URL")]
    base_url: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in and store the token
    Login {
        #[arg(short, long)]
        username: String,
        /// Read from LUMO_PASSWORD when omitted
        #[arg(short, long, env = "LUMO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and store the token
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "LUMO_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Forget the stored token
    Logout,
    /// Manage conversations
    Conversations {
        #[command(subcommand)]
        command: ConversationCommands,
    },
    /// Print one page of a conversation's history
    History {
        #[arg(value_name = "CONVERSATION_ID")]
        conversation: ConversationId,
        /// Page number, 1 is the newest
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Messages per page (defaults to config)
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Manage messages
    Messages {
        #[command(subcommand)]
        command: MessageCommands,
    },
    /// Send one message and stream the reply to stdout
    Ask {
        #[arg(value_name = "CONVERSATION_ID")]
        conversation: ConversationId,
        /// The message to send
        #[arg(short, long)]
        prompt: String,
        /// Ask for a reasoning trace (overrides config)
        #[arg(short, long)]
        reasoning: bool,
    },
    /// Open the full-screen chat
    Chat {
        #[arg(value_name = "CONVERSATION_ID")]
        conversation: Option<ConversationId>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConversationCommands {
    /// List conversations, newest first
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Create a conversation
    New {
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Delete a conversation
    Delete {
        #[arg(value_name = "CONVERSATION_ID")]
        id: ConversationId,
    },
}

#[derive(clap::Subcommand)]
enum MessageCommands {
    /// Delete a message
    Delete {
        #[arg(value_name = "MESSAGE_ID")]
        id: MessageId,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    interrupt::init()?;

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli { command, base_url } = cli;

    // Config commands must work even when the file is broken.
    if let Some(Commands::Config { command }) = &command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        };
    }

    let mut config = Config::load().context("load config")?;
    if let Some(url) = base_url {
        config.base_url = url;
    }
    let _log_guard = logging::init(&config, &config::paths::logs_dir())?;

    let Some(command) = command else {
        return commands::chat::run(&config, None).await;
    };

    match command {
        Commands::Login { username, password } => {
            commands::auth::login(&config, &username, &password).await
        }
        Commands::Register {
            username,
            password,
            email,
        } => commands::auth::register(&config, &username, &password, email.as_deref()).await,
        Commands::Logout => commands::auth::logout(),

        Commands::Conversations { command } => match command {
            ConversationCommands::List { page, page_size } => {
                commands::conversations::list(&config, page, page_size).await
            }
            ConversationCommands::New { title } => {
                commands::conversations::create(&config, title.as_deref()).await
            }
            ConversationCommands::Delete { id } => {
                commands::conversations::delete(&config, id).await
            }
        },

        Commands::History {
            conversation,
            page,
            page_size,
        } => commands::history::show(&config, conversation, page, page_size).await,

        Commands::Messages { command } => match command {
            MessageCommands::Delete { id } => commands::messages::delete(&config, id).await,
        },

        Commands::Ask {
            conversation,
            prompt,
            reasoning,
        } => {
            if reasoning {
                config.reasoning_mode = true;
            }
            commands::ask::run(&config, conversation, &prompt).await
        }

        Commands::Chat { conversation } => commands::chat::run(&config, conversation).await,

        Commands::Config { .. } => Ok(()),
    }
}
