mod chat;

use clap::Subcommand;

pub use chat::{response_footer, settings_line, status_text, ChatRepl, Flow, ReplCommand, TerminalObserver};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const PUBLIC_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay server
    Serve {
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,

        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Bind to 0.0.0.0 instead of --host, exposing the server on all network interfaces
        #[arg(long)]
        public: bool,

        /// Answer from a local echo instead of calling OpenAI (no API key needed)
        #[arg(long)]
        mock_upstream: bool,
    },

    /// Chat with a running relay server from the terminal
    Chat {
        #[arg(short, long, default_value = crate::connector::DEFAULT_SERVER_URL)]
        server: String,
    },
}

impl Commands {
    /// Address the `serve` command binds to.
    pub fn bind_host(host: &str, public: bool) -> &str {
        if public {
            PUBLIC_HOST
        } else {
            host
        }
    }
}
