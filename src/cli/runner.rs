//! CLI runner - executes commands

use crate::cli::commands::{parse_stream_list, Cli, Commands, OutputFormat};
use crate::config::TapConfig;
use crate::engine::{Message, MessageSink};
use crate::error::{Error, Result, ResultExt};
use crate::state::StateManager;
use crate::tap::Tap;
use std::io::Write;
use std::sync::Arc;
use tracing::info;

/// Writes messages to an output stream, one JSON document each
pub struct JsonLinesSink<W: Write + Send> {
    out: W,
    format: OutputFormat,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Create a sink over `out`
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    /// Consume the sink, returning the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> MessageSink for JsonLinesSink<W> {
    fn emit(&mut self, message: Message) -> Result<()> {
        let line = match self.format {
            OutputFormat::Json => serde_json::to_string(&message)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(&message)?,
        };
        writeln!(self.out, "{line}")?;
        Ok(())
    }
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Discover => self.discover(),
            Commands::Read { streams } => self.read(streams.as_deref()).await,
        }
    }

    /// Load the tap configuration
    fn load_config(&self) -> Result<TapConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use --config)"))?;
        TapConfig::from_file(path)
    }

    /// Load state from `--state`, or start empty in memory
    fn load_state(&self) -> Result<StateManager> {
        match &self.cli.state {
            Some(path) => StateManager::from_file(path),
            None => Ok(StateManager::in_memory()),
        }
    }

    fn discover(&self) -> Result<()> {
        let config = self.load_config()?;
        let tap = Tap::new(&config, Arc::new(StateManager::in_memory()))?;
        let catalog = tap.discover();

        let rendered = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(&catalog)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(&catalog)?,
        };
        println!("{rendered}");
        Ok(())
    }

    async fn read(&self, streams: Option<&str>) -> Result<()> {
        let config = self.load_config()?;
        let state = self.load_state()?;
        let tap = Tap::new(&config, Arc::new(state.clone()))?;

        let selected = streams.map(parse_stream_list);
        let plan = tap.plan(selected.as_deref())?;

        let mut sink = JsonLinesSink::new(std::io::stdout(), self.cli.format);
        let result = tap.sync(&plan, &mut sink).await;
        sink.into_inner().flush().context("Failed to flush stdout")?;

        // Bookmarks earned before a failure are still kept
        state.save().await?;
        if !state.is_in_memory() {
            info!("State written to {}", state.path().display());
        }

        let stats = result?;
        info!(
            "Read {} record(s) across {} partition(s)",
            stats.records_synced, stats.partitions_synced
        );
        Ok(())
    }
}
