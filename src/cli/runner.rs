//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::client::K2Client;
use crate::config::ExtractorConfig;
use crate::engine::ExtractionEngine;
use crate::error::{Error, Result};
use crate::output::ParquetSink;
use crate::state::StateManager;
use chrono::{Local, NaiveDateTime};
use serde_json::{json, Value};
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command, printing its result as JSON
    pub async fn run(&self) -> Result<()> {
        let output = self.execute().await?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    /// Run the CLI command and return its result
    pub async fn execute(&self) -> Result<Value> {
        let config = self.load_config()?;
        let state = self.load_state()?;
        let now = Local::now().naive_local();

        match self.cli.command {
            Commands::Run => self.extract(&config, state, now).await,
            Commands::Resolve => self.resolve(&config, state, now).await,
            Commands::Validate => self.validate(&config, &state, now).await,
        }
    }

    /// Load and validate configuration
    fn load_config(&self) -> Result<ExtractorConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Configuration file not specified (use -C flag)"))?;
        let config = ExtractorConfig::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load state
    fn load_state(&self) -> Result<StateManager> {
        match &self.cli.state {
            Some(path) => StateManager::from_file(path),
            None => Ok(StateManager::in_memory()),
        }
    }

    /// Extract into Parquet tables
    async fn extract(
        &self,
        config: &ExtractorConfig,
        state: StateManager,
        now: NaiveDateTime,
    ) -> Result<Value> {
        let last_run = state.snapshot().await.last_run;
        let job = config.job(last_run.as_deref(), now)?;
        let client = K2Client::new(&config.client_config())?;
        let engine = ExtractionEngine::new(&client, &client, state);
        let mut sink = ParquetSink::new(&self.cli.output);

        info!(
            class = %job.class_name,
            output = %self.cli.output.display(),
            "Running extraction"
        );
        let stats = engine.run(&job, &mut sink).await?;

        Ok(json!({
            "type": "STATS",
            "stats": stats,
            "files": sink.written_files(),
        }))
    }

    /// Print the routing table
    async fn resolve(
        &self,
        config: &ExtractorConfig,
        state: StateManager,
        now: NaiveDateTime,
    ) -> Result<Value> {
        let last_run = state.snapshot().await.last_run;
        let job = config.job(last_run.as_deref(), now)?;
        let client = K2Client::new(&config.client_config())?;
        let engine = ExtractionEngine::new(&client, &client, state);
        let plan = engine.plan(&job).await?;

        Ok(json!({
            "type": "PLAN",
            "root": plan.root_class,
            "tables": plan.tables,
        }))
    }

    /// Validate configuration and report the effective condition
    async fn validate(
        &self,
        config: &ExtractorConfig,
        state: &StateManager,
        now: NaiveDateTime,
    ) -> Result<Value> {
        let last_run = state.snapshot().await.last_run;
        let conditions = config.effective_conditions(last_run.as_deref(), now)?;

        Ok(json!({
            "type": "VALID",
            "data_object": config.data_object,
            "fields": config.field_list(),
            "load_type": config.loading_options.load_type,
            "conditions": conditions,
        }))
    }
}
