//! `override` command: clear an active freeze by operator decision.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use uuid::Uuid;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::FreezeEvent;

#[derive(Args, Debug)]
pub struct OverrideArgs {
    /// Loop whose freeze should be overridden
    pub loop_id: Uuid,

    /// Operator identity recorded on the freeze event
    #[arg(long)]
    pub actor: String,
}

#[derive(Debug, Serialize)]
pub struct OverrideOutput {
    pub event: FreezeEvent,
}

impl CommandOutput for OverrideOutput {
    fn to_human(&self) -> String {
        format!(
            "Freeze {} on loop {} overridden by {}.\nOriginal reason: {}",
            self.event.event_id,
            self.event.loop_id,
            self.event.resolved_by.as_deref().unwrap_or("unknown"),
            self.event.reason
        )
    }
}

pub async fn execute(args: OverrideArgs, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;
    let governor = super::build_governor(&config).await?;

    let event = governor.override_freeze(args.loop_id, &args.actor).await?;
    output(&OverrideOutput { event }, json);
    Ok(())
}
