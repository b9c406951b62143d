//! `escalations` command: list decision points awaiting operator review.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use uuid::Uuid;

use crate::cli::output::{list_table, output, truncate, CommandOutput};
use crate::domain::models::EscalationRecord;

#[derive(Args, Debug)]
pub struct EscalationsArgs {
    /// Only escalations for this loop
    #[arg(long)]
    pub loop_id: Option<Uuid>,

    /// Maximum entries to show
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct EscalationsOutput {
    pub escalations: Vec<EscalationRecord>,
    pub total: usize,
}

impl CommandOutput for EscalationsOutput {
    fn to_human(&self) -> String {
        if self.escalations.is_empty() {
            return "No escalations recorded.".to_string();
        }

        let mut table = list_table(&["when", "loop", "decision point", "reason", "rejected"]);
        for escalation in &self.escalations {
            table.add_row(vec![
                escalation.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                escalation.loop_id.to_string(),
                truncate(&escalation.decision_point, 24),
                truncate(&escalation.escalation_reason, 48),
                escalation.rejected_plan_ids.len().to_string(),
            ]);
        }
        format!("{} escalation(s):\n{table}", self.total)
    }
}

pub async fn execute(args: EscalationsArgs, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;
    let governor = super::build_governor(&config).await?;

    let escalations = match args.loop_id {
        Some(loop_id) => governor.escalations_for_loop(loop_id, Some(args.limit)).await?,
        None => governor.all_escalations(Some(args.limit)).await?,
    };
    let result = EscalationsOutput {
        total: escalations.len(),
        escalations,
    };

    output(&result, json);
    Ok(())
}
