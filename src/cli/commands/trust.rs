//! `trust` command: show an agent's trust standing and history.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{list_table, output, truncate, CommandOutput};
use crate::domain::models::{DemotionEvent, TrustEvent, TrustStatus};

#[derive(Args, Debug)]
pub struct TrustArgs {
    /// Agent identifier
    pub agent: String,

    /// Number of history entries to show
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct TrustOutput {
    pub agent: String,
    pub trust_score: f64,
    pub status: TrustStatus,
    pub effective_agent: String,
    pub active_demotion: Option<DemotionEvent>,
    pub history: Vec<TrustEvent>,
}

impl CommandOutput for TrustOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Agent:           {}", self.agent),
            format!("Trust score:     {:.3}", self.trust_score),
            format!("Status:          {}", self.status.as_str()),
            format!("Effective agent: {}", self.effective_agent),
        ];
        match &self.active_demotion {
            Some(demotion) => lines.push(format!(
                "Demotion:        active since {} (fallback: {})",
                demotion.timestamp.format("%Y-%m-%d %H:%M:%S"),
                demotion.fallback_agent
            )),
            None => lines.push("Demotion:        none".to_string()),
        }

        if self.history.is_empty() {
            lines.push("\nNo trust events recorded.".to_string());
        } else {
            let mut table = list_table(&["when", "score", "delta", "status", "reason"]);
            for event in &self.history {
                table.add_row(vec![
                    event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    format!("{:.3}", event.trust_score),
                    format!("{:+.3}", event.delta),
                    event.status.as_str().to_string(),
                    truncate(&event.reason, 48),
                ]);
            }
            lines.push(format!("\n{table}"));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: TrustArgs, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;
    let governor = super::build_governor(&config).await?;

    let result = TrustOutput {
        trust_score: governor.trust_score(&args.agent).await,
        status: governor.trust_status(&args.agent).await,
        effective_agent: governor.effective_agent(&args.agent).await,
        active_demotion: governor.active_demotion(&args.agent).await,
        history: governor.trust_history(&args.agent, args.limit).await?,
        agent: args.agent,
    };

    output(&result, json);
    Ok(())
}
