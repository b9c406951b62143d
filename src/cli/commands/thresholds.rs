//! `thresholds` command: show the active governance threshold table
//! and configured beliefs.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::{Belief, Threshold};

#[derive(Args, Debug)]
pub struct ThresholdsArgs {}

#[derive(Debug, Serialize)]
pub struct ThresholdsOutput {
    pub thresholds: Vec<Threshold>,
    pub beliefs: Vec<Belief>,
}

impl CommandOutput for ThresholdsOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["parameter", "value", "description"]);
        for threshold in &self.thresholds {
            table.add_row(vec![
                threshold.parameter_name.clone(),
                format!("{}", threshold.value),
                threshold.description.clone(),
            ]);
        }
        let mut out = format!("{} threshold(s):\n{table}", self.thresholds.len());

        if !self.beliefs.is_empty() {
            let mut beliefs = list_table(&["belief", "priority", "description"]);
            for belief in &self.beliefs {
                beliefs.add_row(vec![
                    belief.name.clone(),
                    belief.priority.as_str().to_string(),
                    belief.description.clone(),
                ]);
            }
            out.push_str(&format!("\n\n{} belief(s):\n{beliefs}", self.beliefs.len()));
        }
        out
    }
}

pub async fn execute(_args: ThresholdsArgs, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;
    let governor = super::build_governor(&config).await?;

    let result = ThresholdsOutput {
        thresholds: governor.thresholds(),
        beliefs: governor.beliefs(),
    };

    output(&result, json);
    Ok(())
}
