use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;
use sheetsync_core::{Coordinator, ExportOutcome, SyncStatus};

use crate::output::{print_json, print_table};

#[derive(Serialize)]
struct ExportRow {
    collection: String,
    written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ExportRow {
    fn new(collection: String, outcome: ExportOutcome) -> Self {
        match outcome {
            ExportOutcome::Written { rows } => Self {
                collection,
                written: true,
                rows: Some(rows),
                error: None,
            },
            ExportOutcome::Failed { error } => Self {
                collection,
                written: false,
                rows: None,
                error: Some(error),
            },
        }
    }
}

/// Export every collection once and exit. Fails if any export failed.
pub fn run(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = super::load_config(config_path)?;

    let rt = tokio::runtime::Runtime::new()?;
    let outcomes = rt.block_on(async {
        let ctx = super::connect(&config, Arc::new(SyncStatus::new())).await?;
        let outcomes = Coordinator::new(ctx).initial_sync().await?;
        Ok::<_, anyhow::Error>(outcomes)
    })?;

    let rows: Vec<ExportRow> = outcomes
        .into_iter()
        .map(|(name, outcome)| ExportRow::new(name, outcome))
        .collect();
    let failed = rows.iter().filter(|r| !r.written).count();

    if json {
        print_json(&rows)?;
    } else {
        print_table(
            &["COLLECTION", "RESULT", "DETAIL"],
            rows.iter()
                .map(|r| {
                    let (result, detail) = match (&r.rows, &r.error) {
                        (Some(n), _) => ("written", format!("{n} rows")),
                        (None, Some(e)) => ("failed", e.clone()),
                        (None, None) => ("failed", String::new()),
                    };
                    vec![r.collection.clone(), result.to_string(), detail]
                })
                .collect(),
        );
    }

    if failed > 0 {
        bail!("{failed} of {} exports failed", rows.len());
    }
    Ok(())
}
