use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use chainstatus_core::{
    check_realtime, project, unix_now, MaxWorstCaseDistance, RealtimeOutcome, StatusProjection,
    UnixTimestamp,
};
use chainstatus_observability::{init_tracing, LogConfig};
use chainstatus_runtime::{HttpIndexingRuntime, HttpRuntimeConfig, IndexingStatusBuilder};

pub async fn run(runtime_url: &str, max_distance: Option<&str>, timeout_ms: u64) -> Result<()> {
    init_tracing(&LogConfig {
        level: "warn".into(),
        ..LogConfig::default()
    })
    .context("initialising logging")?;

    let max = max_distance
        .map(MaxWorstCaseDistance::parse)
        .transpose()
        .context("invalid --max-distance")?;

    let runtime = HttpIndexingRuntime::new(HttpRuntimeConfig {
        url: runtime_url.to_string(),
        request_timeout: Duration::from_millis(timeout_ms),
    })?;
    let builder = IndexingStatusBuilder::new(Arc::new(runtime));

    let (projection, verdict) = check(&builder, max, unix_now()).await;
    println!("{}", serde_json::to_string_pretty(&projection)?);
    verdict
}

/// Build one snapshot and judge it. The projection is returned even when the
/// verdict is an error so it can still be printed.
pub async fn check(
    builder: &IndexingStatusBuilder,
    max: Option<MaxWorstCaseDistance>,
    now: UnixTimestamp,
) -> (StatusProjection, Result<()>) {
    let built = builder.build().await;
    let projection = project(built.as_ref().ok(), now);

    let verdict = match built {
        Err(e) => Err(anyhow!("indexer error: {e}")),
        Ok(snapshot) => match max.map(|max| (max, check_realtime(Some(&snapshot), max, now))) {
            None | Some((_, RealtimeOutcome::Satisfied(_))) => Ok(()),
            Some((max, RealtimeOutcome::NotSatisfied(check))) => Err(anyhow!(
                "worst-case distance {}s exceeds {max}",
                check.worst_case_distance
            )),
            Some((_, RealtimeOutcome::Indeterminate)) => {
                Err(anyhow!("worst-case distance cannot be determined yet"))
            }
        },
    };
    (projection, verdict)
}
