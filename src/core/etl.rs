use crate::core::Pipeline;
use crate::domain::model::RunOutcome;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        tracing::info!("Starting listing optimization...");

        let table = self.pipeline.extract().await?;
        tracing::info!("Extracted {} listings", table.len());
        self.monitor.phase_done("Extract", table.len());

        let result = self.pipeline.transform(table).await?;
        tracing::info!("Enriched {} listings", result.results.len());
        self.monitor.phase_done("Transform", result.results.len());

        let output_path = self.pipeline.load(&result).await?;
        self.monitor.phase_done("Load", result.table.len());
        self.monitor.log_run_totals(&result.summary);

        if let Some(message) = result.summary.length_message() {
            tracing::warn!("{}", message);
        }

        Ok(RunOutcome {
            output_path,
            summary: result.summary,
        })
    }
}
