use crate::database::Database;
use anyhow::Result;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

#[derive(Clone)]
pub struct OverdueSweeper {
    database: Database,
}

impl OverdueSweeper {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub async fn sweep(&self) -> Result<u64> {
        let flagged = self.database.mark_overdue(Utc::now()).await?;
        if flagged > 0 {
            info!("Marked {} borrow records as overdue", flagged);
        }

        let outstanding = self.database.count_overdue().await?;
        info!("{} loans currently overdue", outstanding);

        Ok(flagged)
    }

    /// Run [`sweep`](Self::sweep) on a cron schedule. The returned scheduler
    /// must be kept alive and shut down by the caller.
    pub async fn start(&self, schedule: &str) -> Result<JobScheduler> {
        let sweeper = self.clone();

        let scheduler = JobScheduler::new().await?;

        let job = Job::new_async(schedule, move |_, _| {
            let sweeper = sweeper.clone();
            Box::pin(async move {
                if let Err(e) = sweeper.sweep().await {
                    error!("Overdue sweep failed: {}", e);
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("Started overdue sweep with schedule: {}", schedule);
        Ok(scheduler)
    }
}
