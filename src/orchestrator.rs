//! Composition root: builds one scheduler per configured source and runs them
//! side by side, each as its own task.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::info;

use crate::config::MonitorConfig;
use crate::ingest::enrich::Enricher;
use crate::ingest::providers::{github::GithubSearch, nvd::NvdFeed, youtube::YoutubeSearch};
use crate::ingest::scheduler::SourceScheduler;
use crate::ingest::video::VideoChannelSource;
use crate::ingest::vulnerability::VulnerabilitySource;
use crate::notify::{NotificationSink, RateLimitedDispatcher, TelegramSink};

#[derive(Default)]
pub struct Orchestrator {
    schedulers: Vec<SourceScheduler>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the production sources and the Telegram sink from configuration.
    pub fn from_config(cfg: &MonitorConfig) -> Self {
        let sink: Arc<dyn NotificationSink> = Arc::new(TelegramSink::new(cfg.telegram_token.clone()));
        Self::with_sink(cfg, sink)
    }

    /// Same wiring as [`Orchestrator::from_config`] with a caller-supplied sink.
    pub fn with_sink(cfg: &MonitorConfig, sink: Arc<dyn NotificationSink>) -> Self {
        let mut orch = Self::new();

        let dispatcher = RateLimitedDispatcher::new(sink)
            .with_max_items(cfg.dispatch_max_items)
            .with_delay(cfg.message_delay);

        let vulns = VulnerabilitySource::new(
            Arc::new(NvdFeed::new(cfg.nvd_api_key.clone())),
            cfg.max_cves_per_cycle,
        )
        .with_enricher(Enricher::new(Arc::new(GithubSearch::new(cfg.github_token.clone()))));
        info!(
            source_cap = cfg.max_cves_per_cycle,
            dispatch_cap = cfg.dispatch_max_items,
            effective_cap = cfg.effective_vulnerability_cap(),
            "vulnerability caps"
        );
        orch.add(SourceScheduler::new(
            Box::new(vulns),
            dispatcher.clone(),
            cfg.vulnerability_destination(),
            cfg.check_interval,
        ));

        if let Some(yt) = &cfg.youtube {
            let feed = Arc::new(YoutubeSearch::new(yt.api_key.clone()));
            for channel in &yt.channels {
                let source = VideoChannelSource::new(feed.clone(), channel.channel_id.clone());
                orch.add(SourceScheduler::new(
                    Box::new(source),
                    dispatcher.clone(),
                    cfg.channel_destination(channel),
                    yt.check_interval,
                ));
            }
        }

        orch
    }

    pub fn add(&mut self, scheduler: SourceScheduler) {
        self.schedulers.push(scheduler);
    }

    pub fn len(&self) -> usize {
        self.schedulers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedulers.is_empty()
    }

    pub fn source_names(&self) -> Vec<String> {
        self.schedulers.iter().map(|s| s.name().to_string()).collect()
    }

    /// Spawn every scheduler and return immediately; the tasks run until
    /// [`Running::shutdown`] or the runtime goes away.
    pub fn start(self) -> Running {
        crate::metrics::ensure_described();

        let mut tasks = JoinSet::new();
        for scheduler in self.schedulers {
            info!(
                source = scheduler.name(),
                interval_secs = scheduler.interval().as_secs(),
                "starting scheduler"
            );
            let name = scheduler.name().to_string();
            tasks.spawn(async move {
                scheduler.run().await;
                name
            });
        }
        info!(sources = tasks.len(), "all schedulers started");
        Running { tasks }
    }
}

/// Handle over the spawned scheduler tasks.
pub struct Running {
    tasks: JoinSet<String>,
}

impl Running {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait until no scheduler is left. Schedulers do not return on their
    /// own, so in practice this only resolves if a task is torn down.
    pub async fn wait(&mut self) {
        while let Some(res) = self.tasks.join_next().await {
            match res {
                Ok(name) => tracing::warn!(source = %name, "scheduler exited"),
                Err(e) if e.is_cancelled() => tracing::debug!("scheduler task cancelled"),
                Err(e) => tracing::error!(error = %e, "scheduler task died"),
            }
        }
    }

    /// Abort all schedulers. In-flight cycles are abandoned.
    pub fn shutdown(mut self) {
        info!(sources = self.tasks.len(), "stopping schedulers");
        self.tasks.abort_all();
    }
}
