use std::{collections::HashSet, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::{sync::watch, time::MissedTickBehavior};

use crate::{
    ctfd::{Challenge, ScoreboardApi},
    detector,
    services::notifier::Notifier,
    stores::AnnouncementStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Idle,
    Running,
    ShuttingDown,
    Stopped,
}

/// What happened to a single challenge during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    AlreadyAnnounced,
    Unsolved,
    Announced,
}

/// Summary of one detection cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub challenges: usize,
    pub announced: usize,
    pub unsolved: usize,
    pub failed: usize,
}

/// Periodically checks every challenge for a first blood and announces it once.
///
/// Everything runs on one task: challenges are handled one at a time in the
/// platform's order, and the announced set and its store are only touched from
/// here, so no locking is needed.
pub struct FirstBloodService {
    interval: Duration,
    api: Arc<dyn ScoreboardApi>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn AnnouncementStore>,
    announced: HashSet<u64>,
    state: ServiceState,
}

impl FirstBloodService {
    pub fn new(
        interval: Duration,
        api: Arc<dyn ScoreboardApi>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn AnnouncementStore>,
    ) -> Self {
        Self {
            interval,
            api,
            notifier,
            store,
            announced: HashSet::new(),
            state: ServiceState::Idle,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> ServiceState {
        self.state
    }

    #[cfg(test)]
    pub fn announced(&self) -> &HashSet<u64> {
        &self.announced
    }

    fn transition(&mut self, next: ServiceState) {
        tracing::debug!(from = ?self.state, to = ?next, "first blood service state change");
        self.state = next;
    }

    /// Loads the announced set from the store and marks the service as running
    pub async fn start(&mut self) -> Result<(), anyhow::Error> {
        self.announced = self
            .store
            .load()
            .await
            .context("failed to load announced first bloods")?;

        tracing::info!(
            count = self.announced.len(),
            "loaded {} already announced first bloods",
            self.announced.len()
        );

        self.transition(ServiceState::Running);
        Ok(())
    }

    /// Runs a full cycle over the current challenge list.
    /// A failing challenge is logged and skipped; the others are still processed.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let challenges = self.api.fetch_challenges().await;
        let mut report = CycleReport {
            challenges: challenges.len(),
            ..CycleReport::default()
        };

        for challenge in &challenges {
            match self.process_challenge(challenge).await {
                Ok(Outcome::Announced) => report.announced += 1,
                Ok(Outcome::Unsolved) => report.unsolved += 1,
                Ok(Outcome::AlreadyAnnounced) => {}
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        challenge_id = challenge.id,
                        "skipping challenge {} this cycle: {err:#}",
                        challenge.name
                    );
                }
            }
        }

        report
    }

    async fn process_challenge(&mut self, challenge: &Challenge) -> Result<Outcome, anyhow::Error> {
        // no solves request for challenges that are already done
        if detector::is_announced(challenge, &self.announced) {
            return Ok(Outcome::AlreadyAnnounced);
        }

        let solves = self.api.fetch_solves(challenge.id).await;

        let Some(first_blood) = detector::detect(challenge, &self.announced, &solves)? else {
            return Ok(Outcome::Unsolved);
        };

        self.notifier
            .announce(&first_blood)
            .await
            .context("failed to send the announcement, retrying next cycle")?;

        self.announced.insert(first_blood.challenge_id);
        tracing::info!(
            challenge_id = first_blood.challenge_id,
            solver = %first_blood.solver,
            solved_at = %first_blood.solved_at,
            "first blood on {} announced",
            first_blood.challenge_name
        );

        if let Err(err) = self.store.append(first_blood.challenge_id).await {
            tracing::error!(
                challenge_id = first_blood.challenge_id,
                "failed to record the announcement, it will repeat after a restart: {err:#}"
            );
        }

        Ok(Outcome::Announced)
    }

    /// Runs one cycle per interval until `shutdown` flips to `true` (or its sender goes away).
    ///
    /// Cycles never overlap: a slow cycle delays the next tick. A cycle still in
    /// flight when shutdown arrives is abandoned at its next await point.
    pub async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<ServiceState, anyhow::Error> {
        if self.state == ServiceState::Idle {
            self.start().await?;
        }

        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            "started first blood service"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => break,
            }

            tokio::select! {
                report = self.run_cycle() => {
                    tracing::debug!(
                        challenges = report.challenges,
                        announced = report.announced,
                        unsolved = report.unsolved,
                        failed = report.failed,
                        "first blood cycle done"
                    );
                }
                _ = shutdown.changed() => break,
            }
        }

        self.transition(ServiceState::ShuttingDown);
        Ok(self.stop())
    }

    /// Releases the platform and chat clients
    fn stop(self) -> ServiceState {
        let Self {
            api,
            notifier,
            store,
            announced,
            ..
        } = self;
        drop(api);
        drop(notifier);
        drop(store);

        tracing::info!(
            announced = announced.len(),
            "first blood service stopped"
        );

        ServiceState::Stopped
    }
}
