use futures::stream::{self, BoxStream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ScanConfig, MAX_CONCURRENCY};
use crate::probe::{Probe, TcpProbe};
use crate::types::{Finding, ScanEvent, Target};

/// Lazily produced scan events. Nothing is probed until the stream is polled, and
/// dropping it stops the scan.
pub type ScanStream = BoxStream<'static, ScanEvent>;

/// Scans targets against a port set and reports progress as a stream of [`ScanEvent`]s.
///
/// For every target, in input order: a target-start event, then for every port in
/// order a probe-start event followed by a port-open event when the probe succeeds,
/// then a no-open-ports event if nothing was open, then a separator. After all
/// targets come scan-complete, one summary and the terminal event.
#[derive(Clone)]
pub struct ScanEngine {
    config: Arc<ScanConfig>,
    probe: Arc<dyn Probe>,
}

impl ScanEngine {
    /// Engine probing with plain TCP connects bounded by `config.timeout_ms`.
    pub fn new(config: ScanConfig) -> Self {
        let probe = Arc::new(TcpProbe::new(config.timeout()));
        Self::with_probe(config, probe)
    }

    pub fn with_probe(config: ScanConfig, probe: Arc<dyn Probe>) -> Self {
        Self {
            config: Arc::new(config),
            probe,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn scan(&self, targets: Vec<Target>) -> ScanStream {
        self.scan_with_cancel(targets, CancellationToken::new())
    }

    /// Variant that stops issuing probes once `cancel` fires. A cancelled stream
    /// ends without the terminal event.
    pub fn scan_with_cancel(
        &self,
        targets: Vec<Target>,
        cancel: CancellationToken,
    ) -> ScanStream {
        let run = ScanRun {
            targets,
            ports: self.config.ports.clone(),
            probe: Arc::clone(&self.probe),
            pacing: self.config.pacing(),
            concurrency: self.config.concurrency.clamp(1, MAX_CONCURRENCY),
            budget: self.config.deadline(),
            deadline: None,
            cancel,
            step: Step::Start,
            target_idx: 0,
            port_idx: 0,
            current: None,
            had_open: false,
            outcomes: None,
            findings: Vec::new(),
        };
        stream::unfold(run, |mut run| async move {
            let event = run.next_event().await?;
            Some((event, run))
        })
        .boxed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Start,
    NextTarget,
    ProbeStart,
    ProbeResult,
    TargetEnd,
    Separator,
    Deadline,
    Complete,
    Summary,
    Terminal,
    Done,
}

enum Wait<T> {
    Done(T),
    Cancelled,
    Deadline,
}

/// State of one scan invocation; each call to `next_event` advances it to the next event.
struct ScanRun {
    targets: Vec<Target>,
    ports: Vec<u16>,
    probe: Arc<dyn Probe>,
    pacing: Duration,
    concurrency: usize,
    budget: Option<Duration>,
    deadline: Option<Instant>,
    cancel: CancellationToken,
    step: Step,
    target_idx: usize,
    port_idx: usize,
    current: Option<Target>,
    had_open: bool,
    /// Probe outcomes of the current target, in port order.
    outcomes: Option<BoxStream<'static, bool>>,
    findings: Vec<Finding>,
}

impl ScanRun {
    async fn next_event(&mut self) -> Option<ScanEvent> {
        loop {
            match self.step {
                Step::Start => {
                    info!(
                        targets = self.targets.len(),
                        ports = ?self.ports,
                        concurrency = self.concurrency,
                        "scan started"
                    );
                    self.deadline = self.budget.map(|b| Instant::now() + b);
                    self.step = Step::NextTarget;
                }
                Step::NextTarget => {
                    if self.cancel.is_cancelled() {
                        return self.abandon();
                    }
                    let Some(target) = self.targets.get(self.target_idx).cloned() else {
                        self.step = Step::Complete;
                        continue;
                    };
                    if self.deadline_passed() {
                        self.step = Step::Deadline;
                        continue;
                    }
                    self.port_idx = 0;
                    self.had_open = false;
                    self.outcomes = Some(self.outcomes_for(&target));
                    self.current = Some(target.clone());
                    self.step = Step::ProbeStart;
                    return Some(ScanEvent::TargetStart { target });
                }
                Step::ProbeStart => {
                    if self.port_idx == 0 {
                        match pause(&self.cancel, self.deadline, self.pacing).await {
                            Wait::Done(()) => {}
                            Wait::Cancelled => return self.abandon(),
                            Wait::Deadline => {
                                self.step = Step::Deadline;
                                continue;
                            }
                        }
                    }
                    if self.cancel.is_cancelled() {
                        return self.abandon();
                    }
                    if self.deadline_passed() {
                        self.step = Step::Deadline;
                        continue;
                    }
                    let (Some(target), Some(&port)) =
                        (self.current.clone(), self.ports.get(self.port_idx))
                    else {
                        self.step = Step::TargetEnd;
                        continue;
                    };
                    self.step = Step::ProbeResult;
                    return Some(ScanEvent::PortProbeStart { target, port });
                }
                Step::ProbeResult => {
                    match pause(&self.cancel, self.deadline, self.pacing).await {
                        Wait::Done(()) => {}
                        Wait::Cancelled => return self.abandon(),
                        Wait::Deadline => {
                            self.step = Step::Deadline;
                            continue;
                        }
                    }
                    let outcomes = &mut self.outcomes;
                    let next = async move {
                        match outcomes.as_mut() {
                            Some(o) => o.next().await.unwrap_or(false),
                            None => false,
                        }
                    };
                    let open = match race(&self.cancel, self.deadline, next).await {
                        Wait::Done(open) => open,
                        Wait::Cancelled => return self.abandon(),
                        Wait::Deadline => {
                            self.step = Step::Deadline;
                            continue;
                        }
                    };
                    let (Some(target), Some(&port)) =
                        (self.current.clone(), self.ports.get(self.port_idx))
                    else {
                        self.step = Step::TargetEnd;
                        continue;
                    };
                    debug!(target_addr = %target, port, open, "probe finished");
                    self.port_idx += 1;
                    self.step = Step::ProbeStart;
                    if open {
                        let finding = Finding { target, port };
                        self.findings.push(finding.clone());
                        self.had_open = true;
                        return Some(ScanEvent::PortOpen(finding));
                    }
                }
                Step::TargetEnd => {
                    self.outcomes = None;
                    self.step = Step::Separator;
                    if !self.had_open {
                        if let Some(target) = self.current.clone() {
                            return Some(ScanEvent::TargetNoOpenPorts { target });
                        }
                    }
                }
                Step::Separator => {
                    self.current = None;
                    self.target_idx += 1;
                    self.step = Step::NextTarget;
                    return Some(ScanEvent::TargetSeparator);
                }
                Step::Deadline => {
                    self.outcomes = None;
                    self.current = None;
                    let unscanned = self.targets.len().saturating_sub(self.target_idx);
                    warn!(unscanned, "scan deadline reached");
                    self.step = Step::Complete;
                    return Some(ScanEvent::DeadlineReached { unscanned });
                }
                Step::Complete => {
                    info!(
                        targets = self.targets.len(),
                        open = self.findings.len(),
                        "scan complete"
                    );
                    self.step = Step::Summary;
                    return Some(ScanEvent::ScanComplete);
                }
                Step::Summary => {
                    self.step = Step::Terminal;
                    return Some(ScanEvent::Summary {
                        findings: std::mem::take(&mut self.findings),
                    });
                }
                Step::Terminal => {
                    self.step = Step::Done;
                    return Some(ScanEvent::Terminal);
                }
                Step::Done => return None,
            }
        }
    }

    /// Ordered probe outcomes for every port of `target`, at most `concurrency` in flight.
    fn outcomes_for(&self, target: &Target) -> BoxStream<'static, bool> {
        let probe = Arc::clone(&self.probe);
        let target = target.clone();
        stream::iter(self.ports.clone())
            .map(move |port| {
                let probe = Arc::clone(&probe);
                let target = target.clone();
                async move { probe.is_open(target.as_str(), port).await }
            })
            .buffered(self.concurrency)
            .boxed()
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn abandon(&mut self) -> Option<ScanEvent> {
        info!(
            scanned = self.target_idx,
            targets = self.targets.len(),
            "scan cancelled"
        );
        self.outcomes = None;
        self.step = Step::Done;
        None
    }
}

async fn pause(
    cancel: &CancellationToken,
    deadline: Option<Instant>,
    pacing: Duration,
) -> Wait<()> {
    if pacing.is_zero() {
        return Wait::Done(());
    }
    race(cancel, deadline, time::sleep(pacing)).await
}

/// Run `fut` unless the scan is cancelled or its deadline expires first.
async fn race<F: Future>(
    cancel: &CancellationToken,
    deadline: Option<Instant>,
    fut: F,
) -> Wait<F::Output> {
    let expiry = async move {
        match deadline {
            Some(d) => time::sleep_until(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Wait::Cancelled,
        _ = expiry => Wait::Deadline,
        out = fut => Wait::Done(out),
    }
}
