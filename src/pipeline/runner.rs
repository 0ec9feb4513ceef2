use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use crate::catalog::FrameSearch;
use crate::config::Configuration;
use crate::pipeline::controller::{Command, Completion, Intent, PipelineController};
use crate::pipeline::services::{FaceAnalyzer, TryOnRenderer};
use crate::pipeline::types::Session;

// Presentation-facing handle: submit intents, observe session snapshots.
#[derive(Clone)]
pub struct PipelineHandle {
    intent_tx: mpsc::Sender<Intent>,
    snapshot_rx: watch::Receiver<Session>,
}

impl PipelineHandle {
    pub async fn submit(&self, intent: Intent) {
        if self.intent_tx.send(intent).await.is_err() {
            error!("Pipeline runner is gone, dropping intent");
        }
    }

    pub fn snapshot(&self) -> Session {
        self.snapshot_rx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Session> {
        self.snapshot_rx.clone()
    }
}

/// Event loop around the controller. Receives intents from the presentation
/// layer, spawns exactly one service call per emitted command, and feeds
/// completions back into the controller. Spawned calls are never cancelled;
/// the controller's epoch guard discards whatever comes back late.
pub struct PipelineRunner {
    controller: PipelineController,
    analyzer: Arc<dyn FaceAnalyzer>,
    search: FrameSearch,
    renderer: Arc<dyn TryOnRenderer>,
    intent_rx: mpsc::Receiver<Intent>,
    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
    snapshot_tx: watch::Sender<Session>,
}

impl PipelineRunner {
    pub fn new(
        configuration: &Configuration,
        analyzer: Arc<dyn FaceAnalyzer>,
        search: FrameSearch,
        renderer: Arc<dyn TryOnRenderer>,
    ) -> (Self, PipelineHandle) {
        let controller = PipelineController::new(configuration.retry_policy);
        let (intent_tx, intent_rx) = mpsc::channel(configuration.intent_buffer_size);
        let (completion_tx, completion_rx) = mpsc::channel(configuration.completion_buffer_size);
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());

        let runner = Self {
            controller,
            analyzer,
            search,
            renderer,
            intent_rx,
            completion_tx,
            completion_rx,
            snapshot_tx,
        };
        let handle = PipelineHandle {
            intent_tx,
            snapshot_rx,
        };
        (runner, handle)
    }

    pub async fn run(mut self) {
        info!("Pipeline runner started");
        loop {
            tokio::select! {
                intent = self.intent_rx.recv() => {
                    match intent {
                        Some(intent) => {
                            let command = self.controller.handle_intent(intent);
                            self.execute(command);
                            self.publish();
                        }
                        // All handles dropped; the session is over.
                        None => break,
                    }
                }
                Some(completion) = self.completion_rx.recv() => {
                    let command = self.controller.apply(completion);
                    self.execute(command);
                    self.publish();
                }
            }
        }
        info!("Pipeline runner stopped");
    }

    fn execute(&self, command: Option<Command>) {
        let Some(command) = command else {
            return;
        };
        let completion_tx = self.completion_tx.clone();
        match command {
            Command::Analyze { epoch, image } => {
                let analyzer = Arc::clone(&self.analyzer);
                tokio::spawn(async move {
                    let result = analyzer.analyze(&image).await;
                    let _ = completion_tx
                        .send(Completion::Analysis { epoch, result })
                        .await;
                });
            }
            Command::Search { epoch, criteria } => {
                let search = self.search.clone();
                tokio::spawn(async move {
                    let result = search.search(&criteria).await;
                    let _ = completion_tx
                        .send(Completion::Search { epoch, result })
                        .await;
                });
            }
            Command::Render { epoch, request } => {
                let renderer = Arc::clone(&self.renderer);
                tokio::spawn(async move {
                    let result = renderer.render(request).await;
                    let _ = completion_tx
                        .send(Completion::Render { epoch, result })
                        .await;
                });
            }
        }
    }

    fn publish(&self) {
        // Send regardless of receivers; the presentation layer may attach late.
        let _ = self.snapshot_tx.send(self.controller.snapshot());
    }
}
