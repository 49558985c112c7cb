use crate::clock::SystemClock;
use crate::event::AdEvent;
use crate::gate::PlayDecision;
use crate::platform::MediaHost;
use crate::session::{AdSession, SessionStatus};
use crate::{AdsSettings, Error, Result};
use log::error;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command<H> {
    Event(AdEvent, oneshot::Sender<Result<()>>),
    EventName(String, oneshot::Sender<Result<()>>),
    RequestPlay(oneshot::Sender<PlayDecision>),

    // Integration verbs
    Begin(oneshot::Sender<Result<()>>),
    End(oneshot::Sender<Result<()>>),
    Skip(oneshot::Sender<Result<()>>),
    Reset(oneshot::Sender<()>),

    Status(oneshot::Sender<SessionStatus>),
    Close(oneshot::Sender<H>),
}

/// An async-friendly ad session backed by a dedicated worker thread.
///
/// The worker thread owns the `AdSession` and its host, executes commands
/// sent from async tasks one at a time and fires session timers on the wall
/// clock between commands, so every event still runs to completion before the
/// next one is looked at.
pub struct SessionWorker<H> {
    cmd_tx: Sender<Command<H>>,
}

impl<H> Clone for SessionWorker<H> {
    fn clone(&self) -> Self {
        SessionWorker {
            cmd_tx: self.cmd_tx.clone(),
        }
    }
}

impl<H: MediaHost + 'static> SessionWorker<H> {
    /// Spawn the worker thread and create the session on it.
    pub async fn spawn(settings: AdsSettings, host: H) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command<H>>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::spawn(move || {
            let mut session = match AdSession::new(settings, host, SystemClock::new()) {
                Ok(s) => s,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            let _ = init_tx.send(Ok(()));

            loop {
                let next = match session.time_until_next_timer() {
                    Some(wait) => cmd_rx.recv_timeout(wait),
                    None => cmd_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                };
                let cmd = match next {
                    Ok(cmd) => cmd,
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(err) = session.poll_timers() {
                            error!("ADS: timer handling failed: {}", err);
                        }
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                };

                // timers that came due while the command was queued go first
                if let Err(err) = session.poll_timers() {
                    error!("ADS: timer handling failed: {}", err);
                }

                match cmd {
                    Command::Event(event, resp) => {
                        let _ = resp.send(session.handle_event(event));
                    }
                    Command::EventName(name, resp) => {
                        let _ = resp.send(session.handle_event_name(&name));
                    }
                    Command::RequestPlay(resp) => {
                        let _ = resp.send(session.request_play());
                    }
                    Command::Begin(resp) => {
                        let _ = resp.send(session.begin_ad_break());
                    }
                    Command::End(resp) => {
                        let _ = resp.send(session.end_ad_break());
                    }
                    Command::Skip(resp) => {
                        let _ = resp.send(session.skip_ad_break());
                    }
                    Command::Reset(resp) => {
                        session.reset();
                        let _ = resp.send(());
                    }
                    Command::Status(resp) => {
                        let _ = resp.send(session.status());
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(session.into_host());
                        break;
                    }
                }
            }
        });

        init_rx
            .await
            .map_err(|e| Error::WorkerClosed(format!("Worker init canceled: {}", e)))??;

        Ok(Self { cmd_tx })
    }

    /// Feed one inbound event to the session
    pub async fn send_event(&self, event: AdEvent) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Event(event, tx))?;
        rx.await
            .map_err(|e| Error::WorkerClosed(format!("Event canceled: {}", e)))?
    }

    /// Feed an inbound event by its wire name, e.g. `"adsready"`
    pub async fn send_event_name(&self, name: &str) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::EventName(name.to_string(), tx))?;
        rx.await
            .map_err(|e| Error::WorkerClosed(format!("Event canceled: {}", e)))?
    }

    pub async fn request_play(&self) -> Result<PlayDecision> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::RequestPlay(tx))?;
        rx.await
            .map_err(|e| Error::WorkerClosed(format!("RequestPlay canceled: {}", e)))
    }

    pub async fn begin_ad_break(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Begin(tx))?;
        rx.await
            .map_err(|e| Error::WorkerClosed(format!("Begin canceled: {}", e)))?
    }

    pub async fn end_ad_break(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::End(tx))?;
        rx.await
            .map_err(|e| Error::WorkerClosed(format!("End canceled: {}", e)))?
    }

    pub async fn skip_ad_break(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Skip(tx))?;
        rx.await
            .map_err(|e| Error::WorkerClosed(format!("Skip canceled: {}", e)))?
    }

    pub async fn reset(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Reset(tx))?;
        rx.await
            .map_err(|e| Error::WorkerClosed(format!("Reset canceled: {}", e)))
    }

    pub async fn status(&self) -> Result<SessionStatus> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Status(tx))?;
        rx.await
            .map_err(|e| Error::WorkerClosed(format!("Status canceled: {}", e)))
    }

    /// Shut the worker down and hand the host back.
    pub async fn close(self) -> Result<H> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Close(tx))?;
        rx.await
            .map_err(|e| Error::WorkerClosed(format!("Close canceled: {}", e)))
    }

    fn send(&self, cmd: Command<H>) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| Error::WorkerClosed("worker thread has exited".into()))
    }
}
