//! The generic ceremony driver.
//!
//! One value owns the per-ceremony state: the `last_seen` cursor, the
//! transcript digest, and the inbound queue. Two cooperative tasks share
//! it, the round loop driving the protocol engine and a poller ticking once
//! per second, and every relay exchange runs under a single lock, so each
//! log row is folded into the transcript exactly once, in id order. That
//! discipline is what makes leader election agree across parties: everyone
//! folds the identical byte sequence.
//!
//! Failure rules: transport errors are logged and retried on the next tick;
//! a tagged coordinator error (notably `ceremony-closed`) is terminal; an
//! engine abort is terminal; the whole run sits under a one-hour deadline
//! to accommodate airgapped operators.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, warn};

use freon_ceremony::Engine;
use freon_crypto::election::Transcript;
use freon_types::PartyId;

use crate::relay::CeremonyChannel;
use crate::{ClientError, Result};

/// How long a ceremony may run before the driver gives up.
pub const CEREMONY_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Cadence of the message poller.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What the round loop receives from the shared inbox.
enum InboundEvent {
    /// One log payload, already folded into the transcript.
    Payload(Vec<u8>),
    /// The poller hit a terminal error; the ceremony cannot proceed.
    Fatal(ClientError),
}

/// Shared driver state, guarded by one mutex with no nested locking.
struct Inbox {
    last_seen: i64,
    transcript: Transcript,
    inbound: mpsc::UnboundedSender<InboundEvent>,
}

impl Inbox {
    /// Run one relay exchange: post an optional outbound payload, then fold
    /// and queue every returned payload in log order and advance the
    /// cursor. Holding the inbox lock across the request serializes
    /// exchanges from both tasks.
    async fn exchange(
        &mut self,
        channel: &dyn CeremonyChannel,
        me: PartyId,
        message: Option<Vec<u8>>,
    ) -> Result<()> {
        let response = channel.exchange(me, message, self.last_seen).await?;
        for message_hex in &response.messages {
            match hex::decode(message_hex) {
                Ok(payload) => {
                    self.transcript.fold(&payload);
                    let _ = self.inbound.send(InboundEvent::Payload(payload));
                }
                Err(_) => {
                    // Every honest party sees the same corrupt row and skips
                    // it the same way.
                    warn!("skipping relay payload that is not valid hex");
                }
            }
        }
        self.last_seen = self.last_seen.max(response.last_seen);
        Ok(())
    }
}

/// A finished ceremony: the completed engine plus the transcript hash the
/// leader election runs on.
pub struct CeremonyOutcome<E> {
    pub engine: E,
    pub transcript_hash: [u8; 48],
}

/// Drive `engine` over `channel` until it completes or fails.
pub async fn run_ceremony<E: Engine>(
    engine: E,
    channel: Arc<dyn CeremonyChannel>,
    my_party_id: PartyId,
    transcript: Transcript,
) -> Result<CeremonyOutcome<E>> {
    tokio::time::timeout(
        CEREMONY_TIMEOUT,
        drive(engine, channel, my_party_id, transcript),
    )
    .await
    .map_err(|_| ClientError::Timeout)?
}

async fn drive<E: Engine>(
    mut engine: E,
    channel: Arc<dyn CeremonyChannel>,
    me: PartyId,
    transcript: Transcript,
) -> Result<CeremonyOutcome<E>> {
    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
    let inbox = Arc::new(Mutex::new(Inbox {
        last_seen: 0,
        transcript,
        inbound: inbound_tx,
    }));
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let poller = tokio::spawn(poll_loop(channel.clone(), inbox.clone(), me, cancel_rx));

    let result = round_loop(&mut engine, channel.as_ref(), &inbox, me, &mut inbound_rx).await;

    // Completion or failure both stop the poller.
    let _ = cancel_tx.send(true);
    let _ = poller.await;

    result?;

    // Final drain: a party that finishes early may not yet have folded rows
    // its peers posted moments before (their own completion did not need
    // ours). One more fetch closes that window so every party elects on the
    // same folded log.
    {
        let mut inbox = inbox.lock().await;
        if let Err(err) = inbox.exchange(channel.as_ref(), me, None).await {
            warn!(error = %err, "final log drain failed; electing on the folded prefix");
        }
    }

    let transcript_hash = inbox.lock().await.transcript.current();
    Ok(CeremonyOutcome {
        engine,
        transcript_hash,
    })
}

async fn round_loop<E: Engine>(
    engine: &mut E,
    channel: &dyn CeremonyChannel,
    inbox: &Mutex<Inbox>,
    me: PartyId,
    inbound: &mut mpsc::UnboundedReceiver<InboundEvent>,
) -> Result<()> {
    for payload in engine.start()? {
        send_with_retry(channel, inbox, me, payload).await?;
    }

    while !engine.is_complete() {
        let event = inbound
            .recv()
            .await
            .ok_or_else(|| ClientError::Network("inbound queue closed".into()))?;
        let payload = match event {
            InboundEvent::Payload(payload) => payload,
            InboundEvent::Fatal(err) => return Err(err),
        };
        for outbound in engine.handle(&payload)? {
            send_with_retry(channel, inbox, me, outbound).await?;
        }
    }
    debug!("engine complete");
    Ok(())
}

/// Post one payload, retrying transport failures indefinitely. The one-hour
/// ceremony deadline is the outer bound.
async fn send_with_retry(
    channel: &dyn CeremonyChannel,
    inbox: &Mutex<Inbox>,
    me: PartyId,
    payload: Vec<u8>,
) -> Result<()> {
    loop {
        let attempt = {
            let mut inbox = inbox.lock().await;
            inbox.exchange(channel, me, Some(payload.clone())).await
        };
        match attempt {
            Ok(()) => return Ok(()),
            Err(err) if err.is_transient() => {
                warn!(error = %err, "posting protocol message failed; retrying");
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Tick once per second, draining the log tail into the inbox.
async fn poll_loop(
    channel: Arc<dyn CeremonyChannel>,
    inbox: Arc<Mutex<Inbox>>,
    me: PartyId,
    mut cancel: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let attempt = {
                    let mut inbox = inbox.lock().await;
                    inbox.exchange(channel.as_ref(), me, None).await
                };
                match attempt {
                    Ok(()) => {}
                    Err(err) if err.is_transient() => {
                        warn!(error = %err, "poll failed; will retry");
                    }
                    Err(err) => {
                        // Closed or unknown ceremony: wake the round loop
                        // with the verdict and stop polling.
                        let fatal = {
                            let inbox = inbox.lock().await;
                            inbox.inbound.send(InboundEvent::Fatal(err))
                        };
                        let _ = fatal;
                        return;
                    }
                }
            }
            _ = cancel.changed() => return,
        }
    }
}
