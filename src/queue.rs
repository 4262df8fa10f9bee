//! Build triggering and queue polling.
//!
//! Triggering a parameterized build answers with a `Location` header pointing at a queue
//! item. The item only learns its build number once an executor picks it up, so the
//! caller polls it with a [`QueuePoller`].

use log::{debug, trace};
use reqwest::{header::LOCATION, Method, Response};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use url::Url;

use crate::error::{JenkinsError, Result};
use crate::jenkins::{decode, JenkinsClient, QueueItem};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Repeats a fallible poll on a fixed interval until it succeeds once.
///
/// The first attempt happens one interval after start. The successful value is delivered
/// through [`QueuePoller::recv`] and the polling task ends with it. [`QueuePoller::stop`]
/// may be called any number of times, before or after a result; dropping the poller
/// stops it too.
pub struct QueuePoller<T> {
    result: Option<oneshot::Receiver<T>>,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl<T: Send + 'static> QueuePoller<T> {
    pub fn start<F, Fut, E>(period: Duration, mut poll: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => {
                        debug!("Queue poller stopping");
                        return;
                    }
                    _ = ticker.tick() => {
                        match poll().await {
                            Ok(value) => {
                                trace!("Queue poller got a result");
                                let _ = result_tx.send(value);
                                return;
                            }
                            Err(e) => debug!("Queue poll not ready: {e}"),
                        }
                    }
                }
            }
        });

        Self {
            result: Some(result_rx),
            stop_tx,
            handle,
        }
    }

    /// Wait for the result. `None` once stopped, or when the result was already taken.
    pub async fn recv(&mut self) -> Option<T> {
        match self.result.take() {
            Some(rx) => rx.await.ok(),
            None => None,
        }
    }

    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
        self.handle.abort();
    }
}

impl<T> Drop for QueuePoller<T> {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
        self.handle.abort();
    }
}

/// The queue item URL from a trigger response.
pub fn queue_location(response: &Response) -> Result<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|location| !location.is_empty())
        .map(str::to_string)
        .ok_or(JenkinsError::MissingQueueLocation)
}

/// JSON endpoint of a queue item on `host`.
///
/// Only the path of `location` is kept, so the request always goes to `host`.
pub fn queue_api_url(host: &str, location: &str) -> Result<Url> {
    let base = Url::parse(host)?;
    let path = base.join(location)?.path().to_string();
    let mut item = base.join(&path)?;
    item.set_query(None);
    item.set_fragment(None);
    if !item.path().ends_with('/') {
        let path = format!("{}/", item.path());
        item.set_path(&path);
    }
    Ok(item.join("api/json")?)
}

/// Poll the queue item at `location` until it reports the started build's number.
pub async fn wait_for_build_number(
    client: &JenkinsClient,
    location: &str,
    period: Duration,
) -> Result<u64> {
    let url = queue_api_url(client.host(), location)?.to_string();
    debug!("Polling queue location [{location}][{url}]");

    let poll_client = client.clone();
    let poll_url = url.clone();
    let mut poller = QueuePoller::start(period, move || {
        let client = poll_client.clone();
        let url = poll_url.clone();
        async move {
            let response = client.request(Method::GET, &url, None).await?;
            let item: QueueItem = decode(response).await?;
            item.build_number()
                .ok_or_else(|| JenkinsError::QueuePending(item.id))
        }
    });

    let number = poller.recv().await;
    poller.stop();
    number.ok_or(JenkinsError::QueuePending(url))
}
