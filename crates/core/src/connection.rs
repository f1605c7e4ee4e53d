use std::time::Duration;

use tracing::info;

use crate::query_client::{QueryClient, QueryTransport, TransportError};
use crate::session::{EventSender, SessionEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Unknown,
    Connected,
    ServerError,
    Disconnected,
}

impl ConnectionStatus {
    #[must_use]
    pub fn from_probe(result: Result<u16, &TransportError>) -> Self {
        match result {
            Ok(status) if status >= 500 => Self::ServerError,
            Ok(_) => Self::Connected,
            Err(_) => Self::Disconnected,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "Checking...",
            Self::Connected => "Connected",
            Self::ServerError => "Server Error",
            Self::Disconnected => "Disconnected",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionMonitor<T> {
    client: QueryClient<T>,
    interval: Duration,
}

impl<T: QueryTransport> ConnectionMonitor<T> {
    #[must_use]
    pub fn new(client: QueryClient<T>, interval: Duration) -> Self {
        Self { client, interval }
    }

    pub async fn run(self, events: EventSender) {
        let mut last = ConnectionStatus::Unknown;
        loop {
            let status = self.client.probe().await;
            if status != last {
                info!(
                    status = status.label(),
                    endpoint = self.client.endpoint(),
                    "connection status changed"
                );
                last = status;
            }
            if events.send(SessionEvent::ConnectionChanged(status)).is_err() {
                return;
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::{ConnectionMonitor, ConnectionStatus};
    use crate::query_client::tests::ScriptedTransport;
    use crate::query_client::{HttpResponse, QueryClient, TransportError};
    use crate::session::SessionEvent;

    #[test]
    fn probe_results_map_to_statuses() {
        assert_eq!(ConnectionStatus::from_probe(Ok(200)), ConnectionStatus::Connected);
        assert_eq!(ConnectionStatus::from_probe(Ok(404)), ConnectionStatus::Connected);
        assert_eq!(ConnectionStatus::from_probe(Ok(499)), ConnectionStatus::Connected);
        assert_eq!(ConnectionStatus::from_probe(Ok(500)), ConnectionStatus::ServerError);
        assert_eq!(ConnectionStatus::from_probe(Ok(503)), ConnectionStatus::ServerError);
        assert_eq!(
            ConnectionStatus::from_probe(Err(&TransportError::new("refused"))),
            ConnectionStatus::Disconnected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_publishes_one_status_per_tick_until_receiver_drops() {
        let transport = ScriptedTransport::new([
            Ok(HttpResponse::new(200, "")),
            Ok(HttpResponse::new(503, "")),
            Err(TransportError::new("refused")),
        ]);
        let client = QueryClient::new(transport.clone(), "http://db.local/db");
        let monitor = ConnectionMonitor::new(client, Duration::from_secs(5));
        let (sender, mut receiver) = mpsc::unbounded_channel();

        let handle = tokio::spawn(monitor.run(sender));

        let mut seen = Vec::new();
        for _ in 0..3 {
            match receiver.recv().await {
                Some(SessionEvent::ConnectionChanged(status)) => seen.push(status),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(
            seen,
            vec![
                ConnectionStatus::Connected,
                ConnectionStatus::ServerError,
                ConnectionStatus::Disconnected
            ]
        );

        drop(receiver);
        handle.await.expect("monitor task should finish");
        assert!(transport.requests.lock().expect("lock").len() >= 3);
    }
}
