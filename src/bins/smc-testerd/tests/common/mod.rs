//! Shared fixtures for the tester integration tests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use smc_dbi::MemoryResultStore;
use smc_nas::MutationLayout;
use smc_sbi::{SbiRequest, SbiResponse, SbiServer};
use smc_testcase::TestcaseConfig;
use smc_testerd::{
    AmfSbiConfig, ControlDispatcher, ControlPolicy, Driver, RetryConfig, SbiControlChannel, TesterSm,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// One request seen by the mock AMF
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Option<String>,
}

/// AMF control endpoint that records every request and answers 204
pub struct MockAmf {
    server: SbiServer,
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockAmf {
    pub async fn start() -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        let server = SbiServer::with_addr(SocketAddr::from(([127, 0, 0, 1], 0)));
        let addr = server
            .start(move |request: SbiRequest| {
                let recorded = recorded.clone();
                async move {
                    recorded.lock().await.push(RecordedRequest {
                        method: request.header.method.clone(),
                        path: request.header.path().to_string(),
                        content_type: request.http.get_header("content-type").cloned(),
                        body: request.http.content.clone(),
                    });
                    SbiResponse::no_content()
                }
            })
            .await
            .expect("mock AMF failed to start");

        Self {
            server,
            addr,
            requests,
        }
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn stop(&self) {
        let _ = self.server.stop().await;
    }

    pub fn sbi_config(&self) -> AmfSbiConfig {
        AmfSbiConfig {
            host: "127.0.0.1".to_string(),
            port: self.addr.port(),
            ..Default::default()
        }
    }
}

/// Build a driver talking to `amf` and storing into a fresh in-memory store
pub fn tester(
    script: TestcaseConfig,
    amf: AmfSbiConfig,
    dereg_delay: Duration,
) -> (Driver, MemoryResultStore) {
    let store = MemoryResultStore::new();
    let sm = TesterSm::new(
        Arc::new(script),
        MutationLayout::default(),
        RetryConfig::default().policy(),
        Arc::new(store.clone()),
    );
    let policy = ControlPolicy {
        workers: 2,
        max_attempts: 1,
        backoff: Duration::from_millis(10),
        request_timeout: Duration::from_secs(2),
    };
    let control = ControlDispatcher::new(Arc::new(SbiControlChannel::new(&amf)), policy);
    (Driver::new(sm, control, dereg_delay), store)
}

/// One UE connection: send `input`, return everything until the tester closes
pub async fn exchange(addr: SocketAddr, input: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    if !input.is_empty() {
        stream.write_all(input).await.expect("write");
    }
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.expect("read");
    out
}
