use crate::harness::http::{Handler, RecordedRequest, Reply, serve};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

/// A fake upstream service whose behavior can be swapped mid-test.
#[derive(Clone)]
pub struct Upstream {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    script: Arc<Mutex<Handler>>,
}

impl Upstream {
    /// Answers every request with `reply`.
    pub fn start(reply: Reply) -> Self {
        Self::start_with(move |_| reply.clone())
    }

    pub fn start_with<F>(f: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::default();
        let initial: Handler = Arc::new(f);
        let script = Arc::new(Mutex::new(initial));

        let handler: Handler = {
            let requests = requests.clone();
            let script = script.clone();
            Arc::new(move |req: &RecordedRequest| {
                requests
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(req.clone());
                let current = script.lock().unwrap_or_else(PoisonError::into_inner).clone();
                current(req)
            })
        };

        Self {
            addr: serve(handler),
            requests,
            script,
        }
    }

    /// Replaces the behavior for subsequent requests.
    pub fn set_reply(&self, reply: Reply) {
        let next: Handler = Arc::new(move |_: &RecordedRequest| reply.clone());
        *self.script.lock().unwrap() = next;
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}
