//! Per-request routing state machine.
//!
//! The router never touches a socket. The transport feeds it bytes and
//! carries out the [`Action`]s it returns:
//!
//! ```text
//! Received -> Classified -> SlotKnown ----------> Dispatching -> AwaitingReply -> Done
//!                  |            |                      ^              |
//!                  |            v                      |              | MOVED / ASK / TRYAGAIN
//!                  |       Bootstrapping --------------+              |
//!                  |                                   +--------------+
//!                  +-> NoSlotNeeded ----------------> Dispatching
//!
//! any state -> Failed  (classification error, bootstrap failure, retry ceiling)
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, instrument, warn};

use crate::cluster::commands::{cluster_nodes, with_asking};
use crate::cluster::errors::{interpret_reply, Redirection};
use crate::cluster::request::{interpret, Request};
use crate::cluster::topology::TopologyStore;
use crate::core::builder::RouterBuilder;
use crate::core::config::RouterConfig;
use crate::core::{Error, Result};
use crate::proto::codec::Decoder;
use crate::proto::frame::FrameKind;

/// Where an in-flight request stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// A complete frame has been split off the client stream.
    Received,
    /// The command and its keys are known.
    Classified,
    /// The target slot is known; a node is being looked up.
    SlotKnown,
    /// The request has no key and goes to any node.
    NoSlotNeeded,
    /// Waiting for a CLUSTER NODES reply.
    Bootstrapping,
    /// A [`Action::Dispatch`] was issued; no reply byte seen yet.
    Dispatching,
    /// Part of the reply has been offered but it is not complete.
    AwaitingReply,
    /// The reply was forwarded to the client.
    Done,
    /// An error reply was produced for the client.
    Failed,
}

/// What the transport must do next for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send `payload` to `node` (any node when `None`) after `delay`, then
    /// feed the reply to [`InFlight::on_reply`].
    Dispatch {
        /// Destination `host:port`; `None` for keyless requests.
        node: Option<Arc<str>>,
        /// Bytes to write.
        payload: Bytes,
        /// Wait this long before writing (`TRYAGAIN`).
        delay: Option<Duration>,
    },
    /// Send `payload` (CLUSTER NODES) to `node`, then feed the reply to
    /// [`InFlight::on_topology`].
    Bootstrap {
        /// Node to ask.
        node: Arc<str>,
        /// Bytes to write.
        payload: Bytes,
    },
    /// Write this backend reply to the client. The request is done.
    Forward(Bytes),
    /// Write this error reply to the client. The request is done.
    Respond(Bytes),
    /// Write this error reply to the client and drop the backend connection.
    ///
    /// The backend's byte stream can no longer be matched to requests; its
    /// decoder must be discarded along with the connection.
    DropBackend(Bytes),
    /// The reply is not complete; call again with more bytes.
    NeedMore,
    /// Close the client connection.
    Close,
}

impl Action {
    /// Returns the action that reports `error` to the client.
    ///
    /// Connection-fatal errors close the connection; all others become an
    /// error reply.
    pub fn from_error(error: &Error) -> Self {
        if error.is_connection_fatal() {
            Action::Close
        } else {
            Action::Respond(error.to_reply())
        }
    }
}

/// Routes client requests for any number of clusters over a shared
/// [`TopologyStore`].
///
/// # Example
///
/// ```
/// use slotgate::cluster::Action;
/// use slotgate::core::command::Cmd;
/// use slotgate::Router;
///
/// let router = Router::builder().seed("127.0.0.1:7000").build().unwrap();
/// router
///     .store()
///     .replace_all("backend", "abc 127.0.0.1:7001 master - 0 0 1 connected 0-16383")
///     .unwrap();
///
/// let mut client = router.decoder();
/// client.append(&Cmd::new("GET").arg("foo").encode());
/// let mut request = router.accept("backend", &mut client).unwrap().unwrap();
///
/// match request.start() {
///     Action::Dispatch { node, .. } => assert_eq!(node.as_deref(), Some("127.0.0.1:7001")),
///     other => panic!("unexpected {:?}", other),
/// }
///
/// let mut backend = router.decoder();
/// backend.append(b"$3\r\nbar\r\n");
/// assert_eq!(request.on_reply(&mut backend), Action::Forward("$3\r\nbar\r\n".into()));
/// ```
#[derive(Debug, Clone)]
pub struct Router {
    store: Arc<TopologyStore>,
    config: Arc<RouterConfig>,
}

impl Router {
    /// Creates a router with its own empty store.
    ///
    /// `config` is used as given; see [`RouterBuilder`] for validation.
    pub fn new(config: RouterConfig) -> Self {
        Self::with_store(Arc::new(TopologyStore::new()), config)
    }

    /// Creates a router over a shared store.
    pub fn with_store(store: Arc<TopologyStore>, config: RouterConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Returns a builder.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Returns the topology store.
    pub fn store(&self) -> &Arc<TopologyStore> {
        &self.store
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Creates a decoder honoring the configured frame size limit.
    ///
    /// Use one per client connection and one per backend connection.
    pub fn decoder(&self) -> Decoder {
        Decoder::with_max_frame_size(self.config.max_frame_size)
    }

    /// Takes the next complete request off a client stream.
    ///
    /// Returns `Ok(None)` until a whole frame is buffered. A request that
    /// cannot be routed is still returned, in [`State::Failed`], so that its
    /// error reply keeps its place in the stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFrame`] if the stream is not RESP; the
    /// connection must be closed (see [`Action::from_error`]).
    #[instrument(skip(self, client), level = "debug")]
    pub fn accept(&self, cluster: &str, client: &mut Decoder) -> Result<Option<InFlight>> {
        let Some(decoded) = client.decode()? else {
            return Ok(None);
        };

        let mut in_flight = InFlight {
            cluster: cluster.to_string(),
            store: self.store.clone(),
            config: self.config.clone(),
            state: State::Received,
            request: None,
            error: None,
            node: None,
            redirects: 0,
            bootstraps: 0,
            candidates: Vec::new(),
            asking: false,
            asking_ack: false,
            refused: None,
        };

        match interpret(decoded) {
            Ok(request) => {
                in_flight.request = Some(request);
                in_flight.state = State::Classified;
            }
            Err(e) => {
                debug!(cluster, error = %e, "request rejected");
                in_flight.error = Some(e);
                in_flight.state = State::Failed;
            }
        }
        Ok(Some(in_flight))
    }
}

/// One client request moving through the router.
#[derive(Debug)]
pub struct InFlight {
    cluster: String,
    store: Arc<TopologyStore>,
    config: Arc<RouterConfig>,
    state: State,
    request: Option<Request>,
    error: Option<Error>,
    /// Node the last dispatch or bootstrap went to.
    node: Option<Arc<str>>,
    redirects: u32,
    bootstraps: u32,
    /// Nodes left to try for the current bootstrap.
    candidates: Vec<Arc<str>>,
    /// The last dispatch carried an `ASKING` prefix.
    asking: bool,
    /// The next backend frame answers `ASKING`, not the request.
    asking_ack: bool,
    /// `ASKING` was refused; the request's own reply is still to be read.
    refused: Option<Error>,
}

impl InFlight {
    /// Returns the current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Returns the classified request, unless classification failed.
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    /// Returns the error that failed the request, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Returns the number of redirects followed so far.
    pub fn redirects(&self) -> u32 {
        self.redirects
    }

    /// Decides the first step for a freshly accepted request.
    pub fn start(&mut self) -> Action {
        match self.state {
            State::Failed => self.respond_error(),
            State::Classified => self.route(),
            state => self.unexpected(state, "start"),
        }
    }

    /// Consumes a backend reply to a [`Action::Dispatch`].
    ///
    /// Error replies are inspected: `MOVED` updates the topology and
    /// re-dispatches, `ASK` re-dispatches with an `ASKING` prefix, `TRYAGAIN`
    /// re-dispatches to the same node after a delay. Everything else is
    /// forwarded. After an `ASK`, the `+OK` answering `ASKING` is consumed
    /// here and never forwarded. If `ASKING` is refused, the request's own
    /// reply is read and discarded before the request fails, so the backend
    /// connection stays in step.
    pub fn on_reply(&mut self, backend: &mut Decoder) -> Action {
        match self.state {
            State::Dispatching | State::AwaitingReply => {}
            state => return self.unexpected(state, "on_reply"),
        }
        self.state = State::AwaitingReply;

        if self.asking_ack {
            match backend.decode() {
                Ok(Some(ack)) if ack.frame.kind() == FrameKind::Status => self.asking_ack = false,
                Ok(Some(ack)) => {
                    self.asking_ack = false;
                    self.refused = Some(Error::Protocol {
                        message: format!(
                            "ASKING refused: {}",
                            String::from_utf8_lossy(&ack.payload().unwrap_or_default())
                        ),
                    });
                }
                Ok(None) => return Action::NeedMore,
                Err(e) => return self.backend_broken(e),
            }
        }

        let reply = match backend.decode() {
            Ok(Some(reply)) => reply,
            Ok(None) => return Action::NeedMore,
            Err(e) => return self.backend_broken(e),
        };

        if let Some(e) = self.refused.take() {
            debug!(
                cluster = %self.cluster,
                node = ?self.node,
                "discarding reply after refused ASKING"
            );
            return self.fail(e);
        }

        let redirection =
            match interpret_reply(&self.store, &self.cluster, &reply.bytes, &reply.frame) {
                Ok(redirection) => redirection,
                Err(e) => return self.fail(e),
            };

        match redirection {
            Redirection::Ok | Redirection::NoScript | Redirection::Terminal(_) => {
                self.state = State::Done;
                Action::Forward(reply.bytes)
            }
            Redirection::Moved { address, .. } => {
                if let Some(exhausted) = self.count_redirect() {
                    return exhausted;
                }
                self.dispatch(Some(Arc::from(address)), None, false)
            }
            Redirection::Ask { address, .. } => {
                if let Some(exhausted) = self.count_redirect() {
                    return exhausted;
                }
                self.dispatch(Some(Arc::from(address)), None, true)
            }
            Redirection::TryAgain => {
                if let Some(exhausted) = self.count_redirect() {
                    return exhausted;
                }
                let delay = self.config.tryagain_delay;
                self.dispatch(self.node.clone(), Some(delay), self.asking)
            }
        }
    }

    /// Consumes the reply to a [`Action::Bootstrap`].
    ///
    /// On success the cluster's topology is replaced and routing resumes.
    /// On failure the next known node is asked; when none is left the
    /// request fails.
    pub fn on_topology(&mut self, backend: &mut Decoder) -> Action {
        if self.state != State::Bootstrapping {
            return self.unexpected(self.state, "on_topology");
        }

        let reply = match backend.decode() {
            Ok(Some(reply)) => reply,
            Ok(None) => return Action::NeedMore,
            Err(e) => return self.backend_broken(e),
        };

        let outcome = match (reply.frame.kind(), reply.payload()) {
            (FrameKind::Bulk, Some(dump)) => self.store.replace_all_from(
                &self.cluster,
                &String::from_utf8_lossy(&dump),
                self.node.as_deref(),
            ),
            (FrameKind::Error, payload) => Err(Error::Protocol {
                message: format!(
                    "CLUSTER NODES failed: {}",
                    String::from_utf8_lossy(payload.as_deref().unwrap_or_default())
                ),
            }),
            _ => Err(Error::Protocol {
                message: "CLUSTER NODES reply is not a bulk string".to_string(),
            }),
        };

        match outcome {
            Ok(_) => {
                self.bootstraps += 1;
                self.candidates.clear();
                self.state = State::SlotKnown;
                self.route()
            }
            Err(e) => {
                warn!(cluster = %self.cluster, node = ?self.node, error = %e, "bootstrap failed");
                match self.candidates.pop() {
                    Some(node) => self.bootstrap_from(node),
                    None => self.fail(e),
                }
            }
        }
    }

    fn route(&mut self) -> Action {
        let slot = match self.request.as_ref().map(Request::target_slot) {
            Some(Ok(slot)) => slot,
            Some(Err(e)) => return self.fail(e),
            None => return self.fail(Error::EmptyCommand),
        };

        let Some(slot) = slot else {
            self.state = State::NoSlotNeeded;
            return self.dispatch(None, None, false);
        };
        self.state = State::SlotKnown;

        if self.store.bootstrap_needed(&self.cluster) && self.bootstraps == 0 {
            return self.bootstrap();
        }
        if let Some(node) = self.store.lookup(&self.cluster, slot) {
            return self.dispatch(Some(node), None, false);
        }
        if self.bootstraps == 0 {
            debug!(cluster = %self.cluster, slot, "slot not covered, refreshing topology");
            return self.bootstrap();
        }
        self.fail(Error::SlotNotCovered { slot })
    }

    fn bootstrap(&mut self) -> Action {
        let mut candidates = self.store.nodes(&self.cluster);
        for seed in &self.config.seed_nodes {
            if !candidates.iter().any(|node| node.as_ref() == seed.as_str()) {
                candidates.push(Arc::from(seed.as_str()));
            }
        }
        // Popped from the back.
        candidates.reverse();
        self.candidates = candidates;

        match self.candidates.pop() {
            Some(node) => self.bootstrap_from(node),
            None => self.fail(Error::NoSeedNode {
                cluster: self.cluster.clone(),
            }),
        }
    }

    fn bootstrap_from(&mut self, node: Arc<str>) -> Action {
        debug!(cluster = %self.cluster, node = %node, "bootstrapping topology");
        self.state = State::Bootstrapping;
        self.node = Some(node.clone());
        Action::Bootstrap {
            node,
            payload: cluster_nodes().encode(),
        }
    }

    fn dispatch(
        &mut self,
        node: Option<Arc<str>>,
        delay: Option<Duration>,
        asking: bool,
    ) -> Action {
        let payload = match self.request.as_ref() {
            Some(request) if asking => with_asking(request.bytes()),
            Some(request) => request.bytes().clone(),
            None => return self.fail(Error::EmptyCommand),
        };

        debug!(
            cluster = %self.cluster,
            node = ?node,
            asking,
            attempt = self.redirects,
            "dispatching request"
        );
        self.state = State::Dispatching;
        self.node = node.clone();
        self.asking = asking;
        self.asking_ack = asking;
        Action::Dispatch {
            node,
            payload,
            delay,
        }
    }

    /// Returns the failure action once the retry ceiling is exceeded.
    fn count_redirect(&mut self) -> Option<Action> {
        self.redirects += 1;
        if self.redirects > self.config.max_redirects {
            warn!(cluster = %self.cluster, redirects = self.redirects, "too many redirections");
            return Some(self.fail(Error::RetryExhausted {
                attempts: self.redirects,
            }));
        }
        None
    }

    /// Fails the request and gives up on the backend connection.
    fn backend_broken(&mut self, e: Error) -> Action {
        let node = self.node.as_deref().unwrap_or("?");
        warn!(cluster = %self.cluster, node, error = %e, "backend stream unreadable");
        let error = Error::Protocol {
            message: format!("backend {} sent {}", node, e),
        };
        let reply = error.to_reply();
        self.error = Some(error);
        self.state = State::Failed;
        Action::DropBackend(reply)
    }

    fn unexpected(&mut self, state: State, call: &str) -> Action {
        self.fail(Error::Protocol {
            message: format!("{} called in state {:?}", call, state),
        })
    }

    fn fail(&mut self, e: Error) -> Action {
        self.error = Some(e);
        self.respond_error()
    }

    fn respond_error(&mut self) -> Action {
        self.state = State::Failed;
        match &self.error {
            Some(e) => Action::from_error(e),
            None => Action::Close,
        }
    }
}
