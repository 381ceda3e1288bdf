use rst_common::with_logging::log::info;
use rst_common::with_tokio::tokio::sync::mpsc::UnboundedReceiver;
use rst_common::with_tokio::tokio::task::JoinHandle;

use prople_courier_core::agent::{Agent, AgentConfig};
use prople_courier_core::message::Envelope;

use crate::apps::{
    ConnectionRepository, ExchangeRepository, HttpTransport, KeyWallet, MemoryLedger,
    MemoryTransport, NodeTransport, Store,
};
use crate::common::types::CommonError;
use crate::config::TransportKind;

pub type NodeAgent =
    Agent<ConnectionRepository, ExchangeRepository, NodeTransport, KeyWallet, MemoryLedger>;

/// `Node` is a running agent together with the wallet it signs with
pub struct Node {
    agent: NodeAgent,
    wallet: KeyWallet,
    listener: Option<JoinHandle<()>>,
    server: Option<JoinHandle<()>>,
}

impl Node {
    pub fn agent(&self) -> &NodeAgent {
        &self.agent
    }

    pub fn wallet(&self) -> &KeyWallet {
        &self.wallet
    }

    /// `shutdown` stops the inbound loop and the HTTP listener, the records stay readable
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }

        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.shutdown()
    }
}

/// `AgentBuilder` assembles agents sharing one ledger and one transport
#[derive(Clone, Default)]
pub struct AgentBuilder {
    ledger: MemoryLedger,
    transport: NodeTransport,
}

impl AgentBuilder {
    pub fn new(ledger: MemoryLedger, transport: NodeTransport) -> Self {
        Self { ledger, transport }
    }

    pub fn from_kind(ledger: MemoryLedger, kind: TransportKind) -> Self {
        let transport = match kind {
            TransportKind::Memory => NodeTransport::Memory(MemoryTransport::new()),
            TransportKind::Http => NodeTransport::Http(HttpTransport::new()),
        };

        Self::new(ledger, transport)
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub fn transport(&self) -> &NodeTransport {
        &self.transport
    }

    /// `build` opens the agent endpoint and starts applying inbound envelopes,
    /// records are kept in memory
    pub async fn build(&self, config: AgentConfig) -> Result<Node, CommonError> {
        self.build_stored(config, Store::new()).await
    }

    /// `build_stored` is [`AgentBuilder::build`] with connection and exchange records kept in `store`
    pub async fn build_stored(&self, config: AgentConfig, store: Store) -> Result<Node, CommonError> {
        let (mut node, inbound) = self.assemble(config, store).await?;
        node.listener = Some(node.agent.listen(inbound));
        Ok(node)
    }

    /// `build_detached` opens the agent endpoint but leaves the inbound channel to the
    /// caller, envelopes are only applied when passed to [`Agent::receive`]
    pub async fn build_detached(
        &self,
        config: AgentConfig,
    ) -> Result<(Node, UnboundedReceiver<Envelope>), CommonError> {
        self.assemble(config, Store::new()).await
    }

    async fn assemble(
        &self,
        mut config: AgentConfig,
        store: Store,
    ) -> Result<(Node, UnboundedReceiver<Envelope>), CommonError> {
        let (endpoint, inbound, server) = self
            .transport
            .register(config.endpoint.clone())
            .await
            .map_err(|err| CommonError::AgentError(err.to_string()))?;

        config.endpoint = endpoint.clone();
        let wallet = KeyWallet::generate();

        let agent = Agent::new(
            config,
            ConnectionRepository::new(store.clone()),
            ExchangeRepository::new(store),
            self.transport.clone(),
            wallet.clone(),
            self.ledger.clone(),
        );

        let agent = match agent {
            Ok(agent) => agent,
            Err(err) => {
                if let Some(server) = server {
                    server.abort();
                }
                return Err(CommonError::AgentError(err.to_string()));
            }
        };

        info!(
            "[builder:build] agent {} registered at {}",
            agent.get_identity().get_label(),
            endpoint
        );

        Ok((
            Node {
                agent,
                wallet,
                listener: None,
                server,
            },
            inbound,
        ))
    }
}
