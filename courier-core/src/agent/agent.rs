use std::sync::Arc;

use rst_common::standard::chrono::{Duration as ChronoDuration, Utc};
use rst_common::with_logging::log::{debug, info, warn};
use rst_common::with_tokio::tokio;
use rst_common::with_tokio::tokio::sync::mpsc::UnboundedReceiver;
use rst_common::with_tokio::tokio::task::JoinHandle;

use crate::connection::{
    Connection, ConnectionID, Invitation, RepoBuilder as ConnectionRepoBuilder,
    Role as ConnectionRole, State as ConnectionState, Usecase as ConnectionUsecase,
    UsecaseBuilder as ConnectionUsecaseBuilder,
};
use crate::credential::{
    CredentialExchange, ExchangeID, OfferConfig, ProposalConfig,
    RepoBuilder as CredentialRepoBuilder, State as ExchangeState, Usecase as CredentialUsecase,
    UsecaseBuilder as CredentialUsecaseBuilder, REASON_EXCHANGE_EXPIRED,
};
use crate::events::{EventBus, EventHandler, EventType};
use crate::identity::Identity;
use crate::ledger::{CredentialDefinition, CredentialDefinitionConfig, LedgerBuilder, Schema, SchemaConfig};
use crate::message::{Envelope, Message, MessageError, ThreadID};
use crate::transport::TransportBuilder;
use crate::wallet::WalletBuilder;

use super::locks::{ProcessedMessages, ThreadLocks};
use super::types::{AgentConfig, AgentError};

struct Inner<TConnectionRepo, TExchangeRepo, TTransport, TWallet, TLedger>
where
    TConnectionRepo: ConnectionRepoBuilder,
    TExchangeRepo: CredentialRepoBuilder,
    TTransport: TransportBuilder,
    TWallet: WalletBuilder,
    TLedger: LedgerBuilder,
{
    identity: Identity,
    config: AgentConfig,
    events: EventBus,
    connection_repo: TConnectionRepo,
    exchange_repo: TExchangeRepo,
    ledger: TLedger,
    connections: ConnectionUsecase<TConnectionRepo, TTransport, TWallet>,
    credentials: CredentialUsecase<TExchangeRepo, TConnectionRepo, TTransport, TWallet, TLedger>,
    locks: ThreadLocks,
    processed: ProcessedMessages,
}

/// `Agent` drives both protocols for a single identity
///
/// Inbound envelopes go through [`Agent::receive`], which serializes them per thread, drops
/// envelopes it already applied and routes the rest to the matching protocol handler.
/// Local actions starting a protocol lock their freshly generated thread the same way, so
/// an answer arriving early waits until the initiating record has been saved.
///
/// Cloning an agent is cheap, all clones share the same state
pub struct Agent<TConnectionRepo, TExchangeRepo, TTransport, TWallet, TLedger>
where
    TConnectionRepo: ConnectionRepoBuilder,
    TExchangeRepo: CredentialRepoBuilder,
    TTransport: TransportBuilder,
    TWallet: WalletBuilder,
    TLedger: LedgerBuilder,
{
    inner: Arc<Inner<TConnectionRepo, TExchangeRepo, TTransport, TWallet, TLedger>>,
}

impl<TConnectionRepo, TExchangeRepo, TTransport, TWallet, TLedger> Clone
    for Agent<TConnectionRepo, TExchangeRepo, TTransport, TWallet, TLedger>
where
    TConnectionRepo: ConnectionRepoBuilder,
    TExchangeRepo: CredentialRepoBuilder,
    TTransport: TransportBuilder,
    TWallet: WalletBuilder,
    TLedger: LedgerBuilder,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<TConnectionRepo, TExchangeRepo, TTransport, TWallet, TLedger>
    Agent<TConnectionRepo, TExchangeRepo, TTransport, TWallet, TLedger>
where
    TConnectionRepo: ConnectionRepoBuilder + Clone + 'static,
    TExchangeRepo: CredentialRepoBuilder + Clone + 'static,
    TTransport: TransportBuilder + Clone + 'static,
    TWallet: WalletBuilder + Clone + 'static,
    TLedger: LedgerBuilder + Clone + 'static,
{
    /// `new` generates the agent identity from the wallet key and starts its event bus,
    /// it must be called from within a tokio runtime
    pub fn new(
        config: AgentConfig,
        connection_repo: TConnectionRepo,
        exchange_repo: TExchangeRepo,
        transport: TTransport,
        wallet: TWallet,
        ledger: TLedger,
    ) -> Result<Self, AgentError> {
        let identity = Identity::generate(config.label.clone(), wallet.public_key())?;
        let events = EventBus::new();

        let connections = ConnectionUsecase::new(
            connection_repo.clone(),
            transport.clone(),
            wallet.clone(),
            events.clone(),
            identity.clone(),
            config.endpoint.clone(),
        )
        .with_auto_accept(config.auto_accept_connections);

        let credentials = CredentialUsecase::new(
            exchange_repo.clone(),
            connection_repo.clone(),
            transport,
            wallet,
            ledger.clone(),
            events.clone(),
            identity.get_verkey(),
        )
        .with_policy(config.credential_policy.clone());

        info!(
            "[agent:new] {} | did: {} | endpoint: {}",
            identity.get_label(),
            identity.get_did(),
            config.endpoint
        );

        Ok(Self {
            inner: Arc::new(Inner {
                identity,
                config,
                events,
                connection_repo,
                exchange_repo,
                ledger,
                connections,
                credentials,
                locks: ThreadLocks::default(),
                processed: ProcessedMessages::default(),
            }),
        })
    }

    pub fn get_identity(&self) -> &Identity {
        &self.inner.identity
    }

    pub fn get_config(&self) -> &AgentConfig {
        &self.inner.config
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn on<H>(&self, event_type: EventType, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.inner.events.on(event_type, handler)
    }

    pub async fn create_invitation(&self) -> Result<Invitation, AgentError> {
        let (invitation, _) = self.inner.connections.create_invitation().await?;
        Ok(invitation)
    }

    pub async fn receive_invitation(
        &self,
        invitation: Invitation,
    ) -> Result<Connection, AgentError> {
        let _guard = self.inner.locks.acquire(&invitation.get_thread_id()).await;
        let connection = self.inner.connections.receive_invitation(invitation).await?;
        Ok(connection)
    }

    pub async fn accept_connection(&self, id: ConnectionID) -> Result<Connection, AgentError> {
        let thread_id = self.connection_thread_of(id.clone()).await?;
        let _guard = self.inner.locks.acquire(&thread_id).await;
        let connection = self.inner.connections.accept_request(id).await?;
        Ok(connection)
    }

    pub async fn abandon_connection(
        &self,
        id: ConnectionID,
        reason: String,
    ) -> Result<Connection, AgentError> {
        let thread_id = self.connection_thread_of(id.clone()).await?;
        let _guard = self.inner.locks.acquire(&thread_id).await;
        let connection = self.inner.connections.abandon(id, reason).await?;
        Ok(connection)
    }

    pub async fn get_connection(&self, id: ConnectionID) -> Result<Connection, AgentError> {
        let connection = self.inner.connections.get_connection(id).await?;
        Ok(connection)
    }

    pub async fn list_connections(
        &self,
        state: Option<ConnectionState>,
    ) -> Result<Vec<Connection>, AgentError> {
        let connections = self.inner.connections.list_connections(state).await?;
        Ok(connections)
    }

    pub async fn register_schema(&self, config: SchemaConfig) -> Result<Schema, AgentError> {
        config.validate()?;

        let schema = self
            .inner
            .ledger
            .register_schema(self.inner.identity.get_did(), config)
            .await?;

        info!("[agent:register_schema] schema: {}", schema.id);
        Ok(schema)
    }

    pub async fn register_credential_definition(
        &self,
        config: CredentialDefinitionConfig,
    ) -> Result<CredentialDefinition, AgentError> {
        let definition = self
            .inner
            .ledger
            .register_credential_definition(
                self.inner.identity.get_did(),
                self.inner.identity.get_verkey(),
                config,
            )
            .await?;

        info!(
            "[agent:register_credential_definition] credential definition: {}",
            definition.id
        );
        Ok(definition)
    }

    pub async fn propose_credential(
        &self,
        connection_id: ConnectionID,
        config: ProposalConfig,
    ) -> Result<CredentialExchange, AgentError> {
        let thread_id = ThreadID::generate();
        let _guard = self.inner.locks.acquire(&thread_id).await;

        let exchange = self
            .inner
            .credentials
            .propose_credential(thread_id, connection_id, config)
            .await?;
        Ok(exchange)
    }

    pub async fn offer_credential(
        &self,
        connection_id: ConnectionID,
        config: OfferConfig,
    ) -> Result<CredentialExchange, AgentError> {
        let thread_id = ThreadID::generate();
        let _guard = self.inner.locks.acquire(&thread_id).await;

        let exchange = self
            .inner
            .credentials
            .offer_credential(thread_id, connection_id, config)
            .await?;
        Ok(exchange)
    }

    pub async fn accept_proposal(&self, id: ExchangeID) -> Result<CredentialExchange, AgentError> {
        let thread_id = self.exchange_thread_of(id.clone()).await?;
        let _guard = self.inner.locks.acquire(&thread_id).await;
        let exchange = self.inner.credentials.accept_proposal(id).await?;
        Ok(exchange)
    }

    pub async fn accept_offer(&self, id: ExchangeID) -> Result<CredentialExchange, AgentError> {
        let thread_id = self.exchange_thread_of(id.clone()).await?;
        let _guard = self.inner.locks.acquire(&thread_id).await;
        let exchange = self.inner.credentials.accept_offer(id).await?;
        Ok(exchange)
    }

    pub async fn accept_request(&self, id: ExchangeID) -> Result<CredentialExchange, AgentError> {
        let thread_id = self.exchange_thread_of(id.clone()).await?;
        let _guard = self.inner.locks.acquire(&thread_id).await;
        let exchange = self.inner.credentials.accept_request(id).await?;
        Ok(exchange)
    }

    pub async fn abandon_credential(
        &self,
        id: ExchangeID,
        reason: String,
    ) -> Result<CredentialExchange, AgentError> {
        let thread_id = self.exchange_thread_of(id.clone()).await?;
        let _guard = self.inner.locks.acquire(&thread_id).await;
        let exchange = self.inner.credentials.abandon(id, reason).await?;
        Ok(exchange)
    }

    /// `abandon_expired` abandons exchanges idle for longer than the configured expiry.
    /// Nothing expires when no expiry is configured
    pub async fn abandon_expired(&self) -> Result<Vec<CredentialExchange>, AgentError> {
        let expiry = match self.inner.config.credential_expiry {
            Some(expiry) => expiry,
            None => return Ok(Vec::new()),
        };

        let max_idle = ChronoDuration::from_std(expiry)
            .map_err(|err| AgentError::ConfigError(err.to_string()))?;

        let deadline = Utc::now() - max_idle;
        let candidates = self.inner.exchange_repo.list_exchanges(None).await?;

        let mut abandoned = Vec::new();
        for candidate in candidates
            .into_iter()
            .filter(|exchange| exchange.is_idle_since(deadline))
        {
            let _guard = self.inner.locks.acquire(&candidate.get_thread_id()).await;

            let current = self.inner.exchange_repo.get_exchange(candidate.get_id()).await?;
            if !current.is_idle_since(deadline) {
                continue;
            }

            match self
                .inner
                .credentials
                .abandon(current.get_id(), REASON_EXCHANGE_EXPIRED.to_string())
                .await
            {
                Ok(exchange) => abandoned.push(exchange),
                Err(err) => warn!(
                    "[agent:abandon_expired] exchange: {} | {}",
                    current.get_id(),
                    err
                ),
            }
        }

        Ok(abandoned)
    }

    pub async fn get_exchange(&self, id: ExchangeID) -> Result<CredentialExchange, AgentError> {
        let exchange = self.inner.credentials.get_exchange(id).await?;
        Ok(exchange)
    }

    pub async fn list_exchanges(
        &self,
        state: Option<ExchangeState>,
    ) -> Result<Vec<CredentialExchange>, AgentError> {
        let exchanges = self.inner.credentials.list_exchanges(state).await?;
        Ok(exchanges)
    }

    /// `receive` applies one inbound envelope
    ///
    /// An envelope already applied is ignored. An envelope is only remembered as applied
    /// when its handler succeeded, a failed one can be delivered again
    pub async fn receive(&self, envelope: Envelope) -> Result<(), AgentError> {
        let thread_id = envelope.get_thread_id();
        let _guard = self.inner.locks.acquire(&thread_id).await;

        if self.inner.processed.contains(envelope.get_id()).await {
            debug!(
                "[agent:receive] duplicate message: {} | thread: {}",
                envelope.get_id(),
                thread_id
            );
            return Ok(());
        }

        let message = envelope.message().map_err(|err| match err {
            MessageError::UnknownType(message_type) => {
                AgentError::UnroutableMessage(format!("unknown message type: {}", message_type))
            }
            other => AgentError::MessageError(other.to_string()),
        })?;

        debug!(
            "[agent:receive] {} | message: {} | thread: {}",
            envelope.get_type(),
            envelope.get_id(),
            thread_id
        );

        self.route(&envelope, message).await?;
        self.inner.processed.insert(envelope.get_id().clone()).await;
        Ok(())
    }

    /// `listen` applies envelopes from the given channel until it closes. Each envelope is
    /// handled on its own task, failures are logged
    pub fn listen(&self, mut inbound: UnboundedReceiver<Envelope>) -> JoinHandle<()> {
        let agent = self.clone();

        tokio::spawn(async move {
            while let Some(envelope) = inbound.recv().await {
                let worker = agent.clone();
                tokio::spawn(async move {
                    let message_id = envelope.get_id().clone();
                    let message_type = envelope.get_type().to_string();

                    if let Err(err) = worker.receive(envelope).await {
                        warn!(
                            "[agent:listen] {} rejected {} ({}): {}",
                            worker.inner.identity.get_label(),
                            message_id,
                            message_type,
                            err
                        );
                    }
                });
            }

            debug!(
                "[agent:listen] {} inbound channel closed",
                agent.inner.identity.get_label()
            );
        })
    }

    async fn route(&self, envelope: &Envelope, message: Message) -> Result<(), AgentError> {
        let connections = &self.inner.connections;
        let credentials = &self.inner.credentials;

        match message {
            Message::ConnectionRequest(request) => {
                connections
                    .handle_request(envelope.clone(), request)
                    .await?;
            }
            Message::ConnectionResponse(response) => {
                self.connection_on_thread(envelope).await?;
                connections
                    .handle_response(envelope.clone(), response)
                    .await?;
            }
            Message::ConnectionAck(ack) => {
                self.connection_on_thread(envelope).await?;
                connections.handle_ack(envelope.clone(), ack).await?;
            }
            Message::CredentialProposal(proposal) => {
                let connection = self.connection_of_sender(envelope).await?;
                credentials
                    .handle_proposal(envelope.clone(), connection.get_id(), proposal)
                    .await?;
            }
            Message::CredentialOffer(offer) => {
                let connection = self.connection_of_sender(envelope).await?;
                credentials
                    .handle_offer(envelope.clone(), connection.get_id(), offer)
                    .await?;
            }
            Message::CredentialRequest(request) => {
                if self.find_exchange(envelope).await?.is_some() {
                    self.exchange_on_thread(envelope).await?;
                }

                credentials
                    .handle_request(envelope.clone(), request)
                    .await?;
            }
            Message::CredentialIssue(issue) => {
                self.exchange_on_thread(envelope).await?;
                credentials
                    .handle_credential(envelope.clone(), issue)
                    .await?;
            }
            Message::CredentialAck(ack) => {
                self.exchange_on_thread(envelope).await?;
                credentials.handle_ack(envelope.clone(), ack).await?;
            }
            Message::ProblemReport(report) => {
                let thread_id = envelope.get_thread_id();
                let connection = self
                    .inner
                    .connection_repo
                    .find_by_thread(thread_id.clone())
                    .await?;

                if connection.is_some() {
                    self.connection_on_thread(envelope).await?;
                    connections
                        .handle_problem_report(envelope.clone(), report)
                        .await?;
                } else if self.find_exchange(envelope).await?.is_some() {
                    self.exchange_on_thread(envelope).await?;
                    credentials
                        .handle_problem_report(envelope.clone(), report)
                        .await?;
                } else {
                    return Err(AgentError::UnroutableMessage(format!(
                        "no record on thread {}",
                        thread_id
                    )));
                }
            }
        }

        Ok(())
    }

    fn check_sender(envelope: &Envelope, peer_key: Option<String>) -> Result<(), AgentError> {
        match peer_key {
            Some(key) if key == envelope.get_sender_key() => Ok(()),
            _ => Err(AgentError::UnroutableMessage(format!(
                "sender {} is not the peer on thread {}",
                envelope.get_sender_key(),
                envelope.get_thread_id()
            ))),
        }
    }

    async fn connection_on_thread(&self, envelope: &Envelope) -> Result<Connection, AgentError> {
        let connection = self
            .inner
            .connection_repo
            .find_by_thread(envelope.get_thread_id())
            .await?
            .ok_or_else(|| {
                AgentError::UnroutableMessage(format!(
                    "no connection on thread {}",
                    envelope.get_thread_id()
                ))
            })?;

        Self::check_sender(envelope, connection.get_peer_key())?;
        Ok(connection)
    }

    async fn find_exchange(
        &self,
        envelope: &Envelope,
    ) -> Result<Option<CredentialExchange>, AgentError> {
        let exchange = self
            .inner
            .exchange_repo
            .find_by_thread(envelope.get_thread_id())
            .await?;
        Ok(exchange)
    }

    async fn exchange_on_thread(&self, envelope: &Envelope) -> Result<CredentialExchange, AgentError> {
        let exchange = self.find_exchange(envelope).await?.ok_or_else(|| {
            AgentError::UnroutableMessage(format!(
                "no credential exchange on thread {}",
                envelope.get_thread_id()
            ))
        })?;

        let connection = self
            .inner
            .connection_repo
            .get_connection(exchange.get_connection_id())
            .await?;

        Self::check_sender(envelope, connection.get_peer_key())?;
        Ok(exchange)
    }

    /// `connection_of_sender` finds the most recent completed connection with the envelope sender
    ///
    /// An inviter waiting in `Responded` for the ack of that sender completes first, the
    /// sender only starts a credential exchange once its side of the connection is complete
    async fn connection_of_sender(&self, envelope: &Envelope) -> Result<Connection, AgentError> {
        let connections = self
            .inner
            .connection_repo
            .find_by_peer_key(envelope.get_sender_key().to_string())
            .await?;

        let ready = connections
            .iter()
            .filter(|connection| connection.is_ready())
            .max_by_key(|connection| connection.get_updated_at())
            .cloned();

        if let Some(connection) = ready {
            return Ok(connection);
        }

        let awaiting_ack = connections
            .into_iter()
            .filter(|connection| {
                connection.get_role() == ConnectionRole::Inviter
                    && connection.get_state() == ConnectionState::Responded
            })
            .max_by_key(|connection| connection.get_updated_at())
            .ok_or_else(|| {
                AgentError::UnroutableMessage(format!(
                    "no completed connection with {}",
                    envelope.get_sender_key()
                ))
            })?;

        debug!(
            "[agent:connection_of_sender] {} used connection {} before its ack",
            envelope.get_sender_key(),
            awaiting_ack.get_id()
        );

        let _guard = self.inner.locks.acquire(&awaiting_ack.get_thread_id()).await;
        let connection = self
            .inner
            .connections
            .complete_on_activity(awaiting_ack.get_id())
            .await?;
        Ok(connection)
    }

    async fn connection_thread_of(&self, id: ConnectionID) -> Result<ThreadID, AgentError> {
        let connection = self.inner.connection_repo.get_connection(id).await?;
        Ok(connection.get_thread_id())
    }

    async fn exchange_thread_of(&self, id: ExchangeID) -> Result<ThreadID, AgentError> {
        let exchange = self.inner.exchange_repo.get_exchange(id).await?;
        Ok(exchange.get_thread_id())
    }
}
