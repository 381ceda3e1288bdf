use multiaddr::Multiaddr;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::{Duration, Utc};
use rst_common::standard::uuid::Uuid;
use rst_common::with_logging::log::{debug, info, warn};

use crate::connection::{Connection, ConnectionError, ConnectionID, RepoBuilder as ConnectionRepoBuilder};
use crate::events::{Event, EventBus};
use crate::ledger::{CredentialDefinition, LedgerBuilder};
use crate::message::{
    CredentialAck, CredentialIssue, CredentialOffer, CredentialProposal, CredentialRequest,
    Envelope, Message, ProblemReport, ThreadID,
};
use crate::transport::TransportBuilder;
use crate::wallet::WalletBuilder;

use super::exchange::CredentialExchange;
use super::issued::IssuedCredential;
use super::preview::CredentialPreview;
use super::types::{
    AutoAcceptPolicy, CredentialError, ExchangeID, OfferConfig, ProposalConfig, RepoBuilder, Role,
    State, UsecaseBuilder,
};

pub const PROBLEM_EXCHANGE_ABANDONED: &str = "issuance_abandoned";
pub const REASON_EXCHANGE_EXPIRED: &str = "exchange expired";

/// `Usecase` implements both sides of the issue-credential protocol
///
/// The connection repository is only read, to make sure a peer finished its handshake
/// and to find where to send the next message. The [`AutoAcceptPolicy`] is evaluated once
/// per incoming proposal, offer and request. A failed automatic answer is logged and leaves
/// the record waiting for a manual `accept_*` call
pub struct Usecase<TRepo, TConnectionRepo, TTransport, TWallet, TLedger>
where
    TRepo: RepoBuilder,
    TConnectionRepo: ConnectionRepoBuilder,
    TTransport: TransportBuilder,
    TWallet: WalletBuilder,
    TLedger: LedgerBuilder,
{
    repo: TRepo,
    connections: TConnectionRepo,
    transport: TTransport,
    wallet: TWallet,
    ledger: TLedger,
    events: EventBus,
    sender_key: String,
    policy: AutoAcceptPolicy,
}

impl<TRepo, TConnectionRepo, TTransport, TWallet, TLedger>
    Usecase<TRepo, TConnectionRepo, TTransport, TWallet, TLedger>
where
    TRepo: RepoBuilder,
    TConnectionRepo: ConnectionRepoBuilder,
    TTransport: TransportBuilder,
    TWallet: WalletBuilder,
    TLedger: LedgerBuilder,
{
    pub fn new(
        repo: TRepo,
        connections: TConnectionRepo,
        transport: TTransport,
        wallet: TWallet,
        ledger: TLedger,
        events: EventBus,
        sender_key: String,
    ) -> Self {
        Self {
            repo,
            connections,
            transport,
            wallet,
            ledger,
            events,
            sender_key,
            policy: AutoAcceptPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AutoAcceptPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn generate_nonce() -> String {
        Uuid::new_v4().simple().to_string()
    }

    async fn send(
        &self,
        endpoint: Multiaddr,
        thread_id: ThreadID,
        message: Message,
    ) -> Result<(), CredentialError> {
        let envelope = Envelope::pack(thread_id, self.sender_key.clone(), &message)
            .map_err(|err| CredentialError::MessageError(err.to_string()))?;

        debug!(
            "[credential:send] {} -> {} | thread: {}",
            envelope.get_type(),
            endpoint,
            envelope.get_thread_id()
        );

        self.transport
            .send(endpoint, envelope)
            .await
            .map_err(|err| CredentialError::TransportError(err.to_string()))
    }

    async fn commit(
        &self,
        previous: Option<State>,
        exchange: CredentialExchange,
    ) -> Result<CredentialExchange, CredentialError> {
        self.repo.save(exchange.clone()).await?;

        info!(
            "[credential:commit] exchange: {} | {:?} {:?} -> {:?}",
            exchange.get_id(),
            exchange.get_role(),
            previous,
            exchange.get_state()
        );

        self.events.emit(Event::credential(previous, &exchange));
        Ok(exchange)
    }

    async fn abandon_with(
        &self,
        mut exchange: CredentialExchange,
        reason: String,
    ) -> Result<CredentialExchange, CredentialError> {
        let previous = exchange.transition(State::Abandoned)?;
        exchange.set_error_message(reason);
        self.commit(Some(previous), exchange).await
    }

    async fn find_thread(&self, thread_id: ThreadID) -> Result<CredentialExchange, CredentialError> {
        self.repo
            .find_by_thread(thread_id.clone())
            .await?
            .ok_or_else(|| CredentialError::ExchangeNotFound(format!("thread: {}", thread_id)))
    }

    async fn ready_connection(&self, id: ConnectionID) -> Result<Connection, CredentialError> {
        let connection = self
            .connections
            .get_connection(id.clone())
            .await
            .map_err(|err| match err {
                ConnectionError::ConnectionNotFound(msg) => CredentialError::ConnectionNotReady(msg),
                other => CredentialError::RepoError(other.to_string()),
            })?;

        if !connection.is_ready() {
            return Err(CredentialError::ConnectionNotReady(format!(
                "connection {} is {:?}",
                id,
                connection.get_state()
            )));
        }

        Ok(connection)
    }

    fn peer_endpoint(connection: &Connection) -> Result<Multiaddr, CredentialError> {
        connection.get_peer_endpoint().ok_or_else(|| {
            CredentialError::ConnectionNotReady(format!(
                "connection {} has no peer endpoint",
                connection.get_id()
            ))
        })
    }

    async fn endpoint_for(&self, exchange: &CredentialExchange) -> Result<Multiaddr, CredentialError> {
        let connection = self.ready_connection(exchange.get_connection_id()).await?;
        Self::peer_endpoint(&connection)
    }

    async fn resolve_definition(&self, id: String) -> Result<CredentialDefinition, CredentialError> {
        self.ledger
            .resolve_credential_definition(id)
            .await
            .map_err(|err| CredentialError::LedgerError(err.to_string()))
    }

    /// `prepare_offer` makes sure this agent can actually issue the previewed credential
    async fn prepare_offer(
        &self,
        credential_definition_id: String,
        preview: &CredentialPreview,
    ) -> Result<(), CredentialError> {
        preview.validate()?;

        let definition = self.resolve_definition(credential_definition_id).await?;
        if definition.public_key != self.sender_key {
            return Err(CredentialError::ValidationError(format!(
                "credential definition {} belongs to another issuer",
                definition.id
            )));
        }

        let schema = self
            .ledger
            .get_schema(definition.schema_id.clone())
            .await
            .map_err(|err| CredentialError::LedgerError(err.to_string()))?;

        preview.validate_schema(&schema)
    }

    fn build_offer(exchange: &CredentialExchange) -> Result<CredentialOffer, CredentialError> {
        let nonce = exchange
            .get_nonce()
            .ok_or_else(|| CredentialError::InvalidState("offer without nonce".to_string()))?;

        Ok(CredentialOffer {
            credential_definition_id: exchange.get_credential_definition_id(),
            preview: exchange.get_preview().clone(),
            nonce,
            comment: exchange.get_comment(),
        })
    }

    async fn offer_proposal(
        &self,
        mut exchange: CredentialExchange,
    ) -> Result<CredentialExchange, CredentialError> {
        self.prepare_offer(
            exchange.get_credential_definition_id(),
            exchange.get_preview(),
        )
        .await?;

        let endpoint = self.endpoint_for(&exchange).await?;
        exchange.set_nonce(Self::generate_nonce());

        let offer = Self::build_offer(&exchange)?;
        let previous = exchange.transition(State::OfferSent)?;
        self.send(endpoint, exchange.get_thread_id(), Message::CredentialOffer(offer))
            .await?;

        self.commit(Some(previous), exchange).await
    }

    async fn request_credential(
        &self,
        mut exchange: CredentialExchange,
    ) -> Result<CredentialExchange, CredentialError> {
        let endpoint = self.endpoint_for(&exchange).await?;
        let definition = self
            .resolve_definition(exchange.get_credential_definition_id())
            .await?;

        let nonce = exchange
            .get_nonce()
            .ok_or_else(|| CredentialError::InvalidState("offer without nonce".to_string()))?;

        let commitment = self
            .wallet
            .create_link_secret_commitment(definition, nonce.clone())
            .await
            .map_err(|err| CredentialError::WalletError(err.to_string()))?;

        exchange.set_link_secret_commitment(commitment.clone());
        let request = CredentialRequest {
            credential_definition_id: exchange.get_credential_definition_id(),
            preview: exchange.get_preview().clone(),
            link_secret_commitment: commitment,
            nonce,
        };

        let previous = exchange.transition(State::RequestSent)?;
        self.send(
            endpoint,
            exchange.get_thread_id(),
            Message::CredentialRequest(request),
        )
        .await?;

        self.commit(Some(previous), exchange).await
    }

    async fn issue(
        &self,
        mut exchange: CredentialExchange,
    ) -> Result<CredentialExchange, CredentialError> {
        let endpoint = self.endpoint_for(&exchange).await?;
        let definition = self
            .resolve_definition(exchange.get_credential_definition_id())
            .await?;

        let commitment = exchange.get_link_secret_commitment().ok_or_else(|| {
            CredentialError::InvalidState("request without link secret commitment".to_string())
        })?;

        let credential = self
            .wallet
            .issue_credential(definition, exchange.get_preview().clone(), commitment)
            .await
            .map_err(|err| CredentialError::WalletError(err.to_string()))?;

        let previous = exchange.transition(State::CredentialIssued)?;
        self.send(
            endpoint,
            exchange.get_thread_id(),
            Message::CredentialIssue(CredentialIssue { credential }),
        )
        .await?;

        self.commit(Some(previous), exchange).await
    }

    /// `compare_request` returns why a request does not answer the outstanding offer, if it doesn't
    fn compare_request(
        exchange: &CredentialExchange,
        request: &CredentialRequest,
    ) -> Result<Option<String>, CredentialError> {
        if request.credential_definition_id != exchange.get_credential_definition_id() {
            return Ok(Some(format!(
                "requested credential definition {} was not offered",
                request.credential_definition_id
            )));
        }

        if !request.preview.matches(exchange.get_preview())? {
            return Ok(Some("requested attributes differ from the offer".to_string()));
        }

        if exchange.get_nonce().as_deref() != Some(request.nonce.as_str()) {
            return Ok(Some("request nonce does not match the offer".to_string()));
        }

        Ok(None)
    }

    async fn verify_issued(
        &self,
        exchange: &CredentialExchange,
        definition: CredentialDefinition,
        credential: &IssuedCredential,
    ) -> Result<bool, CredentialError> {
        let requested = credential.get_credential_definition_id()
            == exchange.get_credential_definition_id()
            && credential.get_schema_id() == definition.schema_id
            && credential.get_values().matches(exchange.get_preview())?
            && exchange.get_link_secret_commitment()
                == Some(credential.get_link_secret_commitment());

        if !requested {
            return Ok(false);
        }

        match self
            .wallet
            .verify_credential(definition, credential.clone())
            .await
        {
            Ok(valid) => Ok(valid),
            Err(err) => {
                warn!("[credential:verify_issued] unable to verify: {}", err);
                Ok(false)
            }
        }
    }

    async fn auto_accept<F, Fut>(
        &self,
        exchange: CredentialExchange,
        accept: F,
    ) -> Result<CredentialExchange, CredentialError>
    where
        F: FnOnce(CredentialExchange) -> Fut + Send,
        Fut: std::future::Future<Output = Result<CredentialExchange, CredentialError>> + Send,
    {
        if !self.policy.approves(&exchange) {
            return Ok(exchange);
        }

        match accept(exchange.clone()).await {
            Ok(accepted) => Ok(accepted),
            Err(err) => {
                warn!(
                    "[credential:auto_accept] exchange: {} stays {:?}: {}",
                    exchange.get_id(),
                    exchange.get_state(),
                    err
                );
                Ok(exchange)
            }
        }
    }
}

#[async_trait]
impl<TRepo, TConnectionRepo, TTransport, TWallet, TLedger> UsecaseBuilder
    for Usecase<TRepo, TConnectionRepo, TTransport, TWallet, TLedger>
where
    TRepo: RepoBuilder,
    TConnectionRepo: ConnectionRepoBuilder,
    TTransport: TransportBuilder,
    TWallet: WalletBuilder,
    TLedger: LedgerBuilder,
{
    async fn propose_credential(
        &self,
        thread_id: ThreadID,
        connection_id: ConnectionID,
        config: ProposalConfig,
    ) -> Result<CredentialExchange, CredentialError> {
        let connection = self.ready_connection(connection_id).await?;
        config.preview.validate()?;

        let endpoint = Self::peer_endpoint(&connection)?;
        let mut exchange = CredentialExchange::new(
            Role::Holder,
            State::ProposalSent,
            connection.get_id(),
            thread_id,
            config.credential_definition_id.clone(),
            config.preview.clone(),
        );
        exchange.set_comment(config.comment.clone());

        let proposal = CredentialProposal {
            credential_definition_id: config.credential_definition_id,
            preview: config.preview,
            comment: config.comment,
        };

        self.send(
            endpoint,
            exchange.get_thread_id(),
            Message::CredentialProposal(proposal),
        )
        .await?;

        self.commit(None, exchange).await
    }

    async fn handle_proposal(
        &self,
        envelope: Envelope,
        connection_id: ConnectionID,
        proposal: CredentialProposal,
    ) -> Result<CredentialExchange, CredentialError> {
        let thread_id = envelope.get_thread_id();
        if self.repo.find_by_thread(thread_id.clone()).await?.is_some() {
            return Err(CredentialError::InvalidState(format!(
                "thread {} already has an exchange",
                thread_id
            )));
        }

        proposal.preview.validate()?;
        let connection = self.ready_connection(connection_id).await?;

        let mut exchange = CredentialExchange::new(
            Role::Issuer,
            State::ProposalReceived,
            connection.get_id(),
            thread_id,
            proposal.credential_definition_id,
            proposal.preview,
        );
        exchange.set_comment(proposal.comment);

        let exchange = self.commit(None, exchange).await?;
        self.auto_accept(exchange, |received| self.offer_proposal(received))
            .await
    }

    async fn accept_proposal(&self, id: ExchangeID) -> Result<CredentialExchange, CredentialError> {
        let exchange = self.repo.get_exchange(id).await?;
        exchange.expect(Role::Issuer, State::ProposalReceived)?;
        self.offer_proposal(exchange).await
    }

    async fn offer_credential(
        &self,
        thread_id: ThreadID,
        connection_id: ConnectionID,
        config: OfferConfig,
    ) -> Result<CredentialExchange, CredentialError> {
        let connection = self.ready_connection(connection_id).await?;
        self.prepare_offer(config.credential_definition_id.clone(), &config.preview)
            .await?;

        let endpoint = Self::peer_endpoint(&connection)?;
        let mut exchange = CredentialExchange::new(
            Role::Issuer,
            State::OfferSent,
            connection.get_id(),
            thread_id,
            config.credential_definition_id,
            config.preview,
        );
        exchange.set_comment(config.comment);
        exchange.set_nonce(Self::generate_nonce());

        let offer = Self::build_offer(&exchange)?;
        self.send(endpoint, exchange.get_thread_id(), Message::CredentialOffer(offer))
            .await?;

        self.commit(None, exchange).await
    }

    async fn handle_offer(
        &self,
        envelope: Envelope,
        connection_id: ConnectionID,
        offer: CredentialOffer,
    ) -> Result<CredentialExchange, CredentialError> {
        offer.preview.validate()?;

        let thread_id = envelope.get_thread_id();
        let (previous, exchange) = match self.repo.find_by_thread(thread_id.clone()).await? {
            Some(mut proposed) => {
                proposed.expect(Role::Holder, State::ProposalSent)?;
                if proposed.get_connection_id() != connection_id {
                    return Err(CredentialError::InvalidState(format!(
                        "thread {} belongs to another connection",
                        thread_id
                    )));
                }

                proposed.set_offer(offer.credential_definition_id, offer.preview, offer.nonce);
                proposed.set_comment(offer.comment);

                let previous = proposed.transition(State::OfferReceived)?;
                (Some(previous), proposed)
            }
            None => {
                let mut offered = CredentialExchange::new(
                    Role::Holder,
                    State::OfferReceived,
                    connection_id,
                    thread_id,
                    offer.credential_definition_id,
                    offer.preview,
                );
                offered.set_nonce(offer.nonce);
                offered.set_comment(offer.comment);
                (None, offered)
            }
        };

        let exchange = self.commit(previous, exchange).await?;
        self.auto_accept(exchange, |received| self.request_credential(received))
            .await
    }

    async fn accept_offer(&self, id: ExchangeID) -> Result<CredentialExchange, CredentialError> {
        let exchange = self.repo.get_exchange(id).await?;
        exchange.expect(Role::Holder, State::OfferReceived)?;
        self.request_credential(exchange).await
    }

    async fn handle_request(
        &self,
        envelope: Envelope,
        request: CredentialRequest,
    ) -> Result<CredentialExchange, CredentialError> {
        let thread_id = envelope.get_thread_id();
        let mut exchange = match self.repo.find_by_thread(thread_id.clone()).await? {
            Some(offered) if offered.expect(Role::Issuer, State::OfferSent).is_ok() => offered,
            Some(other) => {
                return Err(CredentialError::OfferMismatch(format!(
                    "exchange {} has no outstanding offer, it is {:?}/{:?}",
                    other.get_id(),
                    other.get_role(),
                    other.get_state()
                )))
            }
            None => {
                return Err(CredentialError::OfferMismatch(format!(
                    "no offer on thread {}",
                    thread_id
                )))
            }
        };

        if let Some(reason) = Self::compare_request(&exchange, &request)? {
            self.abandon_with(exchange, reason.clone()).await?;
            return Err(CredentialError::OfferMismatch(reason));
        }

        exchange.set_link_secret_commitment(request.link_secret_commitment);
        let previous = exchange.transition(State::RequestReceived)?;
        let exchange = self.commit(Some(previous), exchange).await?;

        self.auto_accept(exchange, |received| self.issue(received))
            .await
    }

    async fn accept_request(&self, id: ExchangeID) -> Result<CredentialExchange, CredentialError> {
        let exchange = self.repo.get_exchange(id).await?;
        exchange.expect(Role::Issuer, State::RequestReceived)?;
        self.issue(exchange).await
    }

    async fn handle_credential(
        &self,
        envelope: Envelope,
        issue: CredentialIssue,
    ) -> Result<CredentialExchange, CredentialError> {
        let mut exchange = self.find_thread(envelope.get_thread_id()).await?;
        exchange.expect(Role::Holder, State::RequestSent)?;

        let definition = self
            .resolve_definition(exchange.get_credential_definition_id())
            .await?;

        let credential = issue.credential;
        if !self.verify_issued(&exchange, definition, &credential).await? {
            let reason = format!(
                "credential {} does not verify against {}",
                credential.get_id(),
                exchange.get_credential_definition_id()
            );

            self.abandon_with(exchange, reason.clone()).await?;
            return Err(CredentialError::CredentialVerificationFailed(reason));
        }

        let endpoint = self.endpoint_for(&exchange).await?;
        let credential_id = self
            .wallet
            .store_credential(credential)
            .await
            .map_err(|err| CredentialError::WalletError(err.to_string()))?;

        exchange.set_credential_id(credential_id);
        let previous = exchange.transition(State::Done)?;
        self.send(
            endpoint,
            exchange.get_thread_id(),
            Message::CredentialAck(CredentialAck::default()),
        )
        .await?;

        self.commit(Some(previous), exchange).await
    }

    async fn handle_ack(
        &self,
        envelope: Envelope,
        _ack: CredentialAck,
    ) -> Result<CredentialExchange, CredentialError> {
        let mut exchange = self.find_thread(envelope.get_thread_id()).await?;
        exchange.expect(Role::Issuer, State::CredentialIssued)?;

        let previous = exchange.transition(State::Done)?;
        self.commit(Some(previous), exchange).await
    }

    async fn handle_problem_report(
        &self,
        envelope: Envelope,
        report: ProblemReport,
    ) -> Result<CredentialExchange, CredentialError> {
        let exchange = self.find_thread(envelope.get_thread_id()).await?;

        warn!(
            "[credential:handle_problem_report] exchange: {} | {}: {}",
            exchange.get_id(),
            report.code,
            report.explanation
        );

        self.abandon_with(exchange, report.explanation).await
    }

    async fn abandon(
        &self,
        id: ExchangeID,
        reason: String,
    ) -> Result<CredentialExchange, CredentialError> {
        let exchange = self.repo.get_exchange(id).await?;
        if exchange.get_state().is_terminal() {
            return Err(CredentialError::InvalidState(format!(
                "exchange {} is already {:?}",
                exchange.get_id(),
                exchange.get_state()
            )));
        }

        match self.endpoint_for(&exchange).await {
            Ok(endpoint) => {
                let report = ProblemReport::new(PROBLEM_EXCHANGE_ABANDONED, reason.clone());
                let sent = self
                    .send(
                        endpoint,
                        exchange.get_thread_id(),
                        Message::ProblemReport(report),
                    )
                    .await;

                if let Err(err) = sent {
                    warn!(
                        "[credential:abandon] unable to notify peer of {}: {}",
                        exchange.get_id(),
                        err
                    );
                }
            }
            Err(err) => warn!(
                "[credential:abandon] peer of {} unreachable: {}",
                exchange.get_id(),
                err
            ),
        }

        self.abandon_with(exchange, reason).await
    }

    async fn abandon_expired(
        &self,
        max_idle: Duration,
    ) -> Result<Vec<CredentialExchange>, CredentialError> {
        let deadline = Utc::now() - max_idle;
        let idle: Vec<CredentialExchange> = self
            .repo
            .list_exchanges(None)
            .await?
            .into_iter()
            .filter(|exchange| exchange.is_idle_since(deadline))
            .collect();

        let mut abandoned = Vec::new();
        for exchange in idle {
            match self
                .abandon(exchange.get_id(), REASON_EXCHANGE_EXPIRED.to_string())
                .await
            {
                Ok(expired) => abandoned.push(expired),
                Err(err) => warn!(
                    "[credential:abandon_expired] exchange: {} | {}",
                    exchange.get_id(),
                    err
                ),
            }
        }

        Ok(abandoned)
    }

    async fn get_exchange(&self, id: ExchangeID) -> Result<CredentialExchange, CredentialError> {
        self.repo.get_exchange(id).await
    }

    async fn list_exchanges(
        &self,
        state: Option<State>,
    ) -> Result<Vec<CredentialExchange>, CredentialError> {
        self.repo.list_exchanges(state).await
    }
}
