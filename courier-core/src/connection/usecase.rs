use multiaddr::Multiaddr;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::{debug, info, warn};

use crate::events::{Event, EventBus};
use crate::identity::{is_valid_verkey, Identity};
use crate::message::{
    ConnectionAck, ConnectionRequest, ConnectionResponse, ConnectionSignature, Envelope, Message,
    ProblemReport, ThreadID,
};
use crate::transport::TransportBuilder;
use crate::wallet::WalletBuilder;

use super::connection::Connection;
use super::invitation::Invitation;
use super::types::{ConnectionError, ConnectionID, RepoBuilder, Role, State, UsecaseBuilder};

pub const PROBLEM_CONNECTION_ABANDONED: &str = "connection_abandoned";

/// `Usecase` implements the connection handshake on top of a repository, a transport
/// and the agent wallet
///
/// When `auto_accept` is disabled an inbound request is kept in `Requested` until
/// [`UsecaseBuilder::accept_request`] is called
pub struct Usecase<TRepo, TTransport, TWallet>
where
    TRepo: RepoBuilder,
    TTransport: TransportBuilder,
    TWallet: WalletBuilder,
{
    repo: TRepo,
    transport: TTransport,
    wallet: TWallet,
    events: EventBus,
    identity: Identity,
    endpoint: Multiaddr,
    auto_accept: bool,
}

impl<TRepo, TTransport, TWallet> Usecase<TRepo, TTransport, TWallet>
where
    TRepo: RepoBuilder,
    TTransport: TransportBuilder,
    TWallet: WalletBuilder,
{
    pub fn new(
        repo: TRepo,
        transport: TTransport,
        wallet: TWallet,
        events: EventBus,
        identity: Identity,
        endpoint: Multiaddr,
    ) -> Self {
        Self {
            repo,
            transport,
            wallet,
            events,
            identity,
            endpoint,
            auto_accept: true,
        }
    }

    pub fn with_auto_accept(mut self, auto_accept: bool) -> Self {
        self.auto_accept = auto_accept;
        self
    }

    async fn send(
        &self,
        endpoint: Multiaddr,
        thread_id: ThreadID,
        message: Message,
    ) -> Result<(), ConnectionError> {
        let envelope = Envelope::pack(thread_id, self.identity.get_verkey(), &message)
            .map_err(|err| ConnectionError::MessageError(err.to_string()))?;

        debug!(
            "[connection:send] {} -> {} | thread: {}",
            envelope.get_type(),
            endpoint,
            envelope.get_thread_id()
        );

        self.transport
            .send(endpoint, envelope)
            .await
            .map_err(|err| ConnectionError::TransportError(err.to_string()))
    }

    async fn commit(
        &self,
        previous: Option<State>,
        connection: Connection,
    ) -> Result<Connection, ConnectionError> {
        self.repo.save(connection.clone()).await?;

        info!(
            "[connection:commit] connection: {} | {:?} -> {:?}",
            connection.get_id(),
            previous,
            connection.get_state()
        );

        self.events.emit(Event::connection(previous, &connection));
        Ok(connection)
    }

    async fn find_thread(&self, thread_id: ThreadID) -> Result<Connection, ConnectionError> {
        self.repo
            .find_by_thread(thread_id.clone())
            .await?
            .ok_or_else(|| ConnectionError::ConnectionNotFound(format!("thread: {}", thread_id)))
    }

    async fn respond(&self, mut connection: Connection) -> Result<Connection, ConnectionError> {
        let peer_endpoint = connection.get_peer_endpoint().ok_or(ConnectionError::InvalidState(
            "missing peer endpoint".to_string(),
        ))?;

        let signed = ConnectionSignature {
            thread_id: connection.get_thread_id(),
            did: self.identity.get_did(),
            verkey: self.identity.get_verkey(),
            endpoint: self.endpoint.clone(),
        }
        .to_bytes()
        .map_err(|err| ConnectionError::MessageError(err.to_string()))?;

        let signature = self
            .wallet
            .sign(signed)
            .await
            .map_err(|err| ConnectionError::WalletError(err.to_string()))?;

        let response = ConnectionResponse {
            label: self.identity.get_label(),
            did: self.identity.get_did(),
            verkey: self.identity.get_verkey(),
            endpoint: self.endpoint.clone(),
            signature,
        };

        let previous = connection.transition(State::Responded)?;
        self.send(
            peer_endpoint,
            connection.get_thread_id(),
            Message::ConnectionResponse(response),
        )
        .await?;

        self.commit(Some(previous), connection).await
    }

    async fn verify_response(
        &self,
        connection: &Connection,
        response: &ConnectionResponse,
    ) -> Result<bool, ConnectionError> {
        let invitation_key = connection.get_peer_key().ok_or(ConnectionError::InvalidState(
            "missing invitation key".to_string(),
        ))?;

        if response.verkey != invitation_key {
            return Ok(false);
        }

        let signed = ConnectionSignature {
            thread_id: connection.get_thread_id(),
            did: response.did.clone(),
            verkey: response.verkey.clone(),
            endpoint: response.endpoint.clone(),
        }
        .to_bytes()
        .map_err(|err| ConnectionError::MessageError(err.to_string()))?;

        let verified = self
            .wallet
            .verify(invitation_key, signed, response.signature.clone())
            .await;

        match verified {
            Ok(valid) => Ok(valid),
            Err(err) => {
                warn!("[connection:verify_response] unable to verify: {}", err);
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl<TRepo, TTransport, TWallet> UsecaseBuilder for Usecase<TRepo, TTransport, TWallet>
where
    TRepo: RepoBuilder,
    TTransport: TransportBuilder,
    TWallet: WalletBuilder,
{
    async fn create_invitation(&self) -> Result<(Invitation, Connection), ConnectionError> {
        let invitation = Invitation::new(
            self.identity.get_label(),
            self.identity.get_verkey(),
            self.endpoint.clone(),
        );

        let connection = Connection::new(Role::Inviter, State::Invited, invitation.get_thread_id());
        let saved = self.commit(None, connection).await?;
        Ok((invitation, saved))
    }

    async fn receive_invitation(
        &self,
        invitation: Invitation,
    ) -> Result<Connection, ConnectionError> {
        invitation.validate()?;

        if invitation.get_recipient_key() == self.identity.get_verkey() {
            return Err(ConnectionError::InvalidInvitation(
                "invitation was created by this agent".to_string(),
            ));
        }

        let existing = self.repo.find_by_thread(invitation.get_thread_id()).await?;
        if existing.is_some() {
            return Err(ConnectionError::InvalidInvitation(format!(
                "invitation {} already consumed",
                invitation.get_id()
            )));
        }

        let connection = Connection::from_invitation(&invitation);
        let request = ConnectionRequest {
            label: self.identity.get_label(),
            did: self.identity.get_did(),
            verkey: self.identity.get_verkey(),
            endpoint: self.endpoint.clone(),
        };

        self.send(
            invitation.get_service_endpoint(),
            connection.get_thread_id(),
            Message::ConnectionRequest(request),
        )
        .await?;

        self.commit(None, connection).await
    }

    async fn handle_request(
        &self,
        envelope: Envelope,
        request: ConnectionRequest,
    ) -> Result<Connection, ConnectionError> {
        let thread_id = envelope.get_thread_id();
        let mut connection = match self.repo.find_by_thread(thread_id.clone()).await? {
            Some(found) if found.expect(Role::Inviter, State::Invited).is_ok() => found,
            _ => {
                return Err(ConnectionError::UnknownInvitation(format!(
                    "thread: {}",
                    thread_id
                )))
            }
        };

        if !is_valid_verkey(&request.verkey) || envelope.get_sender_key() != request.verkey {
            return Err(ConnectionError::InvalidMessage(format!(
                "request key does not match sender: {}",
                envelope.get_sender_key()
            )));
        }

        connection.set_peer(request.label, request.did, request.verkey, request.endpoint);

        if self.auto_accept {
            return self.respond(connection).await;
        }

        let previous = connection.transition(State::Requested)?;
        self.commit(Some(previous), connection).await
    }

    async fn accept_request(&self, id: ConnectionID) -> Result<Connection, ConnectionError> {
        let connection = self.repo.get_connection(id).await?;
        connection.expect(Role::Inviter, State::Requested)?;
        self.respond(connection).await
    }

    async fn handle_response(
        &self,
        envelope: Envelope,
        response: ConnectionResponse,
    ) -> Result<Connection, ConnectionError> {
        let mut connection = self.find_thread(envelope.get_thread_id()).await?;
        connection.expect(Role::Invitee, State::Requested)?;

        if !self.verify_response(&connection, &response).await? {
            let reason = format!(
                "response signature does not match invitation key on thread {}",
                connection.get_thread_id()
            );

            let previous = connection.transition(State::Abandoned)?;
            connection.set_error_message(reason.clone());
            self.commit(Some(previous), connection).await?;
            return Err(ConnectionError::ConnectionVerificationFailed(reason));
        }

        let peer_endpoint = response.endpoint.clone();
        connection.set_peer(
            response.label,
            response.did,
            response.verkey,
            response.endpoint,
        );

        let previous = connection.transition(State::Complete)?;
        self.send(
            peer_endpoint,
            connection.get_thread_id(),
            Message::ConnectionAck(ConnectionAck::default()),
        )
        .await?;

        self.commit(Some(previous), connection).await
    }

    async fn handle_ack(
        &self,
        envelope: Envelope,
        _ack: ConnectionAck,
    ) -> Result<Connection, ConnectionError> {
        let mut connection = self.find_thread(envelope.get_thread_id()).await?;
        if connection.get_role() == Role::Inviter && connection.is_ready() {
            debug!(
                "[connection:handle_ack] connection: {} already complete",
                connection.get_id()
            );
            return Ok(connection);
        }

        connection.expect(Role::Inviter, State::Responded)?;

        let previous = connection.transition(State::Complete)?;
        self.commit(Some(previous), connection).await
    }

    async fn complete_on_activity(&self, id: ConnectionID) -> Result<Connection, ConnectionError> {
        let mut connection = self.repo.get_connection(id).await?;
        if connection.get_role() == Role::Inviter && connection.is_ready() {
            return Ok(connection);
        }

        connection.expect(Role::Inviter, State::Responded)?;

        let previous = connection.transition(State::Complete)?;
        self.commit(Some(previous), connection).await
    }

    async fn handle_problem_report(
        &self,
        envelope: Envelope,
        report: ProblemReport,
    ) -> Result<Connection, ConnectionError> {
        let mut connection = self.find_thread(envelope.get_thread_id()).await?;

        warn!(
            "[connection:handle_problem_report] connection: {} | {}: {}",
            connection.get_id(),
            report.code,
            report.explanation
        );

        let previous = connection.transition(State::Abandoned)?;
        connection.set_error_message(report.explanation);
        self.commit(Some(previous), connection).await
    }

    async fn abandon(
        &self,
        id: ConnectionID,
        reason: String,
    ) -> Result<Connection, ConnectionError> {
        let mut connection = self.repo.get_connection(id).await?;
        let previous = connection.transition(State::Abandoned)?;
        connection.set_error_message(reason.clone());

        if let Some(endpoint) = connection.get_peer_endpoint() {
            let report = ProblemReport::new(PROBLEM_CONNECTION_ABANDONED, reason);
            let sent = self
                .send(
                    endpoint,
                    connection.get_thread_id(),
                    Message::ProblemReport(report),
                )
                .await;

            if let Err(err) = sent {
                warn!(
                    "[connection:abandon] unable to notify peer of {}: {}",
                    connection.get_id(),
                    err
                );
            }
        }

        self.commit(Some(previous), connection).await
    }

    async fn get_connection(&self, id: ConnectionID) -> Result<Connection, ConnectionError> {
        self.repo.get_connection(id).await
    }

    async fn list_connections(
        &self,
        state: Option<State>,
    ) -> Result<Vec<Connection>, ConnectionError> {
        self.repo.list_connections(state).await
    }
}
