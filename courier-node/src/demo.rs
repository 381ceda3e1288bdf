//! `demo` runs the two party scenario: a holder invites an issuer, the issuer registers
//! the gym membership schema and definition, then offers the credential until both sides are done
use std::time::Duration;

use rst_common::with_logging::log::{info, warn};
use rst_common::with_tokio::tokio;
use rst_common::with_tokio::tokio::sync::mpsc::UnboundedReceiver;

use prople_courier_core::connection::{Connection, Role as ConnectionRole, State as ConnectionState};
use prople_courier_core::credential::{
    AutoAccept, CredentialExchange, IssuedCredential, OfferConfig, Role as ExchangeRole,
    State as ExchangeState,
};
use prople_courier_core::events::{Event, EventType};
use prople_courier_core::ledger::CredentialDefinitionConfig;
use prople_courier_core::message::ThreadID;

use crate::apps::{DbBuilder, MemoryLedger, Store};
use crate::builder::{AgentBuilder, Node, NodeAgent};
use crate::common::helpers;
use crate::common::types::CommonError;
use crate::config::Config;

const OFFER_COMMENT: &str = "Gym membership";

/// `DemoOutcome` carries the final records of both parties
#[derive(Debug, Clone)]
pub struct DemoOutcome {
    pub issuer_connection: Connection,
    pub holder_connection: Connection,
    pub issuer_exchange: CredentialExchange,
    pub holder_exchange: CredentialExchange,
    pub credential: Option<IssuedCredential>,
}

/// `run` builds both agents from `config` and plays the scenario
pub async fn run(config: &Config) -> Result<DemoOutcome, CommonError> {
    helpers::validate(config.clone())?;

    let (holder_store, issuer_store) = open_stores(config)?;
    let builder = AgentBuilder::from_kind(MemoryLedger::new(), config.transport());
    let holder = builder
        .build_stored(config.holder().to_agent_config()?, holder_store)
        .await?;
    let issuer = builder
        .build_stored(config.issuer().to_agent_config()?, issuer_store)
        .await?;

    play(config, &issuer, &holder).await
}

/// `open_stores` returns the holder and issuer record stores, backed by rocksdb
/// when `[database]` is configured
fn open_stores(config: &Config) -> Result<(Store, Store), CommonError> {
    match config.database() {
        Some(database) => {
            let mut db_builder = DbBuilder::new(database.clone());
            let holder = db_builder.build(|db| db.holder().clone())?;
            let issuer = db_builder.build(|db| db.issuer().clone())?;

            Ok((Store::from_runner(holder), Store::from_runner(issuer)))
        }
        None => Ok((Store::new(), Store::new())),
    }
}

/// `play` drives the scenario between two already running nodes
pub async fn play(config: &Config, issuer: &Node, holder: &Node) -> Result<DemoOutcome, CommonError> {
    let timeout = Duration::from_secs(config.credential().get_timeout_secs());

    let mut issuer_connections = issuer.agent().events().subscribe(EventType::ConnectionStateChanged);
    let mut holder_connections = holder.agent().events().subscribe(EventType::ConnectionStateChanged);
    let mut issuer_exchanges = issuer.agent().events().subscribe(EventType::CredentialStateChanged);
    let mut holder_exchanges = holder.agent().events().subscribe(EventType::CredentialStateChanged);

    spawn_acceptors(issuer.agent());
    spawn_acceptors(holder.agent());

    let invitation = holder.agent().create_invitation().await.map_err(agent_error)?;
    let thread_id = invitation.get_thread_id();
    issuer
        .agent()
        .receive_invitation(invitation)
        .await
        .map_err(agent_error)?;

    let issuer_connection =
        wait_for(&mut issuer_connections, timeout, completed_connection(&thread_id)).await?;
    let holder_connection =
        wait_for(&mut holder_connections, timeout, completed_connection(&thread_id)).await?;

    info!(
        "[demo:play] connection complete | issuer: {} | holder: {}",
        issuer_connection.get_id(),
        holder_connection.get_id()
    );

    let schema = issuer
        .agent()
        .register_schema(config.credential().schema_config())
        .await
        .map_err(agent_error)?;

    let definition = issuer
        .agent()
        .register_credential_definition(CredentialDefinitionConfig {
            schema,
            tag: config.credential().get_tag(),
            support_revocation: config.credential().get_support_revocation(),
        })
        .await
        .map_err(agent_error)?;

    let offered = issuer
        .agent()
        .offer_credential(
            issuer_connection.get_id(),
            OfferConfig {
                credential_definition_id: definition.id,
                preview: config.credential().preview()?,
                comment: Some(OFFER_COMMENT.to_string()),
            },
        )
        .await
        .map_err(agent_error)?;

    let exchange_thread = offered.get_thread_id();
    let holder_exchange =
        wait_for(&mut holder_exchanges, timeout, settled_exchange(&exchange_thread)).await?;
    let issuer_exchange =
        wait_for(&mut issuer_exchanges, timeout, settled_exchange(&exchange_thread)).await?;

    for exchange in [&holder_exchange, &issuer_exchange] {
        if exchange.get_state() != ExchangeState::Done {
            return Err(CommonError::ScenarioError(format!(
                "exchange {} ended in {:?}: {}",
                exchange.get_id(),
                exchange.get_state(),
                exchange.get_error_message().unwrap_or_default()
            )));
        }
    }

    let credential = match holder_exchange.get_credential_id() {
        Some(id) => holder.wallet().get_credential(&id).await,
        None => None,
    };

    info!(
        "[demo:play] credential exchange done | thread: {}",
        exchange_thread
    );

    Ok(DemoOutcome {
        issuer_connection,
        holder_connection,
        issuer_exchange,
        holder_exchange,
        credential,
    })
}

fn agent_error(err: impl ToString) -> CommonError {
    CommonError::AgentError(err.to_string())
}

fn completed_connection(thread_id: &ThreadID) -> impl Fn(Event) -> Option<Connection> + '_ {
    move |event| match event {
        Event::ConnectionStateChanged(changed)
            if changed.record.get_thread_id() == *thread_id
                && changed.state == ConnectionState::Complete =>
        {
            Some(changed.record)
        }
        _ => None,
    }
}

fn settled_exchange(thread_id: &ThreadID) -> impl Fn(Event) -> Option<CredentialExchange> + '_ {
    move |event| match event {
        Event::CredentialStateChanged(changed)
            if changed.record.get_thread_id() == *thread_id && changed.state.is_terminal() =>
        {
            Some(changed.record)
        }
        _ => None,
    }
}

async fn wait_for<T, F>(
    events: &mut UnboundedReceiver<Event>,
    timeout: Duration,
    matcher: F,
) -> Result<T, CommonError>
where
    F: Fn(Event) -> Option<T>,
{
    let waiting = async {
        while let Some(event) = events.recv().await {
            if let Some(found) = matcher(event) {
                return Some(found);
            }
        }

        None
    };

    match tokio::time::timeout(timeout, waiting).await {
        Ok(Some(found)) => Ok(found),
        Ok(None) => Err(CommonError::ScenarioError(
            "event bus closed".to_string(),
        )),
        Err(_) => Err(CommonError::ScenarioError(format!(
            "no matching event after {:?}",
            timeout
        ))),
    }
}

/// `spawn_acceptors` stands in for an application answering the steps the agent
/// policies leave to it
fn spawn_acceptors(agent: &NodeAgent) {
    if !agent.get_config().auto_accept_connections {
        let mut events = agent.events().subscribe(EventType::ConnectionStateChanged);
        let acceptor = agent.clone();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let Event::ConnectionStateChanged(changed) = event {
                    let pending = changed.state == ConnectionState::Requested
                        && changed.record.get_role() == ConnectionRole::Inviter;

                    if pending {
                        if let Err(err) = acceptor.accept_connection(changed.connection_id).await {
                            warn!("[demo:acceptor] accept connection failed: {}", err);
                        }
                    }
                }
            }
        });
    }

    if agent.get_config().credential_policy.get_mode() == AutoAccept::Never {
        let mut events = agent.events().subscribe(EventType::CredentialStateChanged);
        let acceptor = agent.clone();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let Event::CredentialStateChanged(changed) = event {
                    let accepted = match (changed.record.get_role(), changed.state) {
                        (ExchangeRole::Holder, ExchangeState::OfferReceived) => {
                            Some(acceptor.accept_offer(changed.exchange_id).await)
                        }
                        (ExchangeRole::Issuer, ExchangeState::RequestReceived) => {
                            Some(acceptor.accept_request(changed.exchange_id).await)
                        }
                        (ExchangeRole::Issuer, ExchangeState::ProposalReceived) => {
                            Some(acceptor.accept_proposal(changed.exchange_id).await)
                        }
                        _ => None,
                    };

                    if let Some(Err(err)) = accepted {
                        warn!("[demo:acceptor] accept credential failed: {}", err);
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::env;
    use std::path::PathBuf;

    use multiaddr::Multiaddr;

    use prople_courier_core::agent::{AgentConfig, AgentError};
    use prople_courier_core::credential::{AutoAcceptPolicy, CredentialError, CredentialPreview};
    use prople_courier_core::ledger::SchemaConfig;
    use prople_courier_core::message::{CredentialOffer, CredentialRequest, Envelope, Message};

    use rst_common::standard::uuid::Uuid;

    use crate::config::{Database, Parser, TransportKind};

    fn fixture_config() -> Config {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("src/config/fixtures");

        let toml_file = format!("{}/config.toml", path.display());
        Parser::new(toml_file).parse().unwrap()
    }

    fn manual_config() -> Config {
        toml::from_str(
            r#"
            [holder]
            label = "Alice"
            endpoint = "/memory/2001"
            auto_accept_connections = false
            auto_accept_credentials = "never"

            [issuer]
            label = "Faber"
            endpoint = "/memory/2002"
            auto_accept_credentials = "never"

            [credential]
            schema_name = "Gym membership"
            schema_version = "1.0.0"
            tag = "latest"
            timeout_secs = 10

            [[credential.attributes]]
            name = "Start date"
            value = "20/08/2021"

            [[credential.attributes]]
            name = "Tier"
            value = "gold"
            "#,
        )
        .unwrap()
    }

    fn generate_agent_config(label: &str, endpoint: &str) -> AgentConfig {
        let endpoint: Multiaddr = endpoint.parse().unwrap();
        AgentConfig::new(label.to_string(), endpoint)
            .with_credential_policy(AutoAcceptPolicy::content_approved())
    }

    fn generate_preview(tier: &str) -> CredentialPreview {
        CredentialPreview::from_record(vec![("Start date", "20/08/2021"), ("Tier", tier)]).unwrap()
    }

    async fn pump(node: &Node, inbound: &mut UnboundedReceiver<Envelope>) -> Result<(), AgentError> {
        let envelope = inbound.recv().await.unwrap();
        node.agent().receive(envelope).await
    }

    /// builds an issuer and a holder whose inbound envelopes are only applied by `pump`
    async fn detached_pair() -> (
        Node,
        UnboundedReceiver<Envelope>,
        Node,
        UnboundedReceiver<Envelope>,
    ) {
        let builder = AgentBuilder::default();
        let (issuer, issuer_inbound) = builder
            .build_detached(generate_agent_config("Faber", "/memory/3002"))
            .await
            .unwrap();
        let (holder, holder_inbound) = builder
            .build_detached(generate_agent_config("Alice", "/memory/3001"))
            .await
            .unwrap();

        (issuer, issuer_inbound, holder, holder_inbound)
    }

    async fn connect(
        issuer: &Node,
        issuer_inbound: &mut UnboundedReceiver<Envelope>,
        holder: &Node,
        holder_inbound: &mut UnboundedReceiver<Envelope>,
    ) -> Connection {
        let invitation = holder.agent().create_invitation().await.unwrap();
        issuer.agent().receive_invitation(invitation).await.unwrap();

        pump(holder, holder_inbound).await.unwrap();
        pump(issuer, issuer_inbound).await.unwrap();
        pump(holder, holder_inbound).await.unwrap();

        let mut completed = issuer
            .agent()
            .list_connections(Some(ConnectionState::Complete))
            .await
            .unwrap();
        completed.remove(0)
    }

    async fn offer(issuer: &Node, connection: &Connection) -> CredentialExchange {
        let schema = issuer
            .agent()
            .register_schema(SchemaConfig {
                name: "Gym membership".to_string(),
                version: "1.0.0".to_string(),
                attributes: vec!["Start date".to_string(), "Tier".to_string()],
            })
            .await
            .unwrap();

        let definition = issuer
            .agent()
            .register_credential_definition(CredentialDefinitionConfig {
                schema,
                tag: "latest".to_string(),
                support_revocation: false,
            })
            .await
            .unwrap();

        issuer
            .agent()
            .offer_credential(
                connection.get_id(),
                OfferConfig {
                    credential_definition_id: definition.id,
                    preview: generate_preview("gold"),
                    comment: None,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_run_fixture_scenario() {
        let outcome = run(&fixture_config()).await;
        assert!(!outcome.is_err());

        let outcome = outcome.unwrap();
        assert_eq!(outcome.holder_exchange.get_state(), ExchangeState::Done);
        assert_eq!(outcome.issuer_exchange.get_state(), ExchangeState::Done);
        assert_eq!(
            outcome.holder_exchange.get_thread_id(),
            outcome.issuer_exchange.get_thread_id()
        );
        assert_eq!(outcome.holder_connection.get_state(), ConnectionState::Complete);
        assert_eq!(outcome.issuer_connection.get_state(), ConnectionState::Complete);

        let credential = outcome.credential.unwrap();
        assert_eq!(credential.get_values().get("Tier"), Some("gold"));
        assert_eq!(credential.get_values().get("Start date"), Some("20/08/2021"))
    }

    #[tokio::test]
    async fn test_run_manual_acceptance() {
        let outcome = run(&manual_config()).await;
        assert!(!outcome.is_err());

        let outcome = outcome.unwrap();
        assert_eq!(outcome.holder_exchange.get_state(), ExchangeState::Done);
        assert_eq!(outcome.issuer_exchange.get_state(), ExchangeState::Done);
        assert!(outcome.credential.is_some())
    }

    #[tokio::test]
    async fn test_run_invalid_config() {
        let outcome = run(&Config::default()).await;
        assert!(matches!(
            outcome.unwrap_err(),
            CommonError::ValidationError(_)
        ))
    }

    #[tokio::test]
    async fn test_done_emitted_once() {
        let config = fixture_config();
        let builder = AgentBuilder::default();
        let issuer = builder
            .build(config.issuer().to_agent_config().unwrap())
            .await
            .unwrap();
        let holder = builder
            .build(config.holder().to_agent_config().unwrap())
            .await
            .unwrap();

        let mut issuer_events = issuer
            .agent()
            .events()
            .subscribe(EventType::CredentialStateChanged);
        let mut holder_events = holder
            .agent()
            .events()
            .subscribe(EventType::CredentialStateChanged);

        let outcome = play(&config, &issuer, &holder).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        for (events, role) in [
            (&mut issuer_events, ExchangeRole::Issuer),
            (&mut holder_events, ExchangeRole::Holder),
        ] {
            let mut done = 0;
            while let Ok(event) = events.try_recv() {
                if let Event::CredentialStateChanged(changed) = event {
                    assert_eq!(changed.record.get_role(), role);
                    if changed.state == ExchangeState::Done {
                        done += 1;
                    }
                }
            }

            assert_eq!(done, 1);
        }

        assert_eq!(
            outcome.holder_exchange.get_credential_id(),
            outcome.credential.map(|credential| credential.get_id())
        )
    }

    #[tokio::test]
    async fn test_connection_complete_on_both_sides() {
        let (issuer, mut issuer_inbound, holder, mut holder_inbound) = detached_pair().await;
        let issuer_connection =
            connect(&issuer, &mut issuer_inbound, &holder, &mut holder_inbound).await;

        let holder_connections = holder.agent().list_connections(None).await.unwrap();
        assert_eq!(holder_connections.len(), 1);
        assert_eq!(holder_connections[0].get_state(), ConnectionState::Complete);
        assert_eq!(holder_connections[0].get_role(), ConnectionRole::Inviter);
        assert_eq!(issuer_connection.get_role(), ConnectionRole::Invitee);
        assert_eq!(
            holder_connections[0].get_thread_id(),
            issuer_connection.get_thread_id()
        );
        assert_eq!(
            issuer_connection.get_peer_key(),
            Some(holder.agent().get_identity().get_verkey())
        );
        assert_eq!(
            issuer_connection.get_peer_did(),
            Some(holder.agent().get_identity().get_did())
        );
        assert_eq!(
            holder_connections[0].get_peer_key(),
            Some(issuer.agent().get_identity().get_verkey())
        );
        assert_eq!(
            holder_connections[0].get_peer_did(),
            Some(issuer.agent().get_identity().get_did())
        )
    }

    #[tokio::test]
    async fn test_offer_before_connection_complete() {
        let (issuer, _issuer_inbound, holder, _holder_inbound) = detached_pair().await;

        let invitation = holder.agent().create_invitation().await.unwrap();
        issuer.agent().receive_invitation(invitation).await.unwrap();

        let requested = issuer
            .agent()
            .list_connections(Some(ConnectionState::Requested))
            .await
            .unwrap();
        assert_eq!(requested.len(), 1);

        let offered = issuer
            .agent()
            .offer_credential(
                requested[0].get_id(),
                OfferConfig {
                    credential_definition_id: "unknown".to_string(),
                    preview: generate_preview("gold"),
                    comment: None,
                },
            )
            .await;

        assert!(matches!(
            offered.unwrap_err(),
            AgentError::CredentialError(CredentialError::ConnectionNotReady(_))
        ));
        assert!(issuer.agent().list_exchanges(None).await.unwrap().is_empty())
    }

    /// plays until the holder request is intercepted, hands the request to `tamper`
    /// and delivers the result to the issuer
    async fn deliver_tampered_request(
        tamper: impl FnOnce(&mut CredentialRequest),
    ) -> (Node, Node, UnboundedReceiver<Envelope>, CredentialExchange, Result<(), AgentError>) {
        let (issuer, mut issuer_inbound, holder, mut holder_inbound) = detached_pair().await;
        let connection =
            connect(&issuer, &mut issuer_inbound, &holder, &mut holder_inbound).await;
        let offered = offer(&issuer, &connection).await;

        pump(&holder, &mut holder_inbound).await.unwrap();
        let request = issuer_inbound.recv().await.unwrap();

        let mut tampered = match request.message().unwrap() {
            Message::CredentialRequest(request) => request,
            other => panic!("unexpected message: {:?}", other.kind()),
        };
        tamper(&mut tampered);

        let tampered = Envelope::pack(
            request.get_thread_id(),
            request.get_sender_key().to_string(),
            &Message::CredentialRequest(tampered),
        )
        .unwrap();

        let received = issuer.agent().receive(tampered).await;
        (issuer, holder, holder_inbound, offered, received)
    }

    #[tokio::test]
    async fn test_definition_mismatch_leaves_holder_waiting() {
        let (issuer, holder, mut holder_inbound, offered, received) =
            deliver_tampered_request(|request| {
                request.credential_definition_id = "did:3:CL:forged:latest".to_string()
            })
            .await;

        assert!(matches!(
            received.unwrap_err(),
            AgentError::CredentialError(CredentialError::OfferMismatch(_))
        ));

        let issuer_exchange = issuer.agent().get_exchange(offered.get_id()).await.unwrap();
        assert_eq!(issuer_exchange.get_state(), ExchangeState::Abandoned);
        assert!(issuer_exchange
            .get_error_message()
            .unwrap_or_default()
            .contains("did:3:CL:forged:latest"));

        let holder_exchanges = holder.agent().list_exchanges(None).await.unwrap();
        assert_eq!(holder_exchanges.len(), 1);
        assert_eq!(holder_exchanges[0].get_state(), ExchangeState::RequestSent);
        assert!(holder_inbound.try_recv().is_err())
    }

    #[tokio::test]
    async fn test_request_mismatch_leaves_holder_waiting() {
        let (issuer, holder, mut holder_inbound, offered, received) =
            deliver_tampered_request(|request| request.preview = generate_preview("platinum"))
                .await;

        assert!(matches!(
            received.unwrap_err(),
            AgentError::CredentialError(CredentialError::OfferMismatch(_))
        ));

        let issuer_exchange = issuer.agent().get_exchange(offered.get_id()).await.unwrap();
        assert_eq!(issuer_exchange.get_state(), ExchangeState::Abandoned);

        let holder_exchanges = holder.agent().list_exchanges(None).await.unwrap();
        assert_eq!(holder_exchanges.len(), 1);
        assert_eq!(holder_exchanges[0].get_state(), ExchangeState::RequestSent);
        assert!(holder_inbound.try_recv().is_err())
    }

    #[tokio::test]
    async fn test_play_over_http() {
        let config = fixture_config();
        let builder = AgentBuilder::from_kind(MemoryLedger::new(), TransportKind::Http);
        let local: Multiaddr = "/ip4/127.0.0.1/tcp/0".parse().unwrap();

        let mut holder_config = config.holder().to_agent_config().unwrap();
        holder_config.endpoint = local.clone();
        let mut issuer_config = config.issuer().to_agent_config().unwrap();
        issuer_config.endpoint = local;

        let holder = builder.build(holder_config).await.unwrap();
        let issuer = builder.build(issuer_config).await.unwrap();

        let outcome = play(&config, &issuer, &holder).await;
        assert!(!outcome.is_err());

        let outcome = outcome.unwrap();
        assert_eq!(outcome.holder_exchange.get_state(), ExchangeState::Done);
        assert_eq!(outcome.issuer_exchange.get_state(), ExchangeState::Done);
        assert_eq!(outcome.holder_connection.get_role(), ConnectionRole::Inviter);
        assert!(outcome.credential.is_some())
    }

    #[tokio::test]
    async fn test_run_with_rocksdb_records() {
        let mut root = env::temp_dir();
        root.push(format!("courier-demo-{}", Uuid::new_v4()));
        let holder_path = root.join("holder").display().to_string();
        let issuer_path = root.join("issuer").display().to_string();

        let mut config = fixture_config();
        let database: Database = toml::from_str(&format!(
            r#"
            [holder.common]
            path = "{holder}"
            cf_name = "holder-cf"

            [holder.db]
            set_wal_dir = "{holder}-wal"

            [issuer.common]
            path = "{issuer}"
            cf_name = "issuer-cf"

            [issuer.db]
            set_wal_dir = "{issuer}-wal"
            "#,
            holder = holder_path,
            issuer = issuer_path
        ))
        .unwrap();
        config.set_database(database);

        let outcome = run(&config).await;
        assert!(!outcome.is_err());
        assert_eq!(
            outcome.unwrap().holder_exchange.get_state(),
            ExchangeState::Done
        );

        assert!(PathBuf::from(holder_path).exists());
        assert!(PathBuf::from(issuer_path).exists())
    }

    #[tokio::test]
    async fn test_duplicate_envelope_is_ignored() {
        let (issuer, mut issuer_inbound, holder, mut holder_inbound) = detached_pair().await;
        let connection =
            connect(&issuer, &mut issuer_inbound, &holder, &mut holder_inbound).await;
        let _ = offer(&issuer, &connection).await;

        let offer_envelope = holder_inbound.recv().await.unwrap();
        let first = holder.agent().receive(offer_envelope.clone()).await;
        assert!(!first.is_err());

        let again = holder.agent().receive(offer_envelope).await;
        assert!(!again.is_err());

        let holder_exchanges = holder.agent().list_exchanges(None).await.unwrap();
        assert_eq!(holder_exchanges.len(), 1);
        assert_eq!(holder_exchanges[0].get_state(), ExchangeState::RequestSent);

        assert!(issuer_inbound.recv().await.is_some());
        assert!(issuer_inbound.try_recv().is_err())
    }

    #[tokio::test]
    async fn test_abandon_notifies_peer() {
        let (issuer, mut issuer_inbound, holder, mut holder_inbound) = detached_pair().await;
        let connection =
            connect(&issuer, &mut issuer_inbound, &holder, &mut holder_inbound).await;

        let offered = offer(&issuer, &connection).await;
        let abandoned = issuer
            .agent()
            .abandon_credential(offered.get_id(), "offer withdrawn".to_string())
            .await
            .unwrap();
        assert_eq!(abandoned.get_state(), ExchangeState::Abandoned);

        pump(&holder, &mut holder_inbound).await.unwrap();
        pump(&holder, &mut holder_inbound).await.unwrap();

        let holder_exchanges = holder.agent().list_exchanges(None).await.unwrap();
        assert_eq!(holder_exchanges.len(), 1);
        assert_eq!(holder_exchanges[0].get_state(), ExchangeState::Abandoned)
    }

    #[tokio::test]
    async fn test_unknown_message_type() {
        let (_issuer, _issuer_inbound, holder, _holder_inbound) = detached_pair().await;

        let raw = format!(
            r#"{{"@id":"m-1","@type":"trust-ping/1.0/ping","~thread":{{"thid":"t-1"}},"senderKey":"{}","body":{{}}}}"#,
            "ab".repeat(32)
        );
        let envelope = Envelope::decode(raw.as_bytes()).unwrap();

        let received = holder.agent().receive(envelope).await;
        assert!(matches!(
            received.unwrap_err(),
            AgentError::UnroutableMessage(_)
        ))
    }

    #[tokio::test]
    async fn test_offer_from_stranger() {
        let (_issuer, _issuer_inbound, holder, _holder_inbound) = detached_pair().await;

        let envelope = Envelope::pack(
            ThreadID::generate(),
            "cd".repeat(32),
            &Message::CredentialOffer(CredentialOffer {
                credential_definition_id: "unknown".to_string(),
                preview: generate_preview("gold"),
                comment: None,
                nonce: "nonce".to_string(),
            }),
        )
        .unwrap();

        let received = holder.agent().receive(envelope).await;
        assert!(matches!(
            received.unwrap_err(),
            AgentError::UnroutableMessage(_)
        ));
        assert!(holder.agent().list_exchanges(None).await.unwrap().is_empty())
    }
}
