use rst_common::with_logging::log::info;
use rst_common::with_tracing::tracing_subscriber::{
    self, layer::SubscriberExt, util::SubscriberInitExt,
};

use prople_courier_node::{demo, ConfigManager, DemoOutcome, TransportKind};

use crate::errors::CourierError;

pub struct Demo {
    config: String,
    transport: Option<TransportKind>,
}

impl Demo {
    pub fn new(config: String, transport: Option<TransportKind>) -> Demo {
        Self { config, transport }
    }

    fn init_tracing(&self) {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    format!(
                        "{}=debug,prople_courier_core=debug,prople_courier_node=debug,tower_http=debug",
                        env!("CARGO_CRATE_NAME")
                    )
                    .into()
                }),
            )
            .with(tracing_subscriber::fmt::layer().without_time())
            .init();
    }

    pub async fn run(&self) -> Result<DemoOutcome, CourierError> {
        self.init_tracing();

        let mut config = ConfigManager::new(self.config.to_owned())
            .parse()
            .map_err(|err| CourierError::ConfigError(err.to_string()))?;

        if let Some(transport) = self.transport {
            config.set_transport(transport);
        }

        info!("[courierd:demo] running over {:?}", config.transport());

        let outcome = demo::run(&config)
            .await
            .map_err(|err| CourierError::DemoError(err.to_string()))?;

        info!(
            "[courierd:demo] holder exchange {} is {:?}",
            outcome.holder_exchange.get_id(),
            outcome.holder_exchange.get_state()
        );
        info!(
            "[courierd:demo] issuer exchange {} is {:?}",
            outcome.issuer_exchange.get_id(),
            outcome.issuer_exchange.get_state()
        );

        if let Some(credential) = &outcome.credential {
            for attribute in credential.get_values().get_attributes() {
                info!(
                    "[courierd:demo] credential {} | {}: {}",
                    credential.get_id(),
                    attribute.name,
                    attribute.value
                );
            }
        }

        Ok(outcome)
    }
}
