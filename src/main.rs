use std::io::Error;
use std::sync::Arc;
use std::time::Duration;

use poem::{Route, Server, listener::TcpListener};
use poem_openapi::OpenApiService;
use tokio::main;
use tracing_subscriber::EnvFilter;

use paging::{
    application::{
        handlers::ProcessIncomingMessageHandler,
        services::{
            event_bus::MessageBus, event_trail::EventTrail, transports::TransportManager,
        },
        usecases::{
            count_recent_errors::CountRecentErrorsUseCase,
            get_message_detail::GetMessageDetailUseCase,
            get_message_history::GetMessageHistoryUseCase, send_message::SendMessageUseCase,
        },
    },
    config::Config,
    domain::repositories::{
        Clock, IncomingMessageRepository, OutgoingMessageEventRepository, RecipientRepository,
        TransportConfigurationRepository,
    },
    infrastructure::{
        clock::SystemClock,
        expression::ExpressionLanguage,
        messaging::{InProcessBus, JetstreamBus, JetstreamConfig},
        repositories::{
            in_memory::{
                InMemoryIncomingMessageRepository, InMemoryOutgoingMessageEventRepository,
                InMemoryRecipientRepository, InMemoryTransportConfigurationRepository,
            },
            postgres::{
                PostgresIncomingMessageRepository, PostgresOutgoingMessageEventRepository,
                PostgresRecipientRepository, PostgresTransportConfigurationRepository,
            },
        },
        transports::{IntelPageTransportFactory, NtfyTransportFactory, TelegramTransportFactory},
    },
    presentation::http::endpoints::{
        ApiState, HealthEndpoints, MessagesEndpoints, StatsEndpoints,
    },
};

#[main]
async fn main() -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let config = Config::try_parse().map_err(Error::other)?;

    let (recipients, configurations, messages, events): (
        Arc<dyn RecipientRepository>,
        Arc<dyn TransportConfigurationRepository>,
        Arc<dyn IncomingMessageRepository>,
        Arc<dyn OutgoingMessageEventRepository>,
    ) = match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .connect(url)
                .await
                .map_err(Error::other)?;
            sqlx::migrate!().run(&pool).await.map_err(Error::other)?;
            (
                PostgresRecipientRepository::new(pool.clone()),
                PostgresTransportConfigurationRepository::new(pool.clone()),
                PostgresIncomingMessageRepository::new(pool.clone()),
                PostgresOutgoingMessageEventRepository::new(pool),
            )
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, using in-memory repositories");
            (
                Arc::new(InMemoryRecipientRepository::new()),
                Arc::new(InMemoryTransportConfigurationRepository::new()),
                Arc::new(InMemoryIncomingMessageRepository::new()),
                Arc::new(InMemoryOutgoingMessageEventRepository::new()),
            )
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let event_trail = EventTrail::new(events.clone(), clock.clone());

    let transport_manager = TransportManager::new(
        configurations,
        vec![
            NtfyTransportFactory::new(event_trail.clone()),
            TelegramTransportFactory::new(event_trail.clone()),
            IntelPageTransportFactory::new(event_trail.clone()),
        ],
    );

    let handler = Arc::new(ProcessIncomingMessageHandler::new(
        messages.clone(),
        recipients,
        transport_manager,
        Arc::new(ExpressionLanguage::new()),
        event_trail,
        clock.clone(),
        Duration::from_secs(config.send_timeout_seconds),
    ));

    let bus: Arc<dyn MessageBus> = match &config.nats_url {
        Some(url) => {
            let (bus, worker) = JetstreamBus::new(&JetstreamConfig {
                url: url.clone(),
                stream: config.nats_stream.clone(),
                subject: config.nats_subject.clone(),
                durable: config.nats_durable.clone(),
                pull_batch: config.nats_pull_batch,
                ack_wait_seconds: config.nats_ack_wait_seconds,
                max_deliver: config.nats_max_deliver,
            })
            .await
            .map_err(Error::other)?;
            worker.spawn(handler);
            bus
        }
        None => {
            tracing::warn!("NATS_URL is not set, processing jobs in-process");
            let (bus, worker) = InProcessBus::new();
            worker.spawn(handler);
            bus
        }
    };

    let state = Arc::new(ApiState {
        send_message_usecase: Arc::new(SendMessageUseCase::new(messages.clone(), bus, clock)),
        message_history_usecase: Arc::new(GetMessageHistoryUseCase::new(
            messages.clone(),
            events.clone(),
        )),
        message_detail_usecase: Arc::new(GetMessageDetailUseCase::new(messages, events.clone())),
        count_recent_errors_usecase: Arc::new(CountRecentErrorsUseCase::new(events)),
    });

    let server_url = format!("{}://{}:{}", config.scheme, config.host, config.port);

    tracing::info!("starting server at {server_url}");

    let api_service = OpenApiService::new(
        (
            HealthEndpoints,
            MessagesEndpoints::new(state.clone()),
            StatsEndpoints::new(state),
        ),
        "Paging API",
        "0.1.0",
    )
    .server(format!("{server_url}/api"));
    let ui = api_service.swagger_ui();
    let app = Route::new().nest("/api", api_service).nest("/", ui);

    Server::new(TcpListener::bind(format!("localhost:{}", config.port)))
        .run(app)
        .await
}
