use std::{error::Error, str::FromStr, sync::Arc};

use async_trait::async_trait;
use axum::{
    extract::{
        rejection::JsonRejection, FromRequest, FromRequestParts, Path,
        Request, State,
    },
    http::{header::CONTENT_TYPE, request, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use derive_more::From;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tokio::{fs, net, task};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter,
};

use event_tickets::{api, db, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let config_path =
        std::env::var("CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = fs::read_to_string(&config_path).await?;
    let config = toml::from_str::<Config>(&config)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (db_client, db_connection) = db::connect(config.db).await?;

    task::spawn(async move {
        if let Err(e) = db_connection.await {
            tracing::error!("database connection failed: {e}");
        }
    });

    db_client.migrate().await?;

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([CONTENT_TYPE]);
    for origin in &config.http.cors.allowed_origins {
        cors = cors.allow_origin(origin.parse::<HeaderValue>()?);
    }

    let app = router(Arc::new(AppState { db_client }))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = net::TcpListener::bind(config.http.server.addr).await?;
    tracing::info!("listening on {}", config.http.server.addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: SharedAppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", get(list_events).post(create_event))
        .route("/events/:id", get(get_event).put(update_event))
        .route("/tickets", post(create_ticket))
        .route("/tickets/:event_id", get(list_tickets))
        .route("/tickets/use/:id", put(redeem_ticket))
        .with_state(state)
}

async fn health() -> &'static str {
    "I'm okay!"
}

async fn list_events(
    State(state): State<SharedAppState>,
) -> Result<Json<Vec<api::Event>>, ListEventsError> {
    let events = state.db_client.get_events().await?;

    Ok(Json(events.into_iter().map(api::Event::from).collect()))
}

#[derive(Debug, From)]
pub enum ListEventsError {
    #[from]
    DbError(db::Error),
}

impl IntoResponse for ListEventsError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => {
                tracing::error!("failed to list events: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
        .into_response()
    }
}

async fn get_event(
    State(state): State<SharedAppState>,
    PathId(id): PathId<api::event::Id>,
) -> Result<Json<api::Event>, GetEventError> {
    use GetEventError as E;

    let event = state
        .db_client
        .get_event_by_id(id)
        .await?
        .ok_or(E::EventNotFound(id))?;

    Ok(Json(event.into()))
}

#[derive(Debug, From)]
pub enum GetEventError {
    #[from]
    DbError(db::Error),
    EventNotFound(api::event::Id),
}

impl IntoResponse for GetEventError {
    fn into_response(self) -> Response {
        match self {
            Self::EventNotFound(id) => {
                tracing::warn!(%id, "event not found");
                StatusCode::NOT_FOUND
            }
            Self::DbError(e) => {
                tracing::error!("failed to get event: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
        .into_response()
    }
}

async fn create_event(
    State(state): State<SharedAppState>,
    Payload(input): Payload<api::event::Input>,
) -> Result<(StatusCode, Json<api::Event>), CreateEventError> {
    use CreateEventError as E;

    let event = input.validate()?;

    let event = state
        .db_client
        .insert_event(&event)
        .await?
        .ok_or(E::EventAlreadyExists)?;
    tracing::info!(id = %event.id, "event created");

    Ok((StatusCode::CREATED, Json(event.into())))
}

#[derive(Debug, From)]
pub enum CreateEventError {
    #[from]
    DbError(db::Error),
    EventAlreadyExists,
    #[from]
    Validation(api::validation::Error),
}

impl IntoResponse for CreateEventError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(e) => {
                tracing::warn!("invalid event: {e}");
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::EventAlreadyExists => {
                tracing::warn!("event with the same name and date exists");
                StatusCode::CONFLICT
            }
            Self::DbError(e) => {
                tracing::error!("failed to create event: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
        .into_response()
    }
}

async fn update_event(
    State(state): State<SharedAppState>,
    PathId(id): PathId<api::event::Id>,
    Payload(input): Payload<api::event::Input>,
) -> Result<Json<api::Event>, UpdateEventError> {
    use UpdateEventError as E;

    let event = input.validate()?;

    let event = state
        .db_client
        .update_event(id, &event)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                E::EventAlreadyExists
            } else {
                E::DbError(e)
            }
        })?
        .ok_or(E::EventNotFound(id))?;

    Ok(Json(event.into()))
}

#[derive(Debug, From)]
pub enum UpdateEventError {
    #[from]
    DbError(db::Error),
    EventAlreadyExists,
    EventNotFound(api::event::Id),
    #[from]
    Validation(api::validation::Error),
}

impl IntoResponse for UpdateEventError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(e) => {
                tracing::warn!("invalid event: {e}");
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::EventNotFound(id) => {
                tracing::warn!(%id, "event not found");
                StatusCode::NOT_FOUND
            }
            Self::EventAlreadyExists => {
                tracing::warn!("event with the same name and date exists");
                StatusCode::CONFLICT
            }
            Self::DbError(e) => {
                tracing::error!("failed to update event: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
        .into_response()
    }
}

async fn list_tickets(
    State(state): State<SharedAppState>,
    PathId(event_id): PathId<api::event::Id>,
) -> Result<Json<Vec<api::Ticket>>, ListTicketsError> {
    let tickets = state.db_client.get_tickets_by_event(event_id).await?;

    Ok(Json(tickets.into_iter().map(api::Ticket::from).collect()))
}

#[derive(Debug, From)]
pub enum ListTicketsError {
    #[from]
    DbError(db::Error),
}

impl IntoResponse for ListTicketsError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => {
                tracing::error!("failed to list tickets: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
        .into_response()
    }
}

async fn create_ticket(
    State(state): State<SharedAppState>,
    Payload(input): Payload<api::ticket::Input>,
) -> Result<(StatusCode, Json<api::Ticket>), CreateTicketError> {
    use CreateTicketError as E;

    let ticket = input.validate()?;

    let event = state
        .db_client
        .get_event_by_id(ticket.event_id)
        .await?
        .ok_or(E::EventNotFound(ticket.event_id))?;
    if event.has_passed(OffsetDateTime::now_utc()) {
        return Err(E::EventHasPassed(event.id));
    }

    let ticket = state
        .db_client
        .insert_ticket(&ticket)
        .await
        .map_err(|e| {
            // The event is never deleted through the API, but the row may
            // still vanish between the lookup above and the insert.
            if db::is_foreign_key_violation(&e) {
                E::EventNotFound(ticket.event_id)
            } else {
                E::DbError(e)
            }
        })?
        .ok_or(E::TicketAlreadyExists)?;
    tracing::info!(
        id = %ticket.id,
        event_id = %ticket.event_id,
        "ticket created",
    );

    Ok((StatusCode::CREATED, Json(ticket.into())))
}

#[derive(Debug, From)]
pub enum CreateTicketError {
    #[from]
    DbError(db::Error),
    EventHasPassed(api::event::Id),
    EventNotFound(api::event::Id),
    TicketAlreadyExists,
    #[from]
    Validation(api::validation::Error),
}

impl IntoResponse for CreateTicketError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(e) => {
                tracing::warn!("invalid ticket: {e}");
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::EventNotFound(id) => {
                tracing::warn!(%id, "event not found");
                StatusCode::NOT_FOUND
            }
            Self::EventHasPassed(id) => {
                tracing::warn!(%id, "event has already passed");
                StatusCode::FORBIDDEN
            }
            Self::TicketAlreadyExists => {
                tracing::warn!("ticket with the same code exists");
                StatusCode::CONFLICT
            }
            Self::DbError(e) => {
                tracing::error!("failed to create ticket: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
        .into_response()
    }
}

async fn redeem_ticket(
    State(state): State<SharedAppState>,
    PathId(id): PathId<api::ticket::Id>,
) -> Result<StatusCode, RedeemTicketError> {
    use RedeemTicketError as E;

    let ticket = state
        .db_client
        .get_ticket_by_id(id)
        .await?
        .ok_or(E::TicketNotFound(id))?;
    if ticket.used {
        return Err(E::TicketAlreadyUsed(id));
    }

    let event = state
        .db_client
        .get_event_by_id(ticket.event_id)
        .await?
        .ok_or(E::EventNotFound(ticket.event_id))?;
    if event.has_passed(OffsetDateTime::now_utc()) {
        return Err(E::EventHasPassed(event.id));
    }

    if !state.db_client.mark_ticket_used(id).await? {
        return Err(E::TicketAlreadyUsed(id));
    }
    tracing::info!(%id, "ticket redeemed");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, From)]
pub enum RedeemTicketError {
    #[from]
    DbError(db::Error),
    EventHasPassed(api::event::Id),
    EventNotFound(api::event::Id),
    TicketAlreadyUsed(api::ticket::Id),
    TicketNotFound(api::ticket::Id),
}

impl IntoResponse for RedeemTicketError {
    fn into_response(self) -> Response {
        match self {
            Self::TicketNotFound(id) => {
                tracing::warn!(%id, "ticket not found");
                StatusCode::NOT_FOUND
            }
            Self::TicketAlreadyUsed(id) => {
                tracing::warn!(%id, "ticket is already used");
                StatusCode::FORBIDDEN
            }
            Self::EventHasPassed(id) => {
                tracing::warn!(%id, "event has already passed");
                StatusCode::FORBIDDEN
            }
            Self::EventNotFound(id) => {
                tracing::error!(%id, "ticket refers to a missing event");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::DbError(e) => {
                tracing::error!("failed to redeem ticket: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
        .into_response()
    }
}

type SharedAppState = Arc<AppState>;

struct AppState {
    db_client: db::Client,
}

/// Single positive integer identifier in the request path.
pub struct PathId<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathId<T>
where
    S: Send + Sync,
    T: FromStr + Send,
{
    type Rejection = InvalidIdError;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| InvalidIdError(None))?;
        raw.parse()
            .map(Self)
            .map_err(|_| InvalidIdError(Some(raw)))
    }
}

#[derive(Debug)]
pub struct InvalidIdError(Option<String>);

impl IntoResponse for InvalidIdError {
    fn into_response(self) -> Response {
        match self.0 {
            Some(raw) => tracing::warn!(id = %raw, "invalid identifier"),
            None => tracing::warn!("missing identifier"),
        }
        StatusCode::BAD_REQUEST.into_response()
    }
}

/// JSON request body whose shape errors are reported as
/// `422 Unprocessable Entity`.
pub struct Payload<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = InvalidPayloadError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(input)| Self(input))
            .map_err(InvalidPayloadError)
    }
}

#[derive(Debug)]
pub struct InvalidPayloadError(JsonRejection);

impl IntoResponse for InvalidPayloadError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            JsonRejection::JsonDataError(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            rejection => rejection.status(),
        };
        tracing::warn!(%status, "invalid payload: {}", self.0.body_text());
        status.into_response()
    }
}
