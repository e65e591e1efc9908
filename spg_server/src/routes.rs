//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every store and rail call in the engine is async, so keep it that
//! way: no blocking I/O or `std::thread::sleep` in a handler.
use actix_web::{web, HttpRequest, HttpResponse};
use log::*;
use serde_json::json;
use spg_engine::{
    order_types::{Alias, NewOrderRequest, PaymentMethod},
    traits::{KeyValueStore, PaymentRail},
    IngestOutcome,
    SettlementEngine,
};

use crate::{
    config::ServerOptions,
    data_objects::{OrderResponse, StatusRequest, StatusResponse, WebhookParams},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
// Every route answers other HTTP methods with 405.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .route(actix_web::web::route().guard(actix_web::guard::$method()).to($name))
                        .default_service(actix_web::web::route().to($crate::routes::method_not_allowed));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .route(actix_web::web::route().guard(actix_web::guard::$method()).to($name::< $( [< T $bounds:camel >], )+>))
                    .default_service(actix_web::web::route().to($crate::routes::method_not_allowed));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

pub async fn method_not_allowed(req: HttpRequest) -> HttpResponse {
    debug!("💻️ {} {} is not allowed", req.method(), req.path());
    HttpResponse::MethodNotAllowed().json(json!({ "error": "Method not allowed" }))
}

/// Malformed JSON bodies are reported as 400s with the usual `{"error": ...}` body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().content_type_required(false).error_handler(|err, _req| {
        debug!("💻️ Could not read JSON request body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

// ----------------------------------------------   Health  ----------------------------------------------------
route!(health => Get "/health");
pub async fn health() -> HttpResponse {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(place_order => Post "/orders" impl KeyValueStore, PaymentRail);
/// Route handler for new orders.
///
/// The body is a [`NewOrderRequest`]. The total is recomputed server-side; the client's `price` must match it.
/// On success the response carries the order id, the rail's aliases and the payment instructions (an iDEAL checkout
/// `url` or a Lightning `invoice`).
///
/// * 400: the request failed validation. The error message says why.
/// * 502: the payment provider failed or refused to create the payment. The client may retry with a new order.
/// * 500: anything else.
pub async fn place_order<S, R>(
    body: web::Json<NewOrderRequest>,
    engine: web::Data<SettlementEngine<S, R>>,
) -> Result<HttpResponse, ServerError>
where
    S: KeyValueStore,
    R: PaymentRail,
{
    trace!("💻️ Received new order request");
    let placed = engine.order_flow().place_order(body.into_inner()).await?;
    debug!("💻️ Order {} created with {} alias(es)", placed.order.order_id, placed.payment.aliases.len());
    Ok(HttpResponse::Ok().json(OrderResponse::from(placed)))
}

//----------------------------------------------   Status  ----------------------------------------------------
route!(payment_status => Post "/payments/status" impl KeyValueStore, PaymentRail);
/// Route handler for client polls.
///
/// Answers `{"paid": true | false | "unknown", "status": "paid" | "pending" | "unknown"}`. Internal problems are
/// never reported here; they read as `unknown`, and the client keeps polling.
pub async fn payment_status<S, R>(
    body: web::Json<StatusRequest>,
    engine: web::Data<SettlementEngine<S, R>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    S: KeyValueStore,
    R: PaymentRail,
{
    let StatusRequest { alias, secondary } = body.into_inner();
    let alias = alias
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .map(Alias::from)
        .ok_or_else(|| ServerError::ValidationError("Missing required field: alias".into()))?;
    let secondary = secondary.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).map(Alias::from);
    let status = engine.poller().check_status(&alias, secondary.as_ref()).await;
    let reported = options.unknown_status_policy.apply(status);
    trace!("💻️ Status for {alias}: {status} (reported as {reported})");
    Ok(HttpResponse::Ok().json(StatusResponse::new(reported)))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(settlement_webhook => Post "/webhooks/settlement" impl KeyValueStore, PaymentRail);
/// Route handler for settlement pushes from the payment rails.
///
/// The rail is named in the `rail` query parameter (`lightning` or `ideal`), falling back to the configured default.
/// The signature is read from the configured signature header.
///
/// Everything except a bad signature is acknowledged with 200 "OK", so that rails do not retry-storm the endpoint.
/// Processing problems are logged instead.
pub async fn settlement_webhook<S, R>(
    req: HttpRequest,
    query: Result<web::Query<WebhookParams>, actix_web::Error>,
    body: web::Bytes,
    engine: web::Data<SettlementEngine<S, R>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    S: KeyValueStore,
    R: PaymentRail,
{
    let query = query.map(web::Query::into_inner).unwrap_or_else(|e| {
        warn!("💻️ Could not read the webhook query string ({}). {e}. Assuming the default rail", req.query_string());
        WebhookParams::default()
    });
    let rail = match query.rail.as_deref() {
        None => options.default_rail,
        Some(name) => match name.parse::<PaymentMethod>() {
            Ok(method) => method,
            Err(e) => {
                warn!("💻️ Ignoring a push for an unknown rail. {e}");
                return Ok(ok());
            },
        },
    };
    let signature = req.headers().get(options.signature_header.as_str()).and_then(|v| v.to_str().ok());
    debug!("💻️ Received a {rail} push ({} bytes)", body.len());
    let outcome = engine.worker().ingest(rail, &body, signature).await.map_err(|e| {
        warn!("💻️ Rejecting a {rail} push from {:?}. {e}", req.connection_info().peer_addr());
        ServerError::from(e)
    })?;
    match &outcome {
        IngestOutcome::Paid { order_id, dispatched } => {
            info!("💻️ {rail} push settled order {order_id} (confirmation dispatched: {dispatched})")
        },
        outcome => debug!("💻️ {rail} push handled: {outcome:?}"),
    }
    Ok(ok())
}

fn ok() -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}
