use std::sync::Arc;

use messages::{WeatherStation, WeatherStationId, WeatherStationKind};
use provider::{ClientNameFromHeader, InMemoryStations, CLIENT_HEADER};
use service::{ws_provider_host, WsProviderClient};
use twirp::{
    client::{HttpRequester, LoopbackTransport, Requester, SetHeaderMiddleware},
    server::TwirpServer,
    Arena, Code, Encoding, RequestContext,
};

mod messages;
mod provider;
mod service;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let base_url =
        std::env::var("WEATHER_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

    let mut server = TwirpServer::default();
    server.register_service(ws_provider_host(InMemoryStations::new()));
    server.add_middleware(ClientNameFromHeader);
    for route in server.routes() {
        log::info!("serving {route}");
    }

    let mut requester = HttpRequester::new(base_url, LoopbackTransport::new(Arc::new(server)));
    requester.add_middleware(SetHeaderMiddleware::try_new(CLIENT_HEADER, "example-weather")?);
    let requester: Arc<dyn Requester> = Arc::new(requester);

    for encoding in [Encoding::Json, Encoding::Protobuf] {
        let client = WsProviderClient::new(requester.clone(), encoding);
        let arena = Arena::new();
        let context = RequestContext::new();
        exercise(&client, &arena, &context).await?;
        log::info!("{encoding:?} round released {} messages", arena.release());
    }
    Ok(())
}

async fn exercise(
    client: &WsProviderClient,
    arena: &Arena,
    context: &RequestContext,
) -> twirp::Result<()> {
    let id = WeatherStationId {
        id: "north-ridge".to_string(),
    };
    let updated = client
        .update_weather_station(
            Some(arena),
            context,
            &WeatherStation {
                ws_id: Some(id.clone()),
                kind: WeatherStationKind::Sat as i32,
                name: "North Ridge".to_string(),
                context_data: String::new(),
            },
        )
        .await?;
    log::info!("updated {updated:?}");

    let found = client.find_weather_station(Some(arena), context, &id).await?;
    log::info!("found {:?} station for {}", found.kind(), found.context_data);

    let deleted = client.delete_weather_station(None, context, &id).await?;
    log::info!("deleted {}", deleted.id);
    deleted.release();

    match client.find_weather_station(Some(arena), context, &id).await {
        Ok(station) => log::warn!("station survived deletion: {station:?}"),
        Err(status) if status.code() == Code::NotFound => log::info!("gone: {status}"),
        Err(status) => return Err(status),
    }
    Ok(())
}
