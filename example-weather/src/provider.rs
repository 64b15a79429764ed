use std::{collections::HashMap, sync::OnceLock};

use twirp::{
    server::{InboundCall, ServerMiddleware},
    ContextKey, Owned, RequestScope, Status,
};

use crate::{
    messages::{WeatherStation, WeatherStationId},
    service::WsProvider,
};

pub const CLIENT_HEADER: &str = "x-weather-client";

/// Who is asking, as reported by the `x-weather-client` header.
pub struct ClientName;
impl ContextKey for ClientName {
    type Value = String;
    const NAME: &'static str = "client_name";

    fn default_value() -> &'static String {
        static DEFAULT: OnceLock<String> = OnceLock::new();
        DEFAULT.get_or_init(|| "anonymous".to_string())
    }
}

pub struct ClientNameFromHeader;
impl ServerMiddleware for ClientNameFromHeader {
    fn handle(&self, call: &mut InboundCall<'_>) -> twirp::Result<()> {
        let Some(value) = call.request().headers().get(CLIENT_HEADER) else {
            return Ok(());
        };
        let name = value
            .to_str()
            .map_err(|_| Status::invalid_argument("client name must be ascii"))?
            .to_string();
        call.context_mut().set::<ClientName>(name);
        Ok(())
    }
}

/// Keeps stations in memory, keyed by id.
pub struct InMemoryStations {
    stations: k_lock::Mutex<HashMap<String, WeatherStation>>,
}

impl InMemoryStations {
    pub fn new() -> Self {
        Self {
            stations: k_lock::Mutex::new(HashMap::new()),
        }
    }

    #[allow(clippy::expect_used)]
    fn with_stations<T>(&self, f: impl FnOnce(&mut HashMap<String, WeatherStation>) -> T) -> T {
        f(&mut self.stations.lock().expect("brief internal mutex must work"))
    }
}

impl Default for InMemoryStations {
    fn default() -> Self {
        Self::new()
    }
}

impl WsProvider for InMemoryStations {
    fn find_weather_station(
        &self,
        request: &WeatherStationId,
        scope: &mut RequestScope<'_>,
    ) -> twirp::Result<Owned<WeatherStation>> {
        let mut station = self
            .with_stations(|stations| stations.get(&request.id).cloned())
            .ok_or_else(|| Status::not_found(format!("no station {}", request.id)))?;
        station.context_data = scope.context().get::<ClientName>().clone();
        Ok(scope.alloc(station))
    }

    fn delete_weather_station(
        &self,
        request: &WeatherStationId,
        scope: &mut RequestScope<'_>,
    ) -> twirp::Result<Owned<WeatherStationId>> {
        match self.with_stations(|stations| stations.remove(&request.id)) {
            Some(_) => {
                log::info!(
                    "{} deleted station {}",
                    scope.context().get::<ClientName>(),
                    request.id
                );
                Ok(scope.alloc(request.clone()))
            }
            None => Err(Status::not_found(format!("no station {}", request.id))),
        }
    }

    fn update_weather_station(
        &self,
        request: &WeatherStation,
        scope: &mut RequestScope<'_>,
    ) -> twirp::Result<Owned<WeatherStation>> {
        if request.station_id().is_empty() {
            return Err(Status::invalid_argument("station id is required")
                .with_metadata("argument", "ws_id"));
        }
        self.with_stations(|stations| {
            stations.insert(request.station_id().to_string(), request.clone())
        });

        let mut station = request.clone();
        station.context_data = scope.context().get::<ClientName>().clone();
        Ok(scope.alloc(station))
    }
}
