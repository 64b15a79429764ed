//! The `weather.WSProvider` service as a code generator would emit it: a trait to
//! implement, a host that registers it with a server, and a typed client.

use std::sync::Arc;

use twirp::{
    client::{Requester, ServiceClient},
    Arena, Encoding, Owned, RequestContext, RequestScope, ServiceDescriptor,
};

use crate::messages::{WeatherStation, WeatherStationId};

pub const SERVICE_NAME: &str = "weather.WSProvider";

pub trait WsProvider: Send + Sync + 'static {
    fn find_weather_station(
        &self,
        request: &WeatherStationId,
        scope: &mut RequestScope<'_>,
    ) -> twirp::Result<Owned<WeatherStation>>;

    fn delete_weather_station(
        &self,
        request: &WeatherStationId,
        scope: &mut RequestScope<'_>,
    ) -> twirp::Result<Owned<WeatherStationId>>;

    fn update_weather_station(
        &self,
        request: &WeatherStation,
        scope: &mut RequestScope<'_>,
    ) -> twirp::Result<Owned<WeatherStation>>;
}

pub fn ws_provider_host<P: WsProvider>(provider: P) -> ServiceDescriptor<P> {
    ServiceDescriptor::new(SERVICE_NAME, provider)
        .unary("FindWeatherStation", P::find_weather_station)
        .unary("DeleteWeatherStation", P::delete_weather_station)
        .unary("UpdateWeatherStation", P::update_weather_station)
}

#[derive(Debug, Clone)]
pub struct WsProviderClient {
    inner: ServiceClient,
}

impl WsProviderClient {
    pub fn new(requester: Arc<dyn Requester>, encoding: Encoding) -> Self {
        Self {
            inner: ServiceClient::new(requester, SERVICE_NAME, encoding),
        }
    }

    pub async fn find_weather_station(
        &self,
        arena: Option<&Arena>,
        context: &RequestContext,
        request: &WeatherStationId,
    ) -> twirp::Result<Owned<WeatherStation>> {
        self.inner
            .call(arena, context, "FindWeatherStation", request)
            .await
    }

    pub async fn delete_weather_station(
        &self,
        arena: Option<&Arena>,
        context: &RequestContext,
        request: &WeatherStationId,
    ) -> twirp::Result<Owned<WeatherStationId>> {
        self.inner
            .call(arena, context, "DeleteWeatherStation", request)
            .await
    }

    pub async fn update_weather_station(
        &self,
        arena: Option<&Arena>,
        context: &RequestContext,
        request: &WeatherStation,
    ) -> twirp::Result<Owned<WeatherStation>> {
        self.inner
            .call(arena, context, "UpdateWeatherStation", request)
            .await
    }
}
