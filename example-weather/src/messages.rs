#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum WeatherStationKind {
    Unspecified = 0,
    Ground = 1,
    Buoy = 2,
    Sat = 3,
}

#[derive(Clone, PartialEq, Eq, prost::Message, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeatherStationId {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeatherStation {
    #[prost(message, optional, tag = "1")]
    pub ws_id: Option<WeatherStationId>,
    #[prost(enumeration = "WeatherStationKind", tag = "2")]
    pub kind: i32,
    #[prost(string, tag = "3")]
    pub name: String,
    /// Filled in by the server from the request context.
    #[prost(string, tag = "4")]
    pub context_data: String,
}

impl WeatherStation {
    pub fn station_id(&self) -> &str {
        self.ws_id.as_ref().map(|id| id.id.as_str()).unwrap_or_default()
    }
}
