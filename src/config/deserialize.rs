// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles keep counts and server lists.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::ServerConfig;

pub fn deserialize_keep_releases<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let keep = usize::deserialize(deserializer)?;
    if keep == 0 {
        return Err(serde::de::Error::custom("keep_releases must be at least 1"));
    }
    Ok(keep)
}

pub fn deserialize_keep_releases_option<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<usize>::deserialize(deserializer)? {
        Some(0) => Err(serde::de::Error::custom("keep_releases must be at least 1")),
        other => Ok(other),
    }
}

pub fn deserialize_servers<'de, D>(deserializer: D) -> Result<NonEmpty<ServerConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<ServerEntry> = Vec::deserialize(deserializer)?;
    let servers = into_servers(values).map_err(serde::de::Error::custom)?;

    NonEmpty::from_vec(servers)
        .ok_or_else(|| serde::de::Error::custom("at least one server is required"))
}

pub fn deserialize_servers_option<'de, D>(
    deserializer: D,
) -> Result<Option<NonEmpty<ServerConfig>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<Vec<ServerEntry>> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(None),
        Some(values) => {
            let servers = into_servers(values).map_err(serde::de::Error::custom)?;
            let nonempty = NonEmpty::from_vec(servers).ok_or_else(|| {
                serde::de::Error::custom("destination servers list cannot be empty")
            })?;
            Ok(Some(nonempty))
        }
    }
}

fn into_servers(values: Vec<ServerEntry>) -> Result<Vec<ServerConfig>, String> {
    values
        .into_iter()
        .map(|entry| match entry {
            ServerEntry::Simple(s) => ServerConfig::parse(&s),
            ServerEntry::Detailed(c) => Ok(c),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    Simple(String),
    Detailed(ServerConfig),
}
