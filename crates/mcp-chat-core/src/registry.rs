//! Server and tool descriptors published by the backend registry.
//!
//! These mirror `GET /api/servers`. The client fetches them once at startup
//! and never refreshes them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Separator the backend uses between server and tool in model-facing names.
pub const QUALIFIED_NAME_SEPARATOR: &str = "__";

/// A tool exposed by a connected server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, unique within its server.
    pub name: String,
    /// Human-readable description. Tools without one report an empty string.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// JSON schema for the tool's input, kept opaque.
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// A server known to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    /// Server name (unique key).
    pub name: String,
    /// Whether the backend holds a live session to it.
    #[serde(default)]
    pub connected: bool,
    /// Tools in the order the server listed them.
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

impl ServerDescriptor {
    /// Look up a tool by name.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }
}

/// Response body for the server listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListServersResponse {
    /// Known servers.
    #[serde(default)]
    pub servers: Vec<ServerDescriptor>,
}

/// Split a model-facing tool name (`server__tool`) into its parts.
///
/// Names without the separator come back with no server.
#[must_use]
pub fn split_tool_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(QUALIFIED_NAME_SEPARATOR) {
        Some((server, tool)) if !server.is_empty() => (Some(server), tool),
        _ => (None, name),
    }
}

/// Find the server that exposes `tool_name`.
///
/// Accepts both plain and qualified names.
#[must_use]
pub fn find_tool_server<'a>(servers: &'a [ServerDescriptor], tool_name: &str) -> Option<&'a str> {
    let (qualifier, bare) = split_tool_name(tool_name);
    servers
        .iter()
        .filter(|s| qualifier.map_or(true, |q| q == s.name))
        .find(|s| s.tool(bare).is_some())
        .map(|s| s.name.as_str())
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn servers() -> Vec<ServerDescriptor> {
        let body = json!({
            "servers": [
                {
                    "name": "filesystem",
                    "connected": true,
                    "tools": [
                        {"name": "list_files", "description": "List a directory", "inputSchema": {"type": "object"}},
                        {"name": "read_file", "description": null, "inputSchema": {"type": "object"}}
                    ]
                },
                {"name": "weather", "connected": true, "tools": [
                    {"name": "forecast", "description": "Forecast", "inputSchema": {}}
                ]}
            ]
        });
        serde_json::from_value::<ListServersResponse>(body).unwrap().servers
    }

    #[test]
    fn parses_registry_listing() {
        let servers = servers();
        assert_eq!(servers.len(), 2);
        assert!(servers[0].connected);
        assert_eq!(servers[0].tools[0].name, "list_files");
        assert_eq!(servers[0].tools[0].input_schema["type"], "object");
    }

    #[test]
    fn null_description_becomes_empty() {
        assert_eq!(servers()[0].tools[1].description, "");
    }

    #[test]
    fn missing_tools_default_to_empty() {
        let server: ServerDescriptor = serde_json::from_str(r#"{"name":"bare"}"#).unwrap();
        assert!(server.tools.is_empty());
        assert!(!server.connected);
    }

    #[test]
    fn splits_qualified_names() {
        assert_eq!(split_tool_name("fs__read"), (Some("fs"), "read"));
        assert_eq!(split_tool_name("read"), (None, "read"));
        assert_eq!(split_tool_name("__read"), (None, "__read"));
        assert_eq!(split_tool_name("a__b__c"), (Some("a"), "b__c"));
    }

    #[test]
    fn finds_tool_server() {
        let servers = servers();
        assert_eq!(find_tool_server(&servers, "forecast"), Some("weather"));
        assert_eq!(find_tool_server(&servers, "filesystem__read_file"), Some("filesystem"));
        assert_eq!(find_tool_server(&servers, "weather__read_file"), None);
        assert_eq!(find_tool_server(&servers, "missing"), None);
    }

    #[test]
    fn input_schema_serializes_camel_case() {
        let tool = ToolDescriptor {
            name: "t".into(),
            description: String::new(),
            input_schema: json!({}),
        };
        let value = serde_json::to_value(&tool).unwrap();
        assert!(value.get("inputSchema").is_some());
    }
}
