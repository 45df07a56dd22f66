//! Camera to Telegram topic routing.
//!
//! All notifications go to one parent chat (a forum supergroup). Each camera
//! can have its own topic inside it; the routing table is built once at
//! startup from `name|threadId` entries and only read afterwards.

use tracing::warn;

/// Where a notification is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    /// Parent chat id.
    pub chat_id: i64,
    /// Topic inside the parent chat, if any.
    pub thread_id: Option<i64>,
}

impl Destination {
    /// The parent chat itself, without a topic.
    pub fn chat(chat_id: i64) -> Self {
        Self {
            chat_id,
            thread_id: None,
        }
    }
}

/// One `camera -> topic` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Camera name as Frigate reports it.
    pub source: String,
    /// Topic id in the parent chat.
    pub thread_id: i64,
}

impl Route {
    /// Parse a `name|threadId` entry.
    ///
    /// Returns `None` for entries with the wrong field count or a
    /// non-numeric id.
    pub fn parse(entry: &str) -> Option<Self> {
        let mut parts = entry.split('|');
        let (name, id) = match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(id), None) => (name.trim(), id.trim()),
            _ => return None,
        };

        let thread_id = id.parse::<i64>().ok()?;
        Some(Self {
            source: name.to_string(),
            thread_id,
        })
    }
}

/// Immutable routing table.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    default_chat_id: i64,
    routes: Vec<Route>,
}

impl RoutingTable {
    /// Create a table from already parsed routes.
    pub fn new(default_chat_id: i64, routes: Vec<Route>) -> Self {
        Self {
            default_chat_id,
            routes,
        }
    }

    /// Build a table from raw `name|threadId` entries, skipping malformed ones.
    pub fn from_entries<I, S>(default_chat_id: i64, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let routes = entries
            .into_iter()
            .filter_map(|entry| {
                let entry = entry.as_ref();
                let route = Route::parse(entry);
                if route.is_none() {
                    warn!(entry = %entry, "Skipping malformed routing entry, expected name|threadId");
                }
                route
            })
            .collect();

        Self::new(default_chat_id, routes)
    }

    /// Parent chat id every destination belongs to.
    pub fn default_chat_id(&self) -> i64 {
        self.default_chat_id
    }

    /// The fallback destination.
    pub fn default_destination(&self) -> Destination {
        Destination::chat(self.default_chat_id)
    }

    /// Configured routes, in configuration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Find the destination for a camera.
    ///
    /// First matching entry wins. Unknown cameras fall back to the default
    /// destination; this never fails.
    pub fn resolve(&self, source: &str) -> Destination {
        match self.routes.iter().find(|r| r.source == source) {
            Some(route) => Destination {
                chat_id: self.default_chat_id,
                thread_id: Some(route.thread_id),
            },
            None => {
                warn!(camera = %source, "No topic configured for camera, using default chat");
                self.default_destination()
            }
        }
    }

    /// Reverse lookup: which camera owns a topic.
    pub fn source_for_thread(&self, thread_id: i64) -> Option<&str> {
        self.routes
            .iter()
            .find(|r| r.thread_id == thread_id)
            .map(|r| r.source.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_parse() {
        assert_eq!(
            Route::parse("front|42"),
            Some(Route {
                source: "front".to_string(),
                thread_id: 42
            })
        );
        assert_eq!(Route::parse(" garage | 7 ").map(|r| r.thread_id), Some(7));
        assert_eq!(Route::parse("front"), None);
        assert_eq!(Route::parse("front|42|extra"), None);
        assert_eq!(Route::parse("front|abc"), None);
    }

    #[test]
    fn test_from_entries_skips_malformed() {
        let table = RoutingTable::from_entries(-100, ["front|42", "broken", "back|x", "yard|9"]);
        let names: Vec<_> = table.routes().iter().map(|r| r.source.as_str()).collect();
        assert_eq!(names, vec!["front", "yard"]);
    }

    #[test]
    fn test_resolve_known_camera() {
        let table = RoutingTable::from_entries(-100, ["front|42"]);
        assert_eq!(
            table.resolve("front"),
            Destination {
                chat_id: -100,
                thread_id: Some(42)
            }
        );
    }

    #[test]
    fn test_resolve_unknown_camera_falls_back() {
        let table = RoutingTable::from_entries(-100, ["front|42"]);
        assert_eq!(table.resolve("unknown-camera"), Destination::chat(-100));
    }

    #[test]
    fn test_first_entry_wins() {
        let table = RoutingTable::from_entries(-100, ["front|1", "front|2"]);
        assert_eq!(table.resolve("front").thread_id, Some(1));
    }

    #[test]
    fn test_source_for_thread() {
        let table = RoutingTable::from_entries(-100, ["front|42", "back|43"]);
        assert_eq!(table.source_for_thread(43), Some("back"));
        assert_eq!(table.source_for_thread(99), None);
    }
}
