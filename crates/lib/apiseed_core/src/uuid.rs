//! UUIDv7 identifiers.
//!
//! Every record ID is generated app-side as a UUIDv7 so that IDs sort by
//! creation time. The in-memory stores rely on this for list ordering.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// Parse a path segment as a record ID.
pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuidv7_is_valid() {
        let id = uuidv7();
        assert_eq!(id.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn ids_sort_by_creation() {
        let ids: Vec<Uuid> = (0..100).map(|_| uuidv7()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn parse_id_rejects_garbage() {
        let id = uuidv7();
        assert_eq!(parse_id(&id.to_string()), Some(id));
        assert_eq!(parse_id("5f1e2c"), None);
    }
}
