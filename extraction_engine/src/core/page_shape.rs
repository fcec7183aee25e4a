// @file: extraction_engine/src/core/page_shape.rs
// @description: Detects where a page payload keeps its items and how it signals the next page.
// @author: LAS.

use serde_json::Value;


//
// KNOWN KEY SETS (priority order)
//

pub const ITEM_KEYS: [&str; 6] = ["data", "result", "list", "rows", "orderList", "fillList"];
pub const CURSOR_KEYS: [&str; 3] = ["cursor", "nextCursor", "next"];
pub const NEXT_FLAG_KEY: &str = "nextFlag";


//
// TYPE DEFINITIONS
//

#[derive(Debug, Clone, PartialEq)]
pub enum Continuation {
    /// Explicit token to send back as the next cursor.
    Cursor(String),
    /// More pages may exist; the caller derives the cursor from the last item's id.
    FromLastItem,
    /// The payload says there is nothing after this page.
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageShape {
    pub items: Vec<Value>,
    pub continuation: Continuation,
}


//
// PUBLIC INTERFACE
//

/// Normalise the `data` member of an envelope.
///
/// - A bare array is the item list; the next cursor comes from the last item.
/// - An object holds the list under the first of [`ITEM_KEYS`] carrying a
///   non-empty array. Continuation is decided in this order: `nextFlag == false`
///   ends, a [`CURSOR_KEYS`] token continues explicitly, `nextFlag == true`
///   continues from the last item, anything else ends.
/// - Any other value is an empty, final page.
pub fn detect_page_shape(data: &Value) -> PageShape {
    match data {
        Value::Array(items) => PageShape {
            items: items.clone(),
            continuation: Continuation::FromLastItem,
        },
        Value::Object(map) => {
            let items: Vec<Value> = ITEM_KEYS
                .iter()
                .find_map(|key| match map.get(*key) {
                    Some(Value::Array(list)) if !list.is_empty() => Some(list.clone()),
                    _ => None,
                })
                .unwrap_or_default();

            let next_flag: Option<bool> = map.get(NEXT_FLAG_KEY).and_then(as_flag);
            let cursor: Option<String> = CURSOR_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(as_cursor));

            let continuation = match (next_flag, cursor) {
                (Some(false), _) => Continuation::End,
                (_, Some(token)) => Continuation::Cursor(token),
                (Some(true), None) => Continuation::FromLastItem,
                (None, None) => Continuation::End,
            };

            PageShape { items, continuation }
        }
        _ => PageShape {
            items: Vec::new(),
            continuation: Continuation::End,
        },
    }
}


//
// INTERNAL HELPERS
//

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_cursor(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
