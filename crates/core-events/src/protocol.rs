//! Decoding of redraw notifications from their JSON form.
//!
//! The external engine sends `redraw` as a list of batches, one per event
//! kind, each carrying one or more argument tuples:
//!
//! ```text
//! [["hl_attr_define", [id, rgb_attrs, cterm_attrs, info]...],
//!  ["grid_line", [grid, row, col, cells, wrap?]...],
//!  ["flush"]]
//! ```
//!
//! Decoding is per tuple: a malformed tuple produces a `ProtocolError` for
//! that tuple only so the caller can skip it and keep the rest of the batch.

use core_highlight::{AttrFlags, HighlightAttrs, HlId, Rgb};
use serde_json::Value;
use thiserror::Error;

use crate::cells::{GridCell, expanded_len};
use crate::{GridId, MAX_GRID_COLS, MAX_GRID_ROWS, RedrawEvent};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("redraw notification must be an array")]
    NotAnArray,
    #[error("event batch must start with an event name")]
    MissingName,
    #[error("{event}: malformed arguments ({reason})")]
    BadArgs { event: String, reason: &'static str },
}

fn bad(event: &str, reason: &'static str) -> ProtocolError {
    ProtocolError::BadArgs {
        event: event.to_string(),
        reason,
    }
}

fn as_u64(v: Option<&Value>, event: &str, reason: &'static str) -> Result<u64, ProtocolError> {
    v.and_then(Value::as_u64).ok_or_else(|| bad(event, reason))
}

/// Non-negative integer strictly below `limit`.
fn as_index(v: Option<&Value>, limit: usize, event: &str, reason: &'static str) -> Result<usize, ProtocolError> {
    v.and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .filter(|&n| n < limit)
        .ok_or_else(|| bad(event, reason))
}

fn as_hl(v: &Value, event: &str) -> Result<HlId, ProtocolError> {
    v.as_u64()
        .and_then(|n| HlId::try_from(n).ok())
        .ok_or_else(|| bad(event, "highlight id"))
}

/// Decode one `redraw` payload into events, in protocol order.
///
/// Accepts either the bare batch list or a full `["redraw", [...]]`
/// notification.
pub fn decode_redraw(value: &Value) -> Result<Vec<Result<RedrawEvent, ProtocolError>>, ProtocolError> {
    let mut batches = value.as_array().ok_or(ProtocolError::NotAnArray)?;
    if let [Value::String(name), Value::Array(inner)] = batches.as_slice() {
        if name == "redraw" {
            batches = inner;
        }
    }

    let mut out = Vec::new();
    for batch in batches {
        let items = batch.as_array().ok_or(ProtocolError::NotAnArray)?;
        let name = items
            .first()
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingName)?;
        if name == "flush" {
            out.push(Ok(RedrawEvent::Flush));
            continue;
        }
        let tuples = &items[1..];
        if tuples.is_empty() {
            out.push(decode_event(name, &[]));
        }
        for args in tuples {
            let args = args.as_array().map(Vec::as_slice).unwrap_or(&[]);
            out.push(decode_event(name, args));
        }
    }
    Ok(out)
}

/// Decode a single event tuple.
pub fn decode_event(name: &str, args: &[Value]) -> Result<RedrawEvent, ProtocolError> {
    match name {
        "hl_attr_define" => {
            let id = as_hl(args.first().ok_or_else(|| bad(name, "missing id"))?, name)?;
            let attrs = args
                .get(1)
                .map(decode_attrs)
                .transpose()
                .map_err(|reason| bad(name, reason))?
                .unwrap_or_default();
            let groups = args.get(3).map(decode_groups).unwrap_or_default();
            Ok(RedrawEvent::AttributeDefine { id, attrs, groups })
        }
        "grid_line" => {
            let grid = as_u64(args.first(), name, "grid")?;
            let row = as_index(args.get(1), MAX_GRID_ROWS, name, "row")?;
            let col = as_index(args.get(2), MAX_GRID_COLS, name, "col")?;
            let cells = args
                .get(3)
                .and_then(Value::as_array)
                .ok_or_else(|| bad(name, "cells"))?
                .iter()
                .map(|c| decode_cell(c, name))
                .collect::<Result<Vec<_>, _>>()?;
            if col.saturating_add(expanded_len(&cells)) > MAX_GRID_COLS {
                return Err(bad(name, "row width"));
            }
            Ok(RedrawEvent::GridLine {
                grid: grid as GridId,
                row,
                col,
                cells,
            })
        }
        "grid_clear" => Ok(RedrawEvent::GridClear {
            grid: as_u64(args.first(), name, "grid")? as GridId,
        }),
        "grid_destroy" => Ok(RedrawEvent::GridDestroy {
            grid: as_u64(args.first(), name, "grid")? as GridId,
        }),
        "flush" => Ok(RedrawEvent::Flush),
        other => Ok(RedrawEvent::Other(other.to_string())),
    }
}

fn decode_cell(v: &Value, event: &str) -> Result<GridCell, ProtocolError> {
    let parts = v.as_array().ok_or_else(|| bad(event, "cell"))?;
    let text = parts
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| bad(event, "cell text"))?;
    let hl_id = parts.get(1).map(|h| as_hl(h, event)).transpose()?;
    let repeat = parts
        .get(2)
        .map(|r| as_index(Some(r), MAX_GRID_COLS + 1, event, "cell repeat"))
        .transpose()?;
    Ok(GridCell::new(text, hl_id, repeat))
}

fn decode_attrs(v: &Value) -> Result<HighlightAttrs, &'static str> {
    let map = v.as_object().ok_or("rgb attrs")?;
    let mut attrs = HighlightAttrs::default();
    for (key, val) in map {
        match key.as_str() {
            "foreground" => attrs.foreground = val.as_u64().map(|n| Rgb::new(n as u32)),
            "background" => attrs.background = val.as_u64().map(|n| Rgb::new(n as u32)),
            "special" => attrs.special = val.as_u64().map(|n| Rgb::new(n as u32)),
            "blend" => attrs.blend = val.as_u64().map(|n| n.min(100) as u8),
            other => {
                if let Some(flag) = AttrFlags::from_key(other).filter(|_| val.as_bool() == Some(true)) {
                    attrs.flags |= flag;
                }
            }
        }
    }
    Ok(attrs)
}

fn decode_groups(v: &Value) -> Vec<String> {
    let Some(items) = v.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|info| {
            let obj = info.as_object()?;
            obj.get("hi_name")
                .or_else(|| obj.get("ui_name"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .collect()
}
