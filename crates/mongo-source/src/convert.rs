use mongodb::bson::{Bson, Document};
use mongodb::change_stream::event::{ChangeStreamEvent, OperationType};
use serde_json::Value;
use sheetsync_core::{ChangeEvent, Record};

// ─── Documents ────────────────────────────────────────────────────────────

/// Convert a BSON value into the JSON a spreadsheet cell can hold.
///
/// ObjectIds become their 24-char hex string and datetimes RFC 3339 text;
/// everything else goes through relaxed extended JSON, which keeps plain
/// numbers, strings and booleans as-is.
pub fn bson_to_value(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Value::String(s),
            Err(_) => Value::String(dt.to_string()),
        },
        Bson::Document(doc) => Value::Object(
            doc.into_iter()
                .map(|(k, v)| (k, bson_to_value(v)))
                .collect(),
        ),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_value).collect()),
        other => other.into_relaxed_extjson(),
    }
}

/// A stored document as a record, keeping the document's field order.
pub fn document_to_record(doc: Document) -> Record {
    doc.into_iter()
        .map(|(k, v)| (k, bson_to_value(v)))
        .collect()
}

// ─── Change events ────────────────────────────────────────────────────────

pub fn operation_name(op: &OperationType) -> String {
    match op {
        OperationType::Insert => "insert".into(),
        OperationType::Update => "update".into(),
        OperationType::Replace => "replace".into(),
        OperationType::Delete => "delete".into(),
        OperationType::Drop => "drop".into(),
        OperationType::Rename => "rename".into(),
        OperationType::DropDatabase => "dropDatabase".into(),
        OperationType::Invalidate => "invalidate".into(),
        OperationType::Other(name) => name.clone(),
        #[allow(unreachable_patterns)]
        other => format!("{other:?}"),
    }
}

fn key_text(key: &Bson) -> String {
    match key {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reduce a driver change event to the trigger the core understands.
pub fn change_event(collection: &str, event: &ChangeStreamEvent<Document>) -> ChangeEvent {
    let mut out = ChangeEvent::new(collection).with_operation(operation_name(&event.operation_type));
    out.document_key = event
        .document_key
        .as_ref()
        .and_then(|key| key.get("_id"))
        .map(key_text);
    out
}
