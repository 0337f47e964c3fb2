//! Filter and update documents for the backfill

use bson::{doc, Bson, Document as BsonDocument};

/// Selection predicate `{ <field>: { "$exists": false } }`
///
/// The field name is inserted as given; dotted names keep MongoDB's
/// usual path semantics.
pub fn missing_field_filter(field: &str) -> BsonDocument {
    let mut filter = BsonDocument::new();
    filter.insert(field, doc! { "$exists": false });
    filter
}

/// Filter addressing a single document by its `_id`
pub fn id_filter(id: &Bson) -> BsonDocument {
    doc! { "_id": id.clone() }
}

/// Update document `{ "$set": { <field>: <value> } }`
pub fn set_field_update(field: &str, value: &Bson) -> BsonDocument {
    let mut fields = BsonDocument::new();
    fields.insert(field, value.clone());
    doc! { "$set": fields }
}

/// Human-readable form of a document identifier
///
/// ObjectIds print as bare hex and strings without quotes; every other
/// type falls back to its BSON display form.
pub fn display_id(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}
