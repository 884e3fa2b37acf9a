//! Table-detail payloads shaped like Storage API responses

use serde_json::{json, Value};

/// `in.c-sales.orders` with basetype metadata for some columns
pub fn orders_detail(backend: &str) -> Value {
    json!({
        "id": "in.c-sales.orders",
        "name": "orders",
        "displayName": "orders",
        "primaryKey": ["ID"],
        "rowsCount": 100,
        "bucket": {
            "id": "in.c-sales",
            "name": "c-sales",
            "stage": "in",
            "backend": backend
        },
        "columns": ["ID", "AMOUNT", "QTY", "NOTE"],
        "columnMetadata": {
            "ID": [
                { "id": "1", "key": "KBC.datatype.type", "value": "NUMBER", "provider": "user" },
                { "id": "2", "key": "KBC.datatype.basetype", "value": "INTEGER", "provider": "user" }
            ],
            "AMOUNT": [
                { "id": "3", "key": "KBC.datatype.basetype", "value": "NUMERIC", "provider": "user" },
                { "id": "4", "key": "KBC.datatype.length", "value": "12,2", "provider": "user" }
            ],
            "NOTE": [
                { "id": "5", "key": "KBC.datatype.basetype", "value": "STRING", "provider": "user" }
            ]
        }
    })
}

/// Same table as seen by a BigQuery-backed project, without metadata
pub fn orders_detail_without_metadata() -> Value {
    let mut detail = orders_detail("bigquery");
    detail["columnMetadata"] = json!([]);
    detail["tablePhysicalName"] = json!("orders");
    detail
}
