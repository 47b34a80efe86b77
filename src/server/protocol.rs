use serde::{Deserialize, Serialize};

use crate::error::ProxyError;
use crate::models::{Metadata, MutationId};

/// One element of a `/insert` body.
#[derive(Debug, Clone, Deserialize)]
pub struct InsertItem {
    pub id: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertResponse {
    #[serde(rename = "mutationId")]
    pub mutation_id: MutationId,
    pub inserted_num: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    #[serde(rename = "searchTerm")]
    pub search_term: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteRequest {
    #[serde(rename = "idsToDelete")]
    pub ids_to_delete: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub count: usize,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Decode a JSON body, reporting any failure as a validation error.
pub fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ProxyError> {
    serde_json::from_slice(body).map_err(|e| ProxyError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_query() {
        let req: QueryRequest = decode(br#"{"searchTerm": "rust"}"#).unwrap();
        assert_eq!(req.search_term, "rust");
    }

    #[test]
    fn test_decode_missing_field() {
        let err = decode::<DeleteRequest>(br#"{"ids": []}"#).unwrap_err();
        assert!(matches!(err, ProxyError::Validation(_)));
    }

    #[test]
    fn test_decode_insert_without_metadata() {
        let items: Vec<InsertItem> = decode(br#"[{"id": "1", "vector": [0.5, 0.5]}]"#).unwrap();
        assert_eq!(items[0].id, "1");
        assert!(items[0].metadata.is_empty());
    }

    #[test]
    fn test_insert_response_field_names() {
        let json = serde_json::to_value(InsertResponse {
            mutation_id: MutationId("m-1".to_string()),
            inserted_num: 2,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"mutationId": "m-1", "inserted_num": 2}));
    }
}
