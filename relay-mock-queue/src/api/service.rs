//! Service registry handler

use axum::{
    Json,
    extract::{Query, State},
};
use relay_core::dto::service::{ServiceEntry, ServiceList, ServiceMetadata};
use serde::Deserialize;

use crate::store::MockState;

#[derive(Debug, Deserialize)]
pub struct ServiceQuery {
    pub keyword: Option<String>,
    #[serde(rename = "perPage")]
    #[allow(dead_code)]
    pub per_page: Option<u32>,
}

/// GET /service
/// Lists the single configured service when it matches the keyword
pub async fn list_services(
    State(state): State<MockState>,
    Query(query): Query<ServiceQuery>,
) -> Json<ServiceList> {
    let matches = query
        .keyword
        .as_deref()
        .is_none_or(|keyword| state.service_name().contains(keyword));

    let data = if matches {
        vec![ServiceEntry {
            service_id: state.service_id().to_string(),
            resource_metadata: ServiceMetadata {
                name: state.service_name().to_string(),
            },
        }]
    } else {
        Vec::new()
    };

    Json(ServiceList { data })
}
