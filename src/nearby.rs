use std::{thread::sleep, time::Duration};

use _model::{GridKey, PlaceRecord};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use ureq::{Agent, AgentBuilder};

pub const ENDPOINT: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";

/// Anything that can list the places around a grid point.
pub trait PlaceSearch {
    fn search(&self, location: &GridKey, radius: u32) -> Result<Vec<PlaceRecord>, SearchError>;
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("request failed: {0}")]
    Transport(#[from] Box<ureq::Error>),
    #[error("couldn't decode response: {0}")]
    Decode(#[from] std::io::Error),
    #[error("api returned {status}: {message}")]
    Api { status: String, message: String },
}

#[derive(Copy, Clone, Debug)]
pub struct Pagination {
    pub max_extra_pages: u32,
    pub page_delay: Duration,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            max_extra_pages: 3,
            page_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NearbyResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<PlaceRecord>,
    pub next_page_token: Option<String>,
    pub error_message: Option<String>,
}

/// Collects the first page and up to `max_extra_pages` continuation pages.
/// A bad status on a continuation page ends pagination early with what has
/// been gathered so far; errors from `next` fail the whole search.
pub fn paginate(
    first: NearbyResponse,
    pagination: &Pagination,
    mut next: impl FnMut(&str) -> Result<NearbyResponse, SearchError>,
) -> Result<Vec<PlaceRecord>, SearchError> {
    match first.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(Vec::new()),
        _ => {
            return Err(SearchError::Api {
                status: first.status,
                message: first.error_message.unwrap_or_default(),
            })
        }
    }

    let mut output = first.results;
    let mut token = first.next_page_token;
    for page in 1..=pagination.max_extra_pages {
        let Some(x) = token.take() else { break };

        sleep(pagination.page_delay);
        let response = next(&x)?;
        if response.status != "OK" {
            debug!(page, status = %response.status, "pagination stopped");
            break;
        }
        output.extend(response.results);
        token = response.next_page_token;
    }

    Ok(output)
}

pub struct NearbySearch {
    agent: Agent,
    endpoint: String,
    api_key: String,
    pagination: Pagination,
}

impl NearbySearch {
    pub fn new(api_key: String, pagination: Pagination) -> Self {
        Self {
            agent: AgentBuilder::new()
                .user_agent("placegrid")
                .timeout(Duration::from_secs(30))
                .build(),
            endpoint: ENDPOINT.to_string(),
            api_key,
            pagination,
        }
    }

    fn fetch(&self, query: &[(&str, &str)]) -> Result<NearbyResponse, SearchError> {
        let mut request = self.agent.get(&self.endpoint).query("key", &self.api_key);
        for (k, v) in query {
            request = request.query(k, v);
        }
        let response = request.call().map_err(Box::new)?;
        Ok(response.into_json()?)
    }
}

impl PlaceSearch for NearbySearch {
    fn search(&self, location: &GridKey, radius: u32) -> Result<Vec<PlaceRecord>, SearchError> {
        let radius = radius.to_string();
        let first = self.fetch(&[("location", location.as_str()), ("radius", &radius)])?;
        debug!(%location, results = first.results.len(), status = %first.status, "first page");

        paginate(first, &self.pagination, |token| {
            self.fetch(&[("pagetoken", token)])
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn page(status: &str, ids: &[&str], token: Option<&str>) -> NearbyResponse {
        NearbyResponse {
            status: status.to_string(),
            results: ids.iter().map(|x| PlaceRecord::new(x, x, &[])).collect(),
            next_page_token: token.map(|x| x.to_string()),
            error_message: None,
        }
    }

    fn fast(max_extra_pages: u32) -> Pagination {
        Pagination {
            max_extra_pages,
            page_delay: Duration::ZERO,
        }
    }

    fn ids(records: &[PlaceRecord]) -> Vec<&str> {
        records.iter().flat_map(|x| x.place_id.as_deref()).collect()
    }

    #[test]
    fn follows_tokens() {
        let mut pages = vec![page("OK", &["C"], None), page("OK", &["B"], Some("t2"))];
        let seen = RefCell::new(Vec::new());
        let records = paginate(page("OK", &["A"], Some("t1")), &fast(3), |token| {
            seen.borrow_mut().push(token.to_string());
            Ok(pages.pop().unwrap_or_default())
        })
        .unwrap();

        assert_eq!(ids(&records), vec!["A", "B", "C"]);
        assert_eq!(seen.into_inner(), vec!["t1", "t2"]);
    }

    #[test]
    fn caps_extra_pages() {
        let mut calls = 0;
        let records = paginate(page("OK", &["A"], Some("t")), &fast(3), |_| {
            calls += 1;
            Ok(page("OK", &["X"], Some("t")))
        })
        .unwrap();

        assert_eq!(calls, 3);
        assert_eq!(records.len(), 4);
    }

    #[test]
    fn bad_continuation_keeps_partial() {
        let records = paginate(page("OK", &["A"], Some("t")), &fast(3), |_| {
            Ok(page("INVALID_REQUEST", &[], None))
        })
        .unwrap();
        assert_eq!(ids(&records), vec!["A"]);
    }

    #[test]
    fn transport_error_fails_search() {
        let result = paginate(page("OK", &["A"], Some("t")), &fast(3), |_| {
            Err(SearchError::Decode(std::io::Error::other("truncated")))
        });
        assert!(matches!(result, Err(SearchError::Decode(_))));
    }

    #[test]
    fn first_page_status() {
        let records = paginate(page("ZERO_RESULTS", &[], None), &fast(3), |_| unreachable!()).unwrap();
        assert!(records.is_empty());

        let mut denied = page("REQUEST_DENIED", &[], None);
        denied.error_message = Some("The provided API key is invalid.".to_string());
        match paginate(denied, &fast(3), |_| unreachable!()) {
            Err(SearchError::Api { status, message }) => {
                assert_eq!(status, "REQUEST_DENIED");
                assert_eq!(message, "The provided API key is invalid.");
            }
            x => panic!("unexpected {x:?}"),
        }
    }

    #[test]
    fn decode_response() {
        let response: NearbyResponse = serde_json::from_str(
            r#"{
                "html_attributions": [],
                "next_page_token": "abc",
                "results": [
                    {"place_id": "A", "name": "Cafe", "types": ["cafe", "food"], "vicinity": "x"},
                    {"name": "No id"}
                ],
                "status": "OK"
            }"#,
        )
        .unwrap();
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0], PlaceRecord::new("A", "Cafe", &["cafe", "food"]));
        assert_eq!(response.next_page_token.as_deref(), Some("abc"));
    }
}
