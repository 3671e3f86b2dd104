use std::time::Duration;

use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};

use crate::common::errors::BackendError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the node's REST API. Every request carries the node password.
pub fn node_client(password: &str, user_agent: &str) -> Result<Client, BackendError> {
    let mut auth = HeaderValue::from_str(password)?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);

    Ok(Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}
