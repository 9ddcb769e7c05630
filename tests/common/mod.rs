use std::{
    fmt::Display,
    sync::atomic::{AtomicU32, Ordering},
};

use constcat::concat;
use event_tickets::api;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;

const BASE_URL: &str = "http://localhost:3000";

pub const FUTURE_DATE: &str = "2999-01-01";
pub const PAST_DATE: &str = "2000-01-01";

/// Name no other test run has used, so tests don't collide on the
/// `(name, date)` constraint of a shared database.
pub fn unique(prefix: &str) -> String {
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix} {nanos}-{n}")
}

pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
        }
    }

    pub async fn health(&self) -> Result<String, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/health");

        Ok(self
            .inner
            .get(URL)
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .text()
            .await
            .expect("failed to get a response"))
    }

    pub async fn list_events(&self) -> Result<Vec<api::Event>, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/events");

        Ok(self
            .inner
            .get(URL)
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<Vec<api::Event>>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn get_event(
        &self,
        id: impl Display,
    ) -> Result<api::Event, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/events");

        Ok(self
            .inner
            .get(format!("{URL}/{id}"))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::Event>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn create_event(
        &self,
        name: &str,
        date: &str,
    ) -> Result<api::Event, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/events");

        let res = self
            .inner
            .post(URL)
            .json(&json!({
                "name": name,
                "date": date,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?;
        assert_eq!(res.status(), StatusCode::CREATED);
        Ok(res
            .json::<api::Event>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn update_event(
        &self,
        id: impl Display,
        name: &str,
        date: &str,
    ) -> Result<api::Event, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/events");

        Ok(self
            .inner
            .put(format!("{URL}/{id}"))
            .json(&json!({
                "name": name,
                "date": date,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::Event>()
            .await
            .expect("failed to get a response"))
    }

    /// Sends an arbitrary body to `POST /events`, returning the status.
    pub async fn create_event_raw(
        &self,
        body: serde_json::Value,
    ) -> StatusCode {
        const URL: &str = concat!(BASE_URL, "/events");

        self.inner
            .post(URL)
            .json(&body)
            .send()
            .await
            .expect("failed to send a request")
            .status()
    }

    pub async fn list_tickets(
        &self,
        event_id: impl Display,
    ) -> Result<Vec<api::Ticket>, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/tickets");

        Ok(self
            .inner
            .get(format!("{URL}/{event_id}"))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<Vec<api::Ticket>>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn create_ticket(
        &self,
        owner: &str,
        code: &str,
        event_id: impl Serialize,
    ) -> Result<api::Ticket, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/tickets");

        let res = self
            .inner
            .post(URL)
            .json(&json!({
                "owner": owner,
                "code": code,
                "eventId": event_id,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?;
        assert_eq!(res.status(), StatusCode::CREATED);
        Ok(res
            .json::<api::Ticket>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn redeem_ticket(
        &self,
        id: impl Display,
    ) -> Result<(), StatusCode> {
        const URL: &str = concat!(BASE_URL, "/tickets/use");

        let res = self
            .inner
            .put(format!("{URL}/{id}"))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let body = res.bytes().await.expect("failed to get a response");
        assert!(body.is_empty());
        Ok(())
    }
}
