//! CalDAV client for VTODO collections.
//!
//! Speaks just enough WebDAV for bidirectional todo sync: PROPFIND to list
//! calendars, REPORT (calendar-query) to list todos, PUT to create/update
//! and DELETE to remove items. Authentication is HTTP basic over rustls.

use std::collections::HashMap;
use std::sync::Mutex;

use reqwest::{Method, StatusCode, header};
use taskdav_core::config::CaldavConfig;
use taskdav_core::error::{TaskdavError, TaskdavResult};
use taskdav_core::ics::{generate_ics, parse_todo};
use taskdav_core::store::RemoteStore;
use taskdav_core::todo::Todo;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

const PROPFIND_CALENDARS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop>
    <d:displayname/>
    <d:resourcetype/>
    <c:supported-calendar-component-set/>
  </d:prop>
</d:propfind>"#;

const REPORT_TODOS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<c:calendar-query xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop>
    <d:getetag/>
    <c:calendar-data/>
  </d:prop>
  <c:filter>
    <c:comp-filter name="VCALENDAR">
      <c:comp-filter name="VTODO"/>
    </c:comp-filter>
  </c:filter>
</c:calendar-query>"#;

/// A calendar collection discovered on the server.
#[derive(Debug, Clone)]
pub struct CalendarInfo {
    /// Last path segment of the collection href; what mappings refer to.
    pub id: String,
    pub display_name: Option<String>,
    pub href: String,
    pub supports_todos: bool,
}

pub struct CaldavClient {
    http: reqwest::Client,
    base: Url,
    username: String,
    password: String,
    /// uid → href learned from the last listing, so updates and deletes hit
    /// the item where the server actually stores it.
    hrefs: Mutex<HashMap<String, String>>,
}

impl CaldavClient {
    pub fn new(config: &CaldavConfig) -> TaskdavResult<Self> {
        let mut url = config.url.clone();
        if !url.ends_with('/') {
            url.push('/');
        }
        let base =
            Url::parse(&url).map_err(|e| TaskdavError::Config(format!("invalid CalDAV url: {e}")))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| TaskdavError::Caldav(e.to_string()))?;

        Ok(CaldavClient {
            http,
            base,
            username: config.username.clone(),
            password: config.password.clone(),
            hrefs: Mutex::new(HashMap::new()),
        })
    }

    /// List calendar collections under the configured home URL.
    pub async fn list_calendars(&self) -> TaskdavResult<Vec<CalendarInfo>> {
        let body = self
            .dav_request("PROPFIND", self.base.clone(), "1", PROPFIND_CALENDARS)
            .await?;
        parse_multistatus_calendars(&body)
    }

    fn calendar_url(&self, calendar: &str) -> TaskdavResult<Url> {
        self.base
            .join(&format!("{calendar}/"))
            .map_err(|e| TaskdavError::CalendarNotFound(format!("{calendar}: {e}")))
    }

    fn item_url(&self, calendar: &str, uid: &str) -> TaskdavResult<Url> {
        let cached = self.hrefs.lock().unwrap().get(uid).cloned();
        match cached {
            Some(href) => self
                .base
                .join(&href)
                .map_err(|e| TaskdavError::Caldav(format!("bad item href '{href}': {e}"))),
            None => Ok(self
                .calendar_url(calendar)?
                .join(&format!("{uid}.ics"))
                .map_err(|e| TaskdavError::Caldav(e.to_string()))?),
        }
    }

    /// Issue a WebDAV request with a Depth header and XML body, returning the
    /// multistatus response text.
    async fn dav_request(
        &self,
        method: &str,
        url: Url,
        depth: &str,
        body: &'static str,
    ) -> TaskdavResult<String> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| TaskdavError::Caldav(e.to_string()))?;

        debug!(%url, method = %method, "DAV request");
        let response = self
            .http
            .request(method, url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header("Depth", depth)
            .header(header::CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| TaskdavError::Caldav(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        self.check_status(status, &url)?;

        response
            .text()
            .await
            .map_err(|e| TaskdavError::Caldav(e.to_string()))
    }

    fn check_status(&self, status: StatusCode, url: &Url) -> TaskdavResult<()> {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(TaskdavError::CaldavAuth(self.username.clone()))
            }
            StatusCode::NOT_FOUND => Err(TaskdavError::CalendarNotFound(url.to_string())),
            s if s.is_success() || s == StatusCode::MULTI_STATUS => Ok(()),
            s => Err(TaskdavError::Caldav(format!("{url} returned {s}"))),
        }
    }

    async fn put_ics(&self, url: Url, todo: &Todo, create: bool) -> TaskdavResult<()> {
        let ics = generate_ics(todo)?;

        let mut request = self
            .http
            .put(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header(header::CONTENT_TYPE, "text/calendar; charset=utf-8")
            .body(ics);
        if create {
            request = request.header(header::IF_NONE_MATCH, "*");
        }

        let response = request
            .send()
            .await
            .map_err(|e| TaskdavError::Caldav(format!("PUT {url} failed: {e}")))?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(TaskdavError::CaldavAuth(self.username.clone()))
            }
            StatusCode::PRECONDITION_FAILED => Err(TaskdavError::Caldav(format!(
                "item already exists at {url}"
            ))),
            StatusCode::NOT_FOUND => Err(TaskdavError::TodoNotFound(todo.uid.clone())),
            s if s.is_success() => Ok(()),
            s => Err(TaskdavError::Caldav(format!("PUT {url} returned {s}"))),
        }
    }
}

impl RemoteStore for CaldavClient {
    async fn list(&self, calendar: &str) -> TaskdavResult<Vec<Todo>> {
        let url = self.calendar_url(calendar)?;
        let body = self.dav_request("REPORT", url, "1", REPORT_TODOS).await?;

        let mut todos = Vec::new();
        let mut hrefs = self.hrefs.lock().unwrap();
        for (href, ics) in parse_multistatus_items(&body)? {
            match parse_todo(&ics) {
                Some(todo) => {
                    hrefs.insert(todo.uid.clone(), href);
                    todos.push(todo);
                }
                // Per-item parse failures never abort the listing
                None => warn!(href, "skipping unparsable calendar item"),
            }
        }
        debug!(calendar, count = todos.len(), "listed todos");
        Ok(todos)
    }

    async fn create(&self, calendar: &str, todo: &Todo) -> TaskdavResult<String> {
        let mut todo = todo.clone();
        if todo.uid.is_empty() {
            // The store assigns identifiers, never the mapper; uniqueness is
            // this uuid, not anything derived from record content.
            todo.uid = Uuid::new_v4().to_string();
        }

        let url = self
            .calendar_url(calendar)?
            .join(&format!("{}.ics", todo.uid))
            .map_err(|e| TaskdavError::Caldav(e.to_string()))?;

        self.put_ics(url.clone(), &todo, true).await?;
        self.hrefs
            .lock()
            .unwrap()
            .insert(todo.uid.clone(), url.path().to_string());
        Ok(todo.uid)
    }

    async fn update(&self, calendar: &str, uid: &str, todo: &Todo) -> TaskdavResult<()> {
        let mut todo = todo.clone();
        todo.uid = uid.to_string();
        let url = self.item_url(calendar, uid)?;
        self.put_ics(url, &todo, false).await
    }

    async fn delete(&self, calendar: &str, uid: &str) -> TaskdavResult<()> {
        let url = self.item_url(calendar, uid)?;
        let response = self
            .http
            .delete(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| TaskdavError::Caldav(format!("DELETE {url} failed: {e}")))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(TaskdavError::CaldavAuth(self.username.clone()))
            }
            StatusCode::NOT_FOUND => Err(TaskdavError::TodoNotFound(uid.to_string())),
            s if s.is_success() => {
                self.hrefs.lock().unwrap().remove(uid);
                Ok(())
            }
            s => Err(TaskdavError::Caldav(format!("DELETE {url} returned {s}"))),
        }
    }
}

/// Parse a PROPFIND multistatus into calendar collections.
fn parse_multistatus_calendars(xml: &str) -> TaskdavResult<Vec<CalendarInfo>> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| TaskdavError::Caldav(format!("bad multistatus XML: {e}")))?;

    let mut calendars = Vec::new();
    for response in doc
        .descendants()
        .filter(|n| n.tag_name().name() == "response")
    {
        let Some(href) = response
            .descendants()
            .find(|n| n.tag_name().name() == "href")
            .and_then(|n| n.text())
        else {
            continue;
        };

        let is_calendar = response
            .descendants()
            .filter(|n| n.tag_name().name() == "resourcetype")
            .any(|rt| rt.children().any(|c| c.tag_name().name() == "calendar"));
        if !is_calendar {
            continue;
        }

        let display_name = response
            .descendants()
            .find(|n| n.tag_name().name() == "displayname")
            .and_then(|n| n.text())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        // Assume VTODO support when the server omits the component set
        let comp_sets: Vec<_> = response
            .descendants()
            .filter(|n| n.tag_name().name() == "supported-calendar-component-set")
            .collect();
        let supports_todos = comp_sets.is_empty()
            || comp_sets.iter().any(|set| {
                set.children()
                    .any(|c| c.attribute("name") == Some("VTODO"))
            });

        let id = href
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(href)
            .to_string();

        calendars.push(CalendarInfo {
            id,
            display_name,
            href: href.to_string(),
            supports_todos,
        });
    }

    Ok(calendars)
}

/// Parse a REPORT multistatus into (href, calendar-data) pairs.
fn parse_multistatus_items(xml: &str) -> TaskdavResult<Vec<(String, String)>> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| TaskdavError::Caldav(format!("bad multistatus XML: {e}")))?;

    let mut items = Vec::new();
    for response in doc
        .descendants()
        .filter(|n| n.tag_name().name() == "response")
    {
        let href = response
            .descendants()
            .find(|n| n.tag_name().name() == "href")
            .and_then(|n| n.text())
            .unwrap_or_default()
            .to_string();

        if let Some(data) = response
            .descendants()
            .find(|n| n.tag_name().name() == "calendar-data")
            .and_then(|n| n.text())
        {
            items.push((href, data.to_string()));
        }
    }

    Ok(items)
}
